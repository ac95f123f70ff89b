//! # 输出格式
//!
//! 外部传入的格式字符串只在这里归一化一次，之后全链路只传递 `OutputFormat`。
//! 不认识的格式（包括空字符串）统一回退为 PNG。

use image::ImageFormat;

/// 支持的输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Gif,
    Tga,
    Tiff,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        Self::Png,
        Self::Jpeg,
        Self::Bmp,
        Self::Gif,
        Self::Tga,
        Self::Tiff,
    ];

    /// 大小写不敏感地解析格式标记；未知标记回退为 PNG。
    ///
    /// ```rust
    /// use image_inspector::image_store::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::from_token("JPG"), OutputFormat::Jpeg);
    /// assert_eq!(OutputFormat::from_token("webp"), OutputFormat::Png);
    /// ```
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "bmp" => Self::Bmp,
            "gif" => Self::Gif,
            "tga" => Self::Tga,
            "tif" | "tiff" => Self::Tiff,
            other => {
                if !other.is_empty() {
                    log::debug!("未知输出格式 '{}'，回退为 png", other);
                }
                Self::Png
            }
        }
    }

    /// `None` 等价于未指定格式，回退为 PNG。
    pub fn from_optional(token: Option<&str>) -> Self {
        token.map(Self::from_token).unwrap_or_default()
    }

    /// 归一化后的格式名。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Tga => "tga",
            Self::Tiff => "tiff",
        }
    }

    /// `image/` + 归一化格式名。
    pub fn mime_type(self) -> String {
        format!("image/{}", self.as_str())
    }

    /// 下载文件使用的扩展名。
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    /// 是否无损（编码后再解码可逐字节还原 RGBA 缓冲）。
    pub fn is_lossless(self) -> bool {
        matches!(self, Self::Png | Self::Bmp | Self::Tga | Self::Tiff)
    }

    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
            Self::Gif => ImageFormat::Gif,
            Self::Tga => ImageFormat::Tga,
            Self::Tiff => ImageFormat::Tiff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_case_insensitive() {
        assert_eq!(OutputFormat::from_token("PNG"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_token(" Jpeg "), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_token("TIF"), OutputFormat::Tiff);
        assert_eq!(OutputFormat::from_token("tiff"), OutputFormat::Tiff);
        assert_eq!(OutputFormat::from_token("Tga"), OutputFormat::Tga);
        assert_eq!(OutputFormat::from_token("bmp"), OutputFormat::Bmp);
        assert_eq!(OutputFormat::from_token("gif"), OutputFormat::Gif);
    }

    #[test]
    fn unknown_or_missing_token_falls_back_to_png() {
        assert_eq!(OutputFormat::from_token("webp"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_token(""), OutputFormat::Png);
        assert_eq!(OutputFormat::from_optional(None), OutputFormat::Png);
        assert_eq!(OutputFormat::from_token("webp").mime_type(), "image/png");
    }

    #[test]
    fn jpeg_uses_short_extension() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::Tiff.extension(), "tiff");
    }
}
