//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图片存储链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 边界层（HTTP 等）只需要 `kind()` 即可决定返回 404 / 400 / 500，
//! `code()` 则提供稳定的机器可读错误码。

/// 错误大类，供边界层映射到协议级响应。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Internal,
}

/// 图片存储统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("尺寸非法：{width}x{height}（允许范围：1~{max}）")]
    DimensionInvalid { width: i64, height: i64, max: u32 },

    #[error("帧索引越界：{index}（帧数：{count}）")]
    FrameIndexOutOfRange { index: usize, count: usize },

    #[error("像素缓冲长度不匹配：期望 {expected} 字节，实际 {actual} 字节")]
    PixelBufferSizeMismatch { expected: usize, actual: usize },

    #[error("图片不存在：{0}")]
    NotFound(String),

    #[error("图片已释放：{0}")]
    Disposed(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("请求参数错误：{0}")]
    InvalidRequest(String),

    #[error("内部错误：{0}")]
    Internal(String),
}

impl ImageError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_ENCODE",
            Self::DimensionInvalid { .. } => "E_DIMENSION",
            Self::FrameIndexOutOfRange { .. } => "E_FRAME_INDEX",
            Self::PixelBufferSizeMismatch { .. } => "E_PIXEL_BUFFER",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Disposed(_) => "E_DISPOSED",
            Self::FileSystem(_) => "E_FILE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
            Self::Internal(_) => "E_INTERNAL",
        }
    }

    /// 错误大类。
    ///
    /// 已释放的句柄与不存在的 id 对调用方而言等价，统一归为 `NotFound`。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Disposed(_) => ErrorKind::NotFound,
            Self::Decode(_)
            | Self::DimensionInvalid { .. }
            | Self::FrameIndexOutOfRange { .. }
            | Self::PixelBufferSizeMismatch { .. }
            | Self::ResourceLimit(_)
            | Self::InvalidRequest(_) => ErrorKind::BadRequest,
            Self::Encode(_) | Self::FileSystem(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ImageError> for String {
    fn from(error: ImageError) -> Self {
        error.to_string()
    }
}
