//! 单帧 RGBA8 像素缓冲。

use image::RgbaImage;
use serde::Serialize;

use super::{ImageError, Rgba8Color};

/// 通道数（RGBA），全系统固定。
pub const CHANNELS: usize = 4;
/// 每通道位深，全系统固定。
pub const BITS_PER_CHANNEL: usize = 8;

/// 帧尺寸（像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// 期望的 RGBA8 字节数，溢出时返回 `None`。
    pub fn byte_len(self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
    }
}

/// 单帧图像：行优先的 RGBA8 缓冲，长度恒为 `width * height * 4`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterFrame {
    /// 用单一颜色填充一帧。
    pub(crate) fn filled(width: u32, height: u32, color: Rgba8Color) -> Result<Self, ImageError> {
        let len = FrameSize { width, height }
            .byte_len()
            .ok_or_else(|| ImageError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|e| ImageError::ResourceLimit(format!("像素缓冲分配失败：{}", e)))?;

        let rgba = color.to_array();
        pixels.extend(std::iter::repeat_n(rgba, len / CHANNELS).flatten());

        Ok(Self { width, height, pixels })
    }

    /// 由已解码的 RGBA8 图像构造，长度由 `ImageBuffer` 保证。
    pub(crate) fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    /// 由原始字节构造，长度不符时报错。
    pub(crate) fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ImageError> {
        let expected = FrameSize { width, height }
            .byte_len()
            .ok_or_else(|| ImageError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

        if pixels.len() != expected {
            return Err(ImageError::PixelBufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> FrameSize {
        FrameSize {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// 以 `image` 的视图类型借出，便于交给编码器。
    pub(crate) fn as_rgba_image(&self) -> Option<image::ImageBuffer<image::Rgba<u8>, &[u8]>> {
        image::ImageBuffer::from_raw(self.width, self.height, self.pixels.as_slice())
    }

    /// 整帧覆盖像素。长度校验失败时原缓冲保持不变。
    pub(crate) fn replace_pixels(&mut self, buffer: &[u8]) -> Result<(), ImageError> {
        if buffer.len() != self.pixels.len() {
            return Err(ImageError::PixelBufferSizeMismatch {
                expected: self.pixels.len(),
                actual: buffer.len(),
            });
        }

        self.pixels.copy_from_slice(buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_frame_has_exact_length_and_color() {
        let frame = RasterFrame::filled(4, 2, Rgba8Color::new(255, 0, 0, 255)).expect("fill frame");
        assert_eq!(frame.pixels().len(), 32);
        assert!(frame.pixels().chunks_exact(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn replace_rejects_wrong_length_without_mutation() {
        let mut frame = RasterFrame::filled(2, 2, Rgba8Color::TRANSPARENT).expect("fill frame");
        let before = frame.clone();

        let result = frame.replace_pixels(&[1u8; 15]);
        assert!(matches!(
            result,
            Err(ImageError::PixelBufferSizeMismatch { expected: 16, actual: 15 })
        ));
        assert_eq!(frame, before);
    }

    #[test]
    fn from_raw_validates_length() {
        assert!(RasterFrame::from_raw(1, 1, vec![0; 4]).is_ok());
        assert!(RasterFrame::from_raw(1, 1, vec![0; 5]).is_err());
    }
}
