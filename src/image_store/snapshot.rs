//! # 对外快照模型
//!
//! ## 设计思路
//!
//! 边界层只拿到不可变的快照，而不是 `RasterImage` 本身：
//! - `ImageInfo`：元数据投影（尺寸、帧数、体积估算等）
//! - `ImageData`：单帧编码结果（MIME + base64）
//! - `ImageDownload`：单帧编码后的原始字节与建议文件名
//!
//! 序列化字段使用 camelCase，保持与既有前端/客户端一致。

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use super::frame::{BITS_PER_CHANNEL, CHANNELS};
use super::{EncodedFrame, FrameSize, ImageError, RasterImage};

const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;

/// 图片元数据快照。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub id: Uuid,
    pub created_at: DateTime<Local>,
    pub file_path: String,
    pub sizes: Vec<FrameSize>,
    pub frames_count: usize,
    pub channels: usize,
    pub bits_per_channel: usize,
    pub bits_per_pixel: usize,
    /// 每帧原始像素体积（MB）。
    pub size_mb: Vec<f64>,
    /// 每帧 base64 体积估算（字节，原始体积 × 4/3）。
    pub base64_size_estimate: Vec<u64>,
    pub scaling_factor: f64,
    /// 预留：主机内存驻留标记，恒为 `false`。
    pub on_host: bool,
    /// 预留：设备显存驻留标记，恒为 `false`。
    pub on_device: bool,
    /// 预留：不透明指针，恒为 `"0"`。
    pub pointer: String,
}

impl ImageInfo {
    /// 在图片的同一把读锁下生成快照。
    pub fn capture(image: &RasterImage) -> Result<Self, ImageError> {
        let (sizes, scaling_factor) = image.geometry()?;

        let raw_bytes: Vec<u64> = sizes
            .iter()
            .map(|s| s.width as u64 * s.height as u64 * CHANNELS as u64)
            .collect();

        Ok(Self {
            id: image.id(),
            created_at: image.created_at(),
            file_path: image.source_path().to_string(),
            frames_count: sizes.len(),
            sizes,
            channels: CHANNELS,
            bits_per_channel: BITS_PER_CHANNEL,
            bits_per_pixel: CHANNELS * BITS_PER_CHANNEL,
            size_mb: raw_bytes.iter().map(|&b| b as f64 / BYTES_PER_MEGABYTE).collect(),
            base64_size_estimate: raw_bytes.iter().map(|&b| b * 4 / 3).collect(),
            scaling_factor,
            on_host: false,
            on_device: false,
            pointer: "0".to_string(),
        })
    }
}

/// 单帧编码数据。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub id: Uuid,
    pub frame_id: usize,
    pub data_created_at: DateTime<Local>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    pub base64_data: String,
}

impl ImageData {
    pub fn from_encoded(id: Uuid, frame_id: usize, encoded: &EncodedFrame) -> Self {
        Self {
            id,
            frame_id,
            data_created_at: Local::now(),
            width: encoded.size.width,
            height: encoded.size.height,
            mime_type: encoded.mime_type(),
            base64_data: encoded.to_base64(),
        }
    }
}

/// 单帧下载内容。
#[derive(Debug, Clone)]
pub struct ImageDownload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageDownload {
    pub fn from_encoded(id: Uuid, frame_id: usize, encoded: EncodedFrame) -> Self {
        Self {
            file_name: format!("{}_{}.{}", id, frame_id, encoded.format.extension()),
            content_type: encoded.mime_type(),
            bytes: encoded.bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_store::{OutputFormat, Rgba8Color};

    #[test]
    fn info_reports_sizes_and_reserved_fields() {
        let image = RasterImage::from_dimensions(1024, 512, 2, Rgba8Color::TRANSPARENT)
            .expect("create image");
        let info = ImageInfo::capture(&image).expect("capture info");

        assert_eq!(info.frames_count, 2);
        assert_eq!(info.sizes, vec![FrameSize { width: 1024, height: 512 }; 2]);
        assert_eq!(info.bits_per_pixel, 32);
        assert_eq!(info.size_mb, vec![2.0, 2.0]);
        assert_eq!(info.base64_size_estimate[0], 1024 * 512 * 4 * 4 / 3);
        assert!(!info.on_host && !info.on_device);
        assert_eq!(info.pointer, "0");
        assert_eq!(info.file_path, "");
    }

    #[test]
    fn info_serializes_as_camel_case() {
        let image = RasterImage::from_dimensions(2, 2, 1, Rgba8Color::TRANSPARENT)
            .expect("create image");
        let info = ImageInfo::capture(&image).expect("capture info");
        let json = serde_json::to_value(&info).expect("serialize info");

        assert_eq!(json["framesCount"], 1);
        assert_eq!(json["bitsPerChannel"], 8);
        assert_eq!(json["pointer"], "0");
        assert_eq!(json["sizes"][0]["width"], 2);
        assert_eq!(json["scalingFactor"], 1.0);
    }

    #[test]
    fn download_uses_id_frame_and_extension() {
        let image = RasterImage::from_dimensions(2, 2, 1, Rgba8Color::TRANSPARENT)
            .expect("create image");
        let encoded = image.encode(0, OutputFormat::Jpeg).expect("encode");
        let download = ImageDownload::from_encoded(image.id(), 0, encoded);

        assert_eq!(download.file_name, format!("{}_0.jpg", image.id()));
        assert_eq!(download.content_type, "image/jpeg");
        assert!(!download.bytes.is_empty());
    }

    #[test]
    fn capture_fails_for_disposed_image() {
        let image = RasterImage::from_dimensions(2, 2, 1, Rgba8Color::TRANSPARENT)
            .expect("create image");
        image.dispose();
        assert!(matches!(ImageInfo::capture(&image), Err(ImageError::Disposed(_))));
    }
}
