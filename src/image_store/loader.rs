//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / Base64 / 内存字节）的原始字节加载，
//! 并在“尽可能早”的阶段执行输入校验，尽快失败，减少不必要的内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - Base64：格式解析 + 解码前体积估算 + 解码后体积限制。
//! - 签名：`infer` 识别出非图片类型时直接拒绝；无法识别（如 TGA）则交给解码器判断。

use base64::{Engine as _, engine::general_purpose};
use image::ImageFormat;
use std::path::Path;

use super::source::RawImageData;
use super::{ImageError, ImageSource, StoreConfig};

/// 按来源加载原始字节。
pub(crate) fn load_source(source: ImageSource, config: &StoreConfig) -> Result<RawImageData, ImageError> {
    match source {
        ImageSource::FilePath(path) => load_from_file(&path, config),
        ImageSource::Base64(data) => load_from_base64(&data, config),
        ImageSource::Bytes { bytes, file_name } => load_from_bytes(bytes, file_name.as_deref(), config),
    }
}

/// 从本地路径加载图片原始字节。
pub(crate) fn load_from_file(path: &str, config: &StoreConfig) -> Result<RawImageData, ImageError> {
    log::info!("📁 开始读取本地图片 - 路径: {}", path);

    let file_path = Path::new(path);
    if !file_path.exists() {
        return Err(ImageError::FileSystem(format!("文件不存在：{}", path)));
    }

    let metadata = std::fs::metadata(file_path)
        .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}", e)))?;

    if metadata.len() > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = std::fs::read(file_path)
        .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;
    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_path: path.to_string(),
        format_hint: ImageFormat::from_path(file_path).ok(),
        source_hint: "file",
    })
}

/// 从 Base64 字符串加载图片原始字节。
pub(crate) fn load_from_base64(data: &str, config: &StoreConfig) -> Result<RawImageData, ImageError> {
    log::info!("📝 开始处理 base64 图片");

    let bytes = parse_base64_with_limit(data, config.max_file_size)?;

    if bytes.len() as u64 > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
            bytes.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }
    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_path: String::new(),
        format_hint: None,
        source_hint: "base64",
    })
}

fn load_from_bytes(
    bytes: Vec<u8>,
    file_name: Option<&str>,
    config: &StoreConfig,
) -> Result<RawImageData, ImageError> {
    if bytes.len() as u64 > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "上传内容过大：{:.2} MB（限制：{:.2} MB）",
            bytes.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }
    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_path: String::new(),
        format_hint: file_name.and_then(|name| ImageFormat::from_path(name).ok()),
        source_hint: "bytes",
    })
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

/// 解析纯 Base64 或 `data:image/...;base64,` 形式的字符串，解码前先按长度估算体积。
fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, ImageError> {
    let normalized = data.trim();

    let payload = if normalized.starts_with("data:image/") {
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| ImageError::InvalidRequest("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
}

fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Decode("图片内容为空".to_string()));
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }
    }

    Ok(())
}
