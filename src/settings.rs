//! # 应用设置
//!
//! 设置保存在 JSON 文件中，缺失字段使用默认值；文件缺失或内容损坏时整体回退到默认设置，
//! 不阻止程序启动。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_store::{ResizeQuality, StoreConfig};

const BYTES_PER_MB: u64 = 1_000_000;
const BYTES_PER_MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    /// 缩放档位：quality / balanced / speed
    pub resize_quality: String,
    pub max_upload_size_mb: u64,
    pub max_frame_count: usize,
    /// 单张图片所有帧的内存预算（MiB）
    pub max_image_memory_mib: u64,
    pub max_age_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let config = StoreConfig::default();
        Self {
            resize_quality: config.resize_quality().as_str().to_string(),
            max_upload_size_mb: config.max_file_size / BYTES_PER_MB,
            max_frame_count: config.max_frame_count,
            max_image_memory_mib: config.max_total_bytes / BYTES_PER_MIB,
            max_age_seconds: config.max_age_seconds,
        }
    }
}

impl AppSettings {
    /// 转换为仓库配置。未知档位会被拒绝，而不是静默回退。
    pub fn to_store_config(&self) -> Result<StoreConfig, AppError> {
        let mut config = StoreConfig {
            max_file_size: self.max_upload_size_mb.saturating_mul(BYTES_PER_MB),
            max_frame_count: self.max_frame_count.max(1),
            max_total_bytes: self.max_image_memory_mib.max(1).saturating_mul(BYTES_PER_MIB),
            max_age_seconds: self.max_age_seconds,
            ..StoreConfig::default()
        };
        config.apply_resize_quality(ResizeQuality::parse(&self.resize_quality)?);
        Ok(config)
    }
}

pub fn load_settings_from_path(settings_path: &Path) -> AppSettings {
    if settings_path.exists() {
        match fs::read_to_string(settings_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => return settings,
                Err(e) => log::warn!("⚠️ 解析设置文件失败，使用默认设置: {}", e),
            },
            Err(e) => log::warn!("⚠️ 读取设置文件失败，使用默认设置: {}", e),
        }
    }
    AppSettings::default()
}

pub fn save_settings_to_path(settings_path: &Path, settings: &AppSettings) -> Result<(), AppError> {
    if let Some(parent) = settings_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(settings)?;

    fs::write(settings_path, content)?;
    Ok(())
}
