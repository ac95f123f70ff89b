//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `StoreConfig`，保证运行时行为可观测、可调整、可测试。
//! 缩放质量档位（quality / balanced / speed）作为高层语义，映射到底层滤镜。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置（双线性缩放）。
//! - `ResizeQuality` 负责档位字符串解析与反向输出。
//! - `max_total_bytes` 是单张图片所有帧 RGBA8 缓冲的总预算，合成与解码共用。
//! - `max_age_seconds` 仅作为配置值保留，当前不驱动任何过期淘汰。

use image::imageops::FilterType;

use super::ImageError;

/// 单边尺寸上限（宽、高均适用）。
pub const MAX_DIMENSION: u32 = 32768;

/// 默认总字节预算：恰好容纳一帧 32768x32768 的 RGBA8。
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = MAX_DIMENSION as u64 * MAX_DIMENSION as u64 * 4;

/// 图片存储配置。
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后单帧像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 合成图片时允许的最大帧数。
    pub max_frame_count: usize,
    /// 单张图片所有帧解码或合成后的总字节上限。
    pub max_total_bytes: u64,
    /// 降采样滤镜。结果逐像素可复现，测试依赖该值固定。
    pub resize_filter: FilterType,
    /// 预留：图片最大存活时间（秒），未接入淘汰逻辑。
    pub max_age_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1_000_000,
            max_decoded_pixels: MAX_DIMENSION as u64 * MAX_DIMENSION as u64,
            max_frame_count: 1024,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            resize_filter: FilterType::Triangle,
            max_age_seconds: 300,
        }
    }
}

/// 缩放质量档位。
///
/// - `Quality`：CatmullRom
/// - `Balanced`：双线性（默认）
/// - `Speed`：最近邻
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeQuality {
    Quality,
    Balanced,
    Speed,
}

impl ResizeQuality {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use image_inspector::image_store::ResizeQuality;
    ///
    /// let q = ResizeQuality::parse("Balanced")?;
    /// assert_eq!(q.as_str(), "balanced");
    /// # Ok::<(), image_inspector::image_store::ImageError>(())
    /// ```
    pub fn parse(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::InvalidRequest(format!(
                "未知缩放档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }

    pub fn filter(self) -> FilterType {
        match self {
            Self::Quality => FilterType::CatmullRom,
            Self::Balanced => FilterType::Triangle,
            Self::Speed => FilterType::Nearest,
        }
    }
}

impl StoreConfig {
    /// 校验 `width * height * 4 * frame_count` 不超过总字节预算，返回所需字节数。
    pub fn check_total_bytes(&self, width: u32, height: u32, frame_count: usize) -> Result<u64, ImageError> {
        let required = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .and_then(|bytes| bytes.checked_mul(frame_count as u64))
            .ok_or_else(|| ImageError::ResourceLimit("图片总体积溢出".to_string()))?;

        if required > self.max_total_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "图片总体积过大：{}x{}x{} 帧需要 {:.2} MB（限制：{:.2} MB）",
                width,
                height,
                frame_count,
                required as f64 / 1024.0 / 1024.0,
                self.max_total_bytes as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(required)
    }

    /// 应用缩放档位。
    pub fn apply_resize_quality(&mut self, quality: ResizeQuality) {
        self.resize_filter = quality.filter();
    }

    /// 基于当前滤镜反推档位，未知滤镜按 `Balanced` 处理。
    pub fn resize_quality(&self) -> ResizeQuality {
        match self.resize_filter {
            FilterType::CatmullRom | FilterType::Lanczos3 | FilterType::Gaussian => {
                ResizeQuality::Quality
            }
            FilterType::Nearest => ResizeQuality::Speed,
            FilterType::Triangle => ResizeQuality::Balanced,
        }
    }
}
