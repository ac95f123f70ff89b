//! # 多帧图像对象
//!
//! ## 设计思路
//!
//! `RasterImage` 持有身份信息（id / 创建时间 / 来源路径）与一组有序帧。
//! 身份信息不可变，帧序列与累计缩放系数放在同一把 `RwLock` 之后：
//!
//! - 读操作（取像素、编码、快照）持读锁，可并发
//! - 写操作（覆盖像素、降采样、释放）持写锁，单写者
//!
//! 读者因此只会看到修改前或修改后的完整状态，不会读到撕裂的缓冲。
//!
//! ## 实现思路
//!
//! - 释放后帧序列为空，之后所有操作返回 `ImageError::Disposed`，释放本身幂等。
//! - 降采样在写锁内完成并行缩放，全部成功后一次性替换帧序列。

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Local};
use image::ImageFormat;
use image::imageops::FilterType;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use uuid::Uuid;

use super::{codec, resize, DecodeLimits, FrameSize, ImageError, OutputFormat, RasterFrame, Rgba8Color};

/// 受锁保护的可变状态。
#[derive(Debug)]
struct FrameSet {
    frames: Vec<RasterFrame>,
    scaling_factor: f64,
}

/// 单帧编码结果。
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub format: OutputFormat,
    pub size: FrameSize,
    pub bytes: Vec<u8>,
}

impl EncodedFrame {
    pub fn mime_type(&self) -> String {
        self.format.mime_type()
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// 多帧 RGBA8 图像。
#[derive(Debug)]
pub struct RasterImage {
    id: Uuid,
    created_at: DateTime<Local>,
    source_path: String,
    state: RwLock<FrameSet>,
}

impl RasterImage {
    /// 从已编码字节构造。解码失败时不会产生任何对象。
    pub fn from_bytes(
        bytes: &[u8],
        source_path: impl Into<String>,
        hint: Option<ImageFormat>,
        limits: DecodeLimits,
    ) -> Result<Self, ImageError> {
        let frames = codec::decode(bytes, hint, limits)?;
        Ok(Self::with_frames(frames, source_path.into()))
    }

    /// 合成 `frame_count` 帧纯色图像。
    pub fn from_dimensions(
        width: u32,
        height: u32,
        frame_count: usize,
        color: Rgba8Color,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::DimensionInvalid {
                width: width as i64,
                height: height as i64,
                max: super::MAX_DIMENSION,
            });
        }
        if frame_count == 0 {
            return Err(ImageError::InvalidRequest("帧数至少为 1".to_string()));
        }

        let frames = (0..frame_count)
            .map(|_| RasterFrame::filled(width, height, color))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_frames(frames, String::new()))
    }

    fn with_frames(frames: Vec<RasterFrame>, source_path: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Local::now(),
            source_path,
            state: RwLock::new(FrameSet {
                frames,
                scaling_factor: 1.0,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// 来源文件路径，合成图像为空字符串。
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn frame_count(&self) -> usize {
        self.read_state().map(|s| s.frames.len()).unwrap_or(0)
    }

    pub fn is_disposed(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn scaling_factor(&self) -> Result<f64, ImageError> {
        Ok(self.live_state()?.scaling_factor)
    }

    /// 所有帧尺寸，顺序与帧索引一致。
    pub fn frame_sizes(&self) -> Result<Vec<FrameSize>, ImageError> {
        Ok(self.live_state()?.frames.iter().map(RasterFrame::size).collect())
    }

    /// 在同一把读锁下取得尺寸与缩放系数，保证二者一致。
    pub(crate) fn geometry(&self) -> Result<(Vec<FrameSize>, f64), ImageError> {
        let state = self.live_state()?;
        let sizes = state.frames.iter().map(RasterFrame::size).collect();
        Ok((sizes, state.scaling_factor))
    }

    /// 复制指定帧的完整 RGBA8 缓冲。
    pub fn get_pixels(&self, frame_index: usize) -> Result<Vec<u8>, ImageError> {
        let state = self.live_state()?;
        let frame = Self::frame_at(&state.frames, frame_index)?;
        Ok(frame.pixels().to_vec())
    }

    /// 整帧覆盖像素，返回更新后的帧尺寸。
    ///
    /// 索引越界或长度不等于 `width * height * 4` 时帧保持不变。
    pub fn set_pixels(&self, buffer: &[u8], frame_index: usize) -> Result<FrameSize, ImageError> {
        let mut state = self.live_state_mut()?;
        let count = state.frames.len();
        let frame = state
            .frames
            .get_mut(frame_index)
            .ok_or(ImageError::FrameIndexOutOfRange { index: frame_index, count })?;

        frame.replace_pixels(buffer)?;
        Ok(frame.size())
    }

    /// 将指定帧编码为目标格式。
    pub fn encode(&self, frame_index: usize, format: OutputFormat) -> Result<EncodedFrame, ImageError> {
        let state = self.live_state()?;
        let frame = Self::frame_at(&state.frames, frame_index)?;

        let bytes = codec::encode(frame, format)?;
        Ok(EncodedFrame {
            format,
            size: frame.size(),
            bytes,
        })
    }

    /// 编码并返回 base64 字符串。格式标记在此归一化，未知标记回退为 PNG。
    pub fn encode_base64(&self, frame_index: usize, format: Option<&str>) -> Result<String, ImageError> {
        let format = OutputFormat::from_optional(format);
        self.encode(frame_index, format).map(|encoded| encoded.to_base64())
    }

    /// 按系数降采样所有帧。
    ///
    /// 仅当 `0 < factor < 1` 时生效，返回是否真正执行了缩放。
    pub fn downscale(&self, factor: f64, filter: FilterType) -> Result<bool, ImageError> {
        if !resize::is_effective_factor(factor) {
            log::debug!("降采样系数 {} 不在 (0, 1) 区间内，忽略", factor);
            return Ok(false);
        }

        let start = Instant::now();
        let mut state = self.live_state_mut()?;

        let resized = resize::downscale_frames(&state.frames, factor, filter)?;
        state.frames = resized;
        state.scaling_factor *= factor;

        log::info!(
            "🧩 降采样完成 - id: {} 系数: {} 累计: {} 帧数: {} 耗时: {}ms",
            self.id,
            factor,
            state.scaling_factor,
            state.frames.len(),
            start.elapsed().as_millis()
        );

        Ok(true)
    }

    /// 释放全部像素缓冲。重复调用无副作用。
    pub fn dispose(&self) {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if state.frames.is_empty() {
            return;
        }

        state.frames = Vec::new();
        log::debug!("🗑️ 已释放图片 {}", self.id);
    }

    fn frame_at(frames: &[RasterFrame], index: usize) -> Result<&RasterFrame, ImageError> {
        frames.get(index).ok_or(ImageError::FrameIndexOutOfRange {
            index,
            count: frames.len(),
        })
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, FrameSet>, ImageError> {
        self.state
            .read()
            .map_err(|_| ImageError::Internal("图片读锁已中毒".to_string()))
    }

    fn live_state(&self) -> Result<RwLockReadGuard<'_, FrameSet>, ImageError> {
        let state = self.read_state()?;
        if state.frames.is_empty() {
            return Err(ImageError::Disposed(self.id.to_string()));
        }
        Ok(state)
    }

    fn live_state_mut(&self) -> Result<RwLockWriteGuard<'_, FrameSet>, ImageError> {
        let state = self
            .state
            .write()
            .map_err(|_| ImageError::Internal("图片写锁已中毒".to_string()))?;
        if state.frames.is_empty() {
            return Err(ImageError::Disposed(self.id.to_string()));
        }
        Ok(state)
    }
}
