//! # 降采样引擎
//!
//! ## 设计思路
//!
//! 每一帧的缩放互不依赖，使用 `rayon` 并行执行；全部完成（join 屏障）后才把
//! 新帧序列交给调用方整体替换，任何时刻都不会出现“部分帧已缩放”的中间态。
//!
//! ## 实现思路
//!
//! - 目标尺寸：`max(1, floor(旧尺寸 * factor))`
//! - 优先使用 `fast_image_resize` 卷积缩放（默认双线性）
//! - 失败时回退 `image::imageops::resize`，使用同族滤镜

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::RgbaImage;
use rayon::prelude::*;

use super::{FrameSize, ImageError, RasterFrame};

/// 缩放系数是否会真正改变图片。只有 `0 < factor < 1` 才生效。
pub fn is_effective_factor(factor: f64) -> bool {
    factor.is_finite() && factor > 0.0 && factor < 1.0
}

/// 按系数计算目标尺寸，单边至少为 1。
pub fn scaled_size(size: FrameSize, factor: f64) -> FrameSize {
    let scale = |v: u32| ((v as f64 * factor).floor() as u32).max(1);
    FrameSize {
        width: scale(size.width),
        height: scale(size.height),
    }
}

/// 并行缩放所有帧，返回与输入顺序一致的新帧序列。
///
/// 任意一帧失败则整体失败，调用方的旧帧不受影响。
pub(crate) fn downscale_frames(
    frames: &[RasterFrame],
    factor: f64,
    filter: FilterType,
) -> Result<Vec<RasterFrame>, ImageError> {
    frames
        .par_iter()
        .map(|frame| resize_frame(frame, scaled_size(frame.size(), factor), filter))
        .collect()
}

fn resize_frame(
    frame: &RasterFrame,
    target: FrameSize,
    filter: FilterType,
) -> Result<RasterFrame, ImageError> {
    if frame.size() == target {
        return Ok(frame.clone());
    }

    match resize_with_fast_image_resize(frame, target, filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::imageops::resize：{}", err);
            resize_with_imageops(frame, target, filter)
        }
    }
}

fn resize_with_fast_image_resize(
    frame: &RasterFrame,
    target: FrameSize,
    filter: FilterType,
) -> Result<RasterFrame, ImageError> {
    let src_image = fr::images::Image::from_vec_u8(
        frame.width(),
        frame.height(),
        frame.pixels().to_vec(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| ImageError::Internal(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target.width, target.height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(to_fast_alg(filter));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ImageError::Internal(format!("fast_image_resize 执行失败：{}", e)))?;

    RasterFrame::from_raw(target.width, target.height, dst_image.into_vec())
}

fn resize_with_imageops(
    frame: &RasterFrame,
    target: FrameSize,
    filter: FilterType,
) -> Result<RasterFrame, ImageError> {
    let src = RgbaImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
        .ok_or_else(|| ImageError::Internal("源像素缓冲长度异常".to_string()))?;

    let resized = image::imageops::resize(&src, target.width, target.height, filter);
    Ok(RasterFrame::from_rgba_image(resized))
}

fn to_fast_alg(filter: FilterType) -> fr::ResizeAlg {
    match filter {
        FilterType::Nearest => fr::ResizeAlg::Nearest,
        FilterType::Triangle => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
        FilterType::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
        FilterType::Gaussian => fr::ResizeAlg::Convolution(fr::FilterType::Mitchell),
        FilterType::Lanczos3 => fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3),
    }
}
