//! # 编解码模块
//!
//! ## 设计思路
//!
//! 将“字节 → 规范 RGBA8 帧序列”与“单帧 → 目标格式字节”集中在这里，
//! 上层只接触 `RasterFrame` 与 `OutputFormat`。
//!
//! ## 实现思路
//!
//! 1. 识别格式（优先字节签名，TGA 这类无魔数格式依赖路径扩展名提示）
//! 2. 读取 header 尺寸并按像素上限、总字节预算快速拒绝
//! 3. 动画格式（GIF / APNG / 动态 WebP）逐帧解码并保持顺序，其余格式单帧解码
//! 4. 所有帧统一转换为 RGBA8
//!
//! 动画逐帧累计解码后的字节数，超出 `DecodeLimits::max_total_bytes` 立即停止，
//! 不会先收集全部帧再检查；解码器本身也设置 `image::Limits::max_alloc`。
//!
//! 编码时 JPEG 不支持 alpha，先丢弃 alpha 通道再编码；其余格式直接写 RGBA8。

use image::buffer::ConvertBuffer;
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, Frames, ImageDecoder, ImageFormat, ImageReader, Limits, RgbImage};
use std::io::Cursor;

use super::frame::CHANNELS;
use super::{ImageError, OutputFormat, RasterFrame, StoreConfig};

/// 解码预算。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// 单帧像素上限（`width * height`）。
    pub max_frame_pixels: u64,
    /// 所有帧解码后的 RGBA8 总字节上限。
    pub max_total_bytes: u64,
}

impl DecodeLimits {
    pub const fn unlimited() -> Self {
        Self {
            max_frame_pixels: u64::MAX,
            max_total_bytes: u64::MAX,
        }
    }

    fn image_limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_total_bytes);
        limits
    }
}

impl From<&StoreConfig> for DecodeLimits {
    fn from(config: &StoreConfig) -> Self {
        Self {
            max_frame_pixels: config.max_decoded_pixels,
            max_total_bytes: config.max_total_bytes,
        }
    }
}

/// 识别字节流的图片格式。
///
/// 字节签名优先，识别失败时回退到扩展名提示。
pub fn detect_format(bytes: &[u8], hint: Option<ImageFormat>) -> Result<ImageFormat, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Decode("图片内容为空".to_string()));
    }

    match image::guess_format(bytes) {
        Ok(format) => Ok(format),
        Err(err) => hint.ok_or_else(|| {
            ImageError::Decode(format!("不支持的图片格式：{}", err))
        }),
    }
}

/// 将字节解码为有序的 RGBA8 帧序列（至少一帧）。
pub fn decode(
    bytes: &[u8],
    hint: Option<ImageFormat>,
    limits: DecodeLimits,
) -> Result<Vec<RasterFrame>, ImageError> {
    let format = detect_format(bytes, hint)?;

    let (header_width, header_height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))?;
    validate_pixel_limit(header_width, header_height, limits.max_frame_pixels)?;
    add_frame_bytes(0, header_width, header_height, limits.max_total_bytes)?;

    let frames = match format {
        ImageFormat::Gif => {
            let mut decoder = GifDecoder::new(Cursor::new(bytes))
                .map_err(|e| decode_error("GIF 解码失败", e))?;
            decoder
                .set_limits(limits.image_limits())
                .map_err(|e| decode_error("GIF 解码失败", e))?;
            collect_animation(decoder.into_frames(), limits)?
        }
        ImageFormat::Png => {
            let decoder = PngDecoder::with_limits(Cursor::new(bytes), limits.image_limits())
                .map_err(|e| decode_error("PNG 解码失败", e))?;
            let is_apng = decoder
                .is_apng()
                .map_err(|e| decode_error("PNG 解码失败", e))?;
            if is_apng {
                let apng = decoder
                    .apng()
                    .map_err(|e| decode_error("APNG 解码失败", e))?;
                collect_animation(apng.into_frames(), limits)?
            } else {
                decode_single(bytes, format, limits)?
            }
        }
        ImageFormat::WebP => {
            let mut decoder = WebPDecoder::new(Cursor::new(bytes))
                .map_err(|e| decode_error("WebP 解码失败", e))?;
            decoder
                .set_limits(limits.image_limits())
                .map_err(|e| decode_error("WebP 解码失败", e))?;
            if decoder.has_animation() {
                collect_animation(decoder.into_frames(), limits)?
            } else {
                decode_single(bytes, format, limits)?
            }
        }
        _ => decode_single(bytes, format, limits)?,
    };

    if frames.is_empty() {
        return Err(ImageError::Decode("图片不包含任何帧".to_string()));
    }

    log::debug!(
        "🧩 解码完成 - 格式: {:?} 帧数: {} 首帧尺寸: {}x{}",
        format,
        frames.len(),
        frames[0].width(),
        frames[0].height()
    );

    Ok(frames)
}

/// 将单帧编码为目标格式字节。
pub fn encode(frame: &RasterFrame, format: OutputFormat) -> Result<Vec<u8>, ImageError> {
    let view = frame
        .as_rgba_image()
        .ok_or_else(|| ImageError::Encode("像素缓冲长度异常".to_string()))?;

    let mut cursor = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => {
            let rgb: RgbImage = view.convert();
            rgb.write_to(&mut cursor, format.image_format())
        }
        _ => view.write_to(&mut cursor, format.image_format()),
    };

    result.map_err(|e| {
        ImageError::Encode(format!("{} 编码失败：{}", format.as_str(), e))
    })?;

    Ok(cursor.into_inner())
}

fn decode_single(
    bytes: &[u8],
    format: ImageFormat,
    limits: DecodeLimits,
) -> Result<Vec<RasterFrame>, ImageError> {
    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(limits.image_limits());
    let decoded = reader
        .decode()
        .map_err(|e| decode_error("图片解码失败", e))?;

    Ok(vec![RasterFrame::from_rgba_image(decoded.to_rgba8())])
}

/// 逐帧拉取动画，累计字节超出预算时立即失败。
fn collect_animation(frames: Frames<'_>, limits: DecodeLimits) -> Result<Vec<RasterFrame>, ImageError> {
    let mut total_bytes = 0u64;
    let mut collected = Vec::new();

    for frame in frames {
        let buffer = frame.map_err(|e| decode_error("动画帧解码失败", e))?.into_buffer();
        let (width, height) = buffer.dimensions();
        validate_pixel_limit(width, height, limits.max_frame_pixels)?;
        total_bytes = add_frame_bytes(total_bytes, width, height, limits.max_total_bytes)?;

        collected.push(RasterFrame::from_rgba_image(buffer));
    }

    Ok(collected)
}

fn add_frame_bytes(total: u64, width: u32, height: u32, max_total_bytes: u64) -> Result<u64, ImageError> {
    let total = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(CHANNELS as u64))
        .and_then(|bytes| bytes.checked_add(total))
        .ok_or_else(|| ImageError::ResourceLimit("解码体积溢出".to_string()))?;

    if total > max_total_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "解码后体积超出预算：至少 {} 字节（限制：{} 字节）",
            total, max_total_bytes
        )));
    }
    Ok(total)
}

fn decode_error(stage: &str, err: image::ImageError) -> ImageError {
    match err {
        image::ImageError::Limits(e) => ImageError::ResourceLimit(format!("{}：{}", stage, e)),
        other => ImageError::Decode(format!("{}：{}", stage, other)),
    }
}

fn validate_pixel_limit(width: u32, height: u32, max_pixels: u64) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::Decode(format!("图片尺寸非法：{}x{}", width, height)));
    }

    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > max_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, max_pixels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_store::Rgba8Color;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba, RgbaImage};

    fn gradient_frame(width: u32, height: u32) -> RasterFrame {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 40 % 256) as u8, (y * 70 % 256) as u8, ((x + y) * 13 % 256) as u8, 200])
        });
        RasterFrame::from_rgba_image(img)
    }

    fn two_frame_gif(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            let frames = [Rgba([255, 0, 0, 255]), Rgba([0, 0, 255, 255])].map(|px| {
                Frame::from_parts(
                    RgbaImage::from_pixel(width, height, px),
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                )
            });
            encoder.encode_frames(frames).expect("encode gif frames");
        }
        bytes
    }

    #[test]
    fn lossless_formats_roundtrip_exactly() {
        let frame = gradient_frame(7, 5);

        for format in [OutputFormat::Png, OutputFormat::Tiff, OutputFormat::Tga] {
            let bytes = encode(&frame, format).expect("encode frame");
            let decoded = decode(&bytes, Some(format.image_format()), DecodeLimits::unlimited())
                .expect("decode encoded frame");

            assert_eq!(decoded.len(), 1, "format {:?}", format);
            assert_eq!(decoded[0], frame, "format {:?}", format);
        }
    }

    #[test]
    fn lossy_formats_produce_decodable_bytes() {
        let frame = gradient_frame(16, 8);

        for format in [OutputFormat::Jpeg, OutputFormat::Gif, OutputFormat::Bmp] {
            let bytes = encode(&frame, format).expect("encode frame");
            assert_eq!(image::guess_format(&bytes).ok(), Some(format.image_format()));

            let decoded = decode(&bytes, None, DecodeLimits::unlimited()).expect("decode encoded frame");
            assert_eq!(decoded[0].size(), frame.size());
        }
    }

    #[test]
    fn animated_gif_yields_every_frame_in_order() {
        let bytes = two_frame_gif(3, 2);
        let frames = decode(&bytes, None, DecodeLimits::unlimited()).expect("decode gif");

        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.width() == 3 && f.height() == 2));
        assert_eq!(&frames[0].pixels()[..4], &[255, 0, 0, 255]);
        assert_eq!(&frames[1].pixels()[..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn rejects_garbage_and_empty_input() {
        assert!(matches!(decode(&[], None, DecodeLimits::unlimited()), Err(ImageError::Decode(_))));
        assert!(matches!(
            decode(b"definitely not an image", None, DecodeLimits::unlimited()),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn rejects_images_over_pixel_limit() {
        let frame = RasterFrame::filled(10, 10, Rgba8Color::TRANSPARENT).expect("fill frame");
        let png = encode(&frame, OutputFormat::Png).expect("encode png");

        let limits = DecodeLimits {
            max_frame_pixels: 99,
            ..DecodeLimits::unlimited()
        };
        let result = decode(&png, None, limits);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    // 首帧铺满画布，其余帧只有 1x1，但每帧都按整张画布解码。
    fn sparse_gif(canvas: u32, extra_frames: usize) -> Vec<u8> {
        let delay = Delay::from_numer_denom_ms(50, 1);
        let mut frames = vec![Frame::from_parts(
            RgbaImage::from_pixel(canvas, canvas, Rgba([0, 0, 0, 255])),
            0,
            0,
            delay,
        )];
        frames.extend((0..extra_frames).map(|i| {
            Frame::from_parts(RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255])), i as u32 % canvas, 0, delay)
        }));

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.encode_frames(frames).expect("encode gif frames");
        }
        bytes
    }

    #[test]
    fn many_frame_gif_over_total_budget_is_rejected() {
        let bytes = sparse_gif(128, 31);
        assert!(bytes.len() < 16 * 1024, "gif should stay tiny: {} bytes", bytes.len());

        let frames = decode(&bytes, None, DecodeLimits::unlimited()).expect("decode without budget");
        assert_eq!(frames.len(), 32);
        assert!(frames.iter().all(|f| f.width() == 128 && f.height() == 128));

        let limits = DecodeLimits {
            max_frame_pixels: u64::MAX,
            max_total_bytes: 128 * 128 * 4 * 8,
        };
        let result = decode(&bytes, None, limits);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn single_frame_over_total_budget_is_rejected_from_header() {
        let frame = RasterFrame::filled(32, 32, Rgba8Color::TRANSPARENT).expect("fill frame");
        let png = encode(&frame, OutputFormat::Png).expect("encode png");

        let limits = DecodeLimits {
            max_frame_pixels: u64::MAX,
            max_total_bytes: 32 * 32 * 4 - 1,
        };
        assert!(matches!(decode(&png, None, limits), Err(ImageError::ResourceLimit(_))));

        let exact = DecodeLimits {
            max_total_bytes: 32 * 32 * 4,
            ..limits
        };
        assert_eq!(decode(&png, None, exact).expect("fits budget").len(), 1);
    }
}
