//! # 服务层（边界适配）
//!
//! ## 设计思路
//!
//! `ImageServiceState` 是 HTTP 等外部协议层唯一需要持有的状态：
//! 1. 在进入仓库之前完成参数校验（尺寸范围、帧数上限、总字节预算、id 格式）
//! 2. 把仓库的 `None` / `false` 翻译成带分类的 `ImageError`
//! 3. 解码、编码、降采样等慢操作放到 `spawn_blocking`，不阻塞异步运行时
//!
//! ## 实现思路
//!
//! 对外 API：list / load / create / remove / clear_all / data / download，
//! 以及 info / downscale / 像素读写与缩放档位切换。

use image::imageops::FilterType;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use super::{
    ImageData, ImageDownload, ImageError, ImageInfo, ImageSource, ImageStore, OutputFormat,
    RasterImage, ResizeQuality, Rgba8Color, StoreConfig, MAX_DIMENSION,
};

/// 图片服务状态。
pub struct ImageServiceState {
    store: Arc<ImageStore>,
    resize_filter: RwLock<FilterType>,
}

impl ImageServiceState {
    /// 使用默认配置创建服务状态。
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// 使用自定义配置创建服务状态。
    ///
    /// # 示例
    /// ```rust
    /// use image_inspector::image_store::{ImageServiceState, StoreConfig};
    ///
    /// let mut config = StoreConfig::default();
    /// config.max_frame_count = 16;
    /// let service = ImageServiceState::with_config(config);
    /// assert_eq!(service.store().count(), 0);
    /// ```
    pub fn with_config(config: StoreConfig) -> Self {
        let resize_filter = RwLock::new(config.resize_filter);
        Self {
            store: Arc::new(ImageStore::new(config)),
            resize_filter,
        }
    }

    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    /// 所有图片的元数据快照。已在并发删除中释放的图片会被跳过。
    pub fn list(&self) -> Vec<ImageInfo> {
        self.store
            .images()
            .iter()
            .filter_map(|image| ImageInfo::capture(image).ok())
            .collect()
    }

    /// 从任意来源加载图片。
    pub async fn load(&self, source: ImageSource) -> Result<ImageInfo, ImageError> {
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let image = store
                .load_source(source)
                .ok_or_else(|| ImageError::Decode("无法加载图片，文件缺失或格式不受支持".to_string()))?;
            ImageInfo::capture(&image)
        })
        .await
    }

    pub async fn load_file(&self, path: impl Into<String>) -> Result<ImageInfo, ImageError> {
        self.load(ImageSource::FilePath(path.into())).await
    }

    pub async fn load_base64(&self, data: impl Into<String>) -> Result<ImageInfo, ImageError> {
        self.load(ImageSource::Base64(data.into())).await
    }

    /// 合成纯色图片。尺寸越界在这里直接拒绝，不会进入仓库。
    pub async fn create(
        &self,
        width: i64,
        height: i64,
        frames: i64,
        hex_color: &str,
    ) -> Result<ImageInfo, ImageError> {
        let (width, height) = validate_dimensions(width, height)?;
        let frames = self.validate_frame_count(frames)?;
        self.store.config().check_total_bytes(width, height, frames)?;
        let color = Rgba8Color::from_hex_or_transparent(hex_color);

        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let image = store.create(width, height, frames, Some(color)).ok_or_else(|| {
                ImageError::ResourceLimit(format!(
                    "无法合成图片 {}x{}（{} 帧）",
                    width, height, frames
                ))
            })?;
            ImageInfo::capture(&image)
        })
        .await
    }

    pub fn remove(&self, id: &str) -> Result<(), ImageError> {
        let id = parse_id(id)?;
        if self.store.remove(&id) {
            Ok(())
        } else {
            Err(ImageError::NotFound(id.to_string()))
        }
    }

    pub async fn clear_all(&self) -> Result<(), ImageError> {
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            store.clear_all();
            Ok(())
        })
        .await
    }

    pub fn info(&self, id: &str) -> Result<ImageInfo, ImageError> {
        let image = self.image(id)?;
        ImageInfo::capture(&image)
    }

    /// 单帧编码为 base64，附带 MIME 类型。
    pub async fn data(&self, id: &str, frame_id: usize, format: &str) -> Result<ImageData, ImageError> {
        let image = self.image(id)?;
        let format = OutputFormat::from_token(format);

        run_blocking(move || {
            let encoded = image.encode(frame_id, format)?;
            Ok(ImageData::from_encoded(image.id(), frame_id, &encoded))
        })
        .await
    }

    /// 单帧编码为文件下载内容。
    pub async fn download(
        &self,
        id: &str,
        frame_id: usize,
        format: &str,
    ) -> Result<ImageDownload, ImageError> {
        let image = self.image(id)?;
        let format = OutputFormat::from_token(format);

        run_blocking(move || {
            let encoded = image.encode(frame_id, format)?;
            Ok(ImageDownload::from_encoded(image.id(), frame_id, encoded))
        })
        .await
    }

    /// 按系数降采样，返回更新后的快照。系数不在 (0, 1) 内时原样返回。
    pub async fn downscale(&self, id: &str, factor: f64) -> Result<ImageInfo, ImageError> {
        let image = self.image(id)?;
        let filter = self.resize_filter()?;

        run_blocking(move || {
            image.downscale(factor, filter)?;
            ImageInfo::capture(&image)
        })
        .await
    }

    pub fn get_pixels(&self, id: &str, frame_id: usize) -> Result<Vec<u8>, ImageError> {
        self.image(id)?.get_pixels(frame_id)
    }

    pub fn set_pixels(&self, id: &str, frame_id: usize, buffer: &[u8]) -> Result<ImageInfo, ImageError> {
        let image = self.image(id)?;
        image.set_pixels(buffer, frame_id)?;
        ImageInfo::capture(&image)
    }

    /// 设置缩放档位。
    pub fn set_resize_quality(&self, quality: &str) -> Result<(), ImageError> {
        let quality = ResizeQuality::parse(quality)?;
        let mut filter = self
            .resize_filter
            .write()
            .map_err(|_| ImageError::Internal("缩放配置写入锁已中毒".to_string()))?;
        *filter = quality.filter();

        log::info!("⚙️ 已切换缩放档位：{:?}（filter={:?}）", quality, *filter);
        Ok(())
    }

    /// 获取当前生效缩放档位（字符串）。
    pub fn get_resize_quality(&self) -> Result<String, ImageError> {
        let mut config = self.store.config().clone();
        config.resize_filter = self.resize_filter()?;
        Ok(config.resize_quality().as_str().to_string())
    }

    fn resize_filter(&self) -> Result<FilterType, ImageError> {
        self.resize_filter
            .read()
            .map(|filter| *filter)
            .map_err(|_| ImageError::Internal("缩放配置读取锁已中毒".to_string()))
    }

    fn image(&self, id: &str) -> Result<Arc<RasterImage>, ImageError> {
        let id = parse_id(id)?;
        self.store
            .lookup(&id)
            .ok_or_else(|| ImageError::NotFound(id.to_string()))
    }

    fn validate_frame_count(&self, frames: i64) -> Result<usize, ImageError> {
        let max = self.store.config().max_frame_count;
        if frames < 1 {
            return Err(ImageError::InvalidRequest(format!("帧数必须至少为 1，实际：{}", frames)));
        }
        if frames as u64 > max as u64 {
            return Err(ImageError::ResourceLimit(format!(
                "帧数过多：{}（限制：{}）",
                frames, max
            )));
        }
        Ok(frames as usize)
    }
}

impl Default for ImageServiceState {
    fn default() -> Self {
        Self::new()
    }
}

/// 边界层的尺寸校验：宽高都必须在 `[1, 32768]` 内。
pub fn validate_dimensions(width: i64, height: i64) -> Result<(u32, u32), ImageError> {
    let range = 1..=MAX_DIMENSION as i64;
    if !range.contains(&width) || !range.contains(&height) {
        return Err(ImageError::DimensionInvalid {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }
    Ok((width as u32, height as u32))
}

fn parse_id(id: &str) -> Result<Uuid, ImageError> {
    Uuid::parse_str(id.trim())
        .map_err(|e| ImageError::InvalidRequest(format!("图片 id 格式错误：{}（{}）", id, e)))
}

async fn run_blocking<T, F>(job: F) -> Result<T, ImageError>
where
    F: FnOnce() -> Result<T, ImageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ImageError::Internal(format!("后台任务执行失败：{}", e)))?
}
