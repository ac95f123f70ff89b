//! # 图片对象仓库
//!
//! ## 设计思路
//!
//! `ImageStore` 是 id → `RasterImage` 的并发映射，独占每个条目的生命周期：
//! 图片只能由 `load*` / `create` 插入，由 `remove` / `clear_all` 删除，
//! 删除时立即释放像素缓冲，不依赖 `Drop` 时机。
//!
//! ## 实现思路
//!
//! - 映射放在一把 `RwLock<HashMap>` 之后，只有插入、删除这一步持写锁。
//! - 读文件、解码、合成像素都在锁外完成，慢操作不会阻塞其它调用方。
//! - 失败统一“吞掉原因、返回 None/false”，原因写入日志。
//! - id 为 128 位随机值，理论上的碰撞会丢弃新对象并返回 `None`。

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use uuid::Uuid;

use super::{loader, DecodeLimits, ImageError, ImageSource, RasterImage, Rgba8Color, StoreConfig, MAX_DIMENSION};

/// 并发图片仓库。
#[derive(Debug)]
pub struct ImageStore {
    config: StoreConfig,
    images: RwLock<HashMap<Uuid, Arc<RasterImage>>>,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl ImageStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            images: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// 从本地文件加载。任何失败（文件缺失、格式损坏）都返回 `None`。
    pub fn load(&self, file_path: &str) -> Option<Arc<RasterImage>> {
        self.load_source(ImageSource::FilePath(file_path.to_string()))
    }

    /// 从任意来源加载，失败原因只写日志。
    pub fn load_source(&self, source: ImageSource) -> Option<Arc<RasterImage>> {
        match self.try_load_source(source) {
            Ok(image) => self.insert(image),
            Err(err) => {
                log::warn!("⚠️ 图片加载失败：{}", err);
                None
            }
        }
    }

    fn try_load_source(&self, source: ImageSource) -> Result<RasterImage, ImageError> {
        let start = Instant::now();

        let raw = loader::load_source(source, &self.config)?;
        let load_elapsed = start.elapsed();

        let image = RasterImage::from_bytes(
            &raw.bytes,
            raw.source_path,
            raw.format_hint,
            DecodeLimits::from(&self.config),
        )?;

        log::info!(
            "✅ 图片加载完成 - 来源: {} 帧数: {} load={}ms total={}ms",
            raw.source_hint,
            image.frame_count(),
            load_elapsed.as_millis(),
            start.elapsed().as_millis()
        );

        Ok(image)
    }

    /// 合成纯色图片。
    ///
    /// 宽高先被钳制到 `[1, 32768]`；帧数必须在 `[1, max_frame_count]` 内；
    /// 总字节数必须在 `max_total_bytes` 内，超出时不分配任何像素；
    /// 未指定颜色时使用透明黑。
    pub fn create(
        &self,
        width: u32,
        height: u32,
        frame_count: usize,
        color: Option<Rgba8Color>,
    ) -> Option<Arc<RasterImage>> {
        let width = width.clamp(1, MAX_DIMENSION);
        let height = height.clamp(1, MAX_DIMENSION);

        if frame_count == 0 || frame_count > self.config.max_frame_count {
            log::warn!(
                "⚠️ 帧数 {} 超出允许范围（1~{}）",
                frame_count,
                self.config.max_frame_count
            );
            return None;
        }

        if let Err(err) = self.config.check_total_bytes(width, height, frame_count) {
            log::warn!("⚠️ 拒绝合成图片：{}", err);
            return None;
        }

        let color = color.unwrap_or(Rgba8Color::TRANSPARENT);
        match RasterImage::from_dimensions(width, height, frame_count, color) {
            Ok(image) => {
                log::info!(
                    "🆕 已合成图片 - 尺寸: {}x{} 帧数: {} 颜色: {:?}",
                    width,
                    height,
                    frame_count,
                    color
                );
                self.insert(image)
            }
            Err(err) => {
                log::warn!("⚠️ 图片合成失败：{}", err);
                None
            }
        }
    }

    /// 按 id 查找，纯读操作。
    pub fn lookup(&self, id: &Uuid) -> Option<Arc<RasterImage>> {
        self.read_map().get(id).cloned()
    }

    /// 删除并释放图片。同一 id 只会成功一次。
    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self.write_map().remove(id);

        match removed {
            Some(image) => {
                image.dispose();
                log::info!("🗑️ 已删除图片 {}", id);
                true
            }
            None => false,
        }
    }

    /// 释放所有图片并清空仓库。
    pub fn clear_all(&self) {
        let drained: Vec<Arc<RasterImage>> = {
            let mut images = self.write_map();
            images.drain().map(|(_, image)| image).collect()
        };

        for image in &drained {
            image.dispose();
        }

        if !drained.is_empty() {
            log::info!("🧹 已清空图片仓库 - 释放 {} 张图片", drained.len());
        }
    }

    pub fn count(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// 当前所有图片的句柄（按创建时间排序）。
    pub fn images(&self) -> Vec<Arc<RasterImage>> {
        let mut images: Vec<_> = self.read_map().values().cloned().collect();
        images.sort_by_key(|image| image.created_at());
        images
    }

    fn insert(&self, image: RasterImage) -> Option<Arc<RasterImage>> {
        let image = Arc::new(image);

        let inserted = match self.write_map().entry(image.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&image));
                true
            }
        };

        if inserted {
            Some(image)
        } else {
            log::warn!("⚠️ 图片 id 冲突，丢弃新对象：{}", image.id());
            image.dispose();
            None
        }
    }

    // 临界区内只做 HashMap 操作，不会留下半更新状态，中毒后直接沿用内部数据。
    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Arc<RasterImage>>> {
        self.images.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Arc<RasterImage>>> {
        self.images.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ImageStore {
    fn drop(&mut self) {
        self.clear_all();
    }
}
