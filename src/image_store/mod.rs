//! # 图片对象存储模块（image_store）
//!
//! ## 设计思路
//!
//! 内存中的多帧图片仓库：图片以 128 位随机 id 登记，可按帧读写 RGBA8 像素、
//! 编码为常见格式、整体按系数降采样，并由仓库显式释放。
//!
//! - `store`：id → 图片的并发映射，独占每个条目的生命周期
//! - `raster`：单个图片对象，帧集合放在一把读写锁之后
//! - `codec`：字节 ↔ 帧的解码与编码（含 GIF/APNG/WebP 动图）
//! - `resize`：逐帧并行降采样
//! - `loader`：文件 / Base64 / 内存字节加载与体积、签名校验
//! - `service`：边界层参数校验与异步入口（`ImageServiceState`）
//! - `config/error/format/color/frame/snapshot/source`：配置、错误与数据模型
//!
//! ## 实现思路
//!
//! 对外只暴露仓库、图片、快照与服务入口，编解码与缩放细节保持 `mod` 私有。
//!
//! ```text
//! 调用方（CLI / HTTP 适配层）
//!    ↓
//! service.rs（参数校验、spawn_blocking）
//!    ↓
//! store.rs（登记 / 查找 / 删除）
//!    ├─ loader.rs（来源加载 + 体积与签名校验）
//!    └─ raster.rs（读写锁保护的帧集合）
//!         ├─ codec.rs（解码 + 编码）
//!         └─ resize.rs（rayon 并行降采样）
//!    ↓
//! snapshot.rs（ImageInfo / ImageData / ImageDownload）
//! ```

mod codec;
mod color;
mod config;
mod error;
mod format;
mod frame;
mod loader;
mod raster;
mod resize;
mod service;
mod snapshot;
mod source;
mod store;

pub use color::Rgba8Color;
pub use codec::DecodeLimits;
pub use config::{ResizeQuality, StoreConfig, DEFAULT_MAX_TOTAL_BYTES, MAX_DIMENSION};
pub use error::{ErrorKind, ImageError};
pub use format::OutputFormat;
pub use frame::{FrameSize, RasterFrame, BITS_PER_CHANNEL, CHANNELS};
pub use raster::{EncodedFrame, RasterImage};
pub use service::{validate_dimensions, ImageServiceState};
pub use snapshot::{ImageData, ImageDownload, ImageInfo};
pub use source::ImageSource;
pub use store::ImageStore;
