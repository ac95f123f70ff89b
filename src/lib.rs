//! # 图片检查工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │          调用方（CLI / 外部 HTTP 适配层）                 │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ settings ─── JSON 设置文件 → StoreConfig              │
//! │  │                                                       │
//! │  └─ image_store  多帧图片仓库                             │
//! │      ├─ service      参数校验 + spawn_blocking            │
//! │      ├─ store        id → 图片 并发映射                   │
//! │      ├─ raster       读写锁保护的帧集合                   │
//! │      ├─ codec        解码 / 编码（含动图）                │
//! │      └─ resize       rayon 并行降采样                     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 设置文件读写，缺失或损坏时回退默认值 |
//! | [`image_store`] | 图片加载、合成、像素读写、编码导出、降采样与释放 |

pub mod error;
pub mod image_store;
pub mod settings;
