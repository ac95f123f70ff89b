//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError` 枚举，CLI 与设置读写统一返回 `Result<T, AppError>`，
//! 替代分散的 `.map_err(|e| e.to_string())` 与 `expect()`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError`、`std::io::Error`、`serde_json::Error` 提供 `From` 转换，`?` 直接上抛。
//! - 实现 `Serialize` 将错误序列化为字符串，便于以 JSON 输出给调用方。

use serde::Serialize;

use crate::image_store::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片存储链路错误（加载 / 解码 / 编码 / 降采样）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化 / 反序列化失败
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 设置文件读写失败
    #[error("设置错误: {0}")]
    Settings(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
