//! # 数据源与中间模型
//!
//! 将“外部输入类型”和“加载阶段结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节

use image::ImageFormat;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 本地文件路径来源。
    FilePath(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 已在内存中的原始字节（例如上传内容），附带可选的文件名提示。
    Bytes {
        bytes: Vec<u8>,
        file_name: Option<String>,
    },
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 记录到 `RasterImage` 的来源路径，非文件来源为空字符串。
    pub(crate) source_path: String,
    /// 根据扩展名推断的格式，用于 TGA 等无魔数格式。
    pub(crate) format_hint: Option<ImageFormat>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}
