//! 核心错误类型

use thiserror::Error;
use unredact_ocr::OcrError;
use unredact_pdf::PdfError;
use unredact_render::{EncodeError, RenderError};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("选区无效: {0}")]
    InvalidRegion(String),

    #[error("状态转换无效: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("渲染失败: {0}")]
    Render(#[from] RenderError),

    #[error("编码失败: {0}")]
    Encode(#[from] EncodeError),

    #[error("OCR 失败: {0}")]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("字体不可用: {0}")]
    Font(String),

    #[error("颜色格式无效: {0}")]
    InvalidColor(String),

    #[error("操作已取消")]
    Cancelled,

    #[error("文档 {path} 处理失败: {reason}")]
    BatchItem { path: String, reason: String },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}
