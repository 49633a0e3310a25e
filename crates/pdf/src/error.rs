//! PDF 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("无法加载 PDF: {0}")]
    Load(String),

    #[error("页面 {index} 不存在（共 {count} 页）")]
    MissingPage { index: usize, count: usize },

    #[error("无法解析页面内容: {0}")]
    Content(String),

    #[error("图片处理失败: {0}")]
    Image(String),

    #[error("保存失败: {0}")]
    Save(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
