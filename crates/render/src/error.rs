use thiserror::Error;
use unredact_pdf::PdfError;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("缩放比例无效: {0}")]
    InvalidScale(f32),

    #[error("渲染后端错误: {0}")]
    Backend(String),

    #[error("渲染尺寸 {width}x{height} 超出上限（边长 {max} 像素）")]
    TooLarge { width: f32, height: f32, max: u32 },

    #[error("页面 {page} 无法由 {backend} 渲染: {reason}")]
    Unsupported {
        backend: &'static str,
        page: usize,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("位图尺寸 {width}x{height} 超出支持范围（边长 1..={max}）")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error(transparent)]
    Pdf(#[from] PdfError),
}
