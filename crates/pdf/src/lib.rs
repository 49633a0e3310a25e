//! PDF content-stream access and image-page encoding.
//!
//! 这一层只依赖 lopdf：读取页面内容流、MediaBox、原始文字操作数，
//! 识别深色填充矩形（疑似脱敏黑框），以及把位图包装成整页图片。

mod boxes;
mod document;
mod error;
mod image_page;
mod text;
mod utils;

pub use boxes::{detect_filled_rects, FilledRect};
pub use document::LoadedPdf;
pub use error::PdfError;
pub use image_page::{decode_page_image, encode_image_page, EncodedPage, IMAGE_NAME, MAX_PAGE_SIDE};
pub use text::{decode_pdf_string, extract_text_operands};
pub use utils::{classify_page, get_media_box, get_page_content, MediaBox, PageKind};

pub type Result<T> = std::result::Result<T, PdfError>;
