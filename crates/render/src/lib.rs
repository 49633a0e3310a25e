//! 页面光栅化与整页图片回写
//!
//! `PageRasterizer` 把 PDF 页面渲染成固定缩放比例的位图，`encode` 把位图包装回
//! 单图片页面。两种后端：pdfium（完整渲染）和纯 Rust 的图片页渲染器（只处理
//! 扫描件和本工具输出的整页图片页）。

mod encode;
mod error;
mod image_page;
mod pdfium;
mod raster;

pub use encode::encode;
pub use error::{EncodeError, RenderError};
pub use image_page::ImagePageRasterizer;
pub use pdfium::{pdfium_status, PdfiumRasterizer, PdfiumStatus};
pub use raster::{scale_for_dpi, Raster};

use std::path::PathBuf;
use unredact_pdf::LoadedPdf;

pub type Result<T> = std::result::Result<T, RenderError>;

/// 页面光栅化后端
///
/// 对固定的 `(page, scale)` 必须输出完全相同的像素。
pub trait PageRasterizer: Send + Sync {
    fn render(&self, pdf: &LoadedPdf, page_index: usize, scale: f32) -> Result<Raster>;

    fn name(&self) -> &'static str;
}

/// 光栅化后端配置
#[derive(Debug, Clone, Default)]
pub struct RasterizerConfig {
    /// pdfium 动态库所在目录，优先于内置搜索路径
    pub pdfium_path: Option<PathBuf>,
}

/// 自动选择后端：pdfium 可用时使用 pdfium，否则退回图片页渲染器
pub fn auto_rasterizer(config: &RasterizerConfig) -> Box<dyn PageRasterizer> {
    let pdfium = PdfiumRasterizer::new(config.pdfium_path.clone());
    match pdfium.check() {
        Ok(()) => Box::new(pdfium),
        Err(e) => {
            log::warn!(
                "[Render] pdfium 不可用（{}），只能渲染整页图片页面",
                e
            );
            Box::new(ImagePageRasterizer)
        }
    }
}

pub(crate) fn check_scale(scale: f32) -> Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidScale(scale))
    }
}

/// 渲染位图的边长上限（像素），超出时按页面失败处理而不是分配内存
pub const MAX_RASTER_SIDE: u32 = 16_384;

/// 页面尺寸（pt）乘以缩放比例后的像素尺寸，至少 1 像素
pub(crate) fn target_size(width_pt: f32, height_pt: f32, scale: f32) -> Result<(u32, u32)> {
    let w = (width_pt * scale).round().max(1.0);
    let h = (height_pt * scale).round().max(1.0);
    let limit = MAX_RASTER_SIDE as f32;
    if !(w.is_finite() && h.is_finite()) || w > limit || h > limit {
        return Err(RenderError::TooLarge {
            width: w,
            height: h,
            max: MAX_RASTER_SIDE,
        });
    }
    Ok((w as u32, h as u32))
}
