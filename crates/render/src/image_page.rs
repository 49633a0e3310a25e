//! 纯 Rust 的图片页渲染器
//!
//! 只处理“整页一张图片”的页面：扫描件，以及每一页经过 `encode` 回写的页面。
//! 最近邻缩放，结果完全确定。

use image::imageops::{self, FilterType};
use unredact_pdf::{decode_page_image, LoadedPdf};

use crate::{check_scale, target_size, PageRasterizer, Raster, RenderError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePageRasterizer;

impl PageRasterizer for ImagePageRasterizer {
    fn render(&self, pdf: &LoadedPdf, page_index: usize, scale: f32) -> Result<Raster> {
        check_scale(scale)?;
        let page_id = pdf.page_id(page_index)?;

        let Some(source) = decode_page_image(pdf.document(), page_id)? else {
            return Err(RenderError::Unsupported {
                backend: self.name(),
                page: page_index,
                reason: "页面不是单张整页图片".to_string(),
            });
        };

        let media_box = pdf.media_box(page_index)?;
        let (width, height) = target_size(media_box.width(), media_box.height(), scale)?;

        let image = if source.dimensions() == (width, height) {
            source
        } else {
            imageops::resize(&source, width, height, FilterType::Nearest)
        };

        log::debug!(
            "[Render] 图片页 {}: {}x{} px (scale {})",
            page_index,
            width,
            height,
            scale
        );
        Ok(Raster::new(image, scale, page_index))
    }

    fn name(&self) -> &'static str {
        "image-page"
    }
}
