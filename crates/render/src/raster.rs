use image::RgbaImage;

/// PDF 默认 72 DPI
const POINTS_PER_INCH: f32 = 72.0;

/// 渲染结果：某一页在给定缩放比例下的位图
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub image: RgbaImage,
    /// 像素 / pt
    pub scale: f32,
    pub page_index: usize,
}

impl Raster {
    pub fn new(image: RgbaImage, scale: f32, page_index: usize) -> Self {
        Self {
            image,
            scale,
            page_index,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}
