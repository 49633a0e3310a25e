use image::buffer::ConvertBuffer;
use image::RgbImage;
use unredact_pdf::{encode_image_page, EncodedPage, MAX_PAGE_SIDE};

use crate::{EncodeError, Raster};

/// 把位图包装成整页图片页面
///
/// 1 像素对应 1 pt：缩放比例为 S 的位图编码后，页面尺寸是原页面的 S 倍。
/// 反复编辑同一页时页面尺寸按 S 的幂次增长，而文字填充保持原字号。
pub fn encode(raster: &Raster) -> Result<EncodedPage, EncodeError> {
    let (width, height) = raster.image.dimensions();
    if width == 0 || height == 0 || width > MAX_PAGE_SIDE || height > MAX_PAGE_SIDE {
        return Err(EncodeError::TooLarge {
            width,
            height,
            max: MAX_PAGE_SIDE,
        });
    }

    // PDF 图片不带透明通道
    let rgb: RgbImage = raster.image.convert();
    let page = encode_image_page(&rgb)?;

    log::debug!(
        "[Render] 编码第 {} 页: {}x{} px -> {}x{} pt",
        raster.page_index + 1,
        width,
        height,
        page.width,
        page.height
    );
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_encode_page_size_equals_pixels() {
        let raster = Raster::new(RgbaImage::new(300, 200), 1.5, 0);
        let page = encode(&raster).unwrap();
        assert_eq!((page.width, page.height), (300, 200));
    }

    #[test]
    fn test_encode_rejects_oversized_raster() {
        let raster = Raster::new(RgbaImage::new(MAX_PAGE_SIDE + 1, 1), 1.0, 0);
        assert!(matches!(
            encode(&raster),
            Err(EncodeError::TooLarge { width, .. }) if width == MAX_PAGE_SIDE + 1
        ));
    }

    #[test]
    fn test_encode_rejects_empty_raster() {
        let raster = Raster::new(RgbaImage::new(0, 10), 1.0, 0);
        assert!(matches!(encode(&raster), Err(EncodeError::TooLarge { .. })));
    }
}
