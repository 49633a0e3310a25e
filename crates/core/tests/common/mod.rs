#![allow(dead_code)]

use ab_glyph::FontArc;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, Stream};
use unredact_ocr::{BBox, LineKey, OcrAuditInfo, OcrEngine, OcrError, OcrTextResult};
use unredact_pdf::{encode_image_page, LoadedPdf};
use unredact_render::{ImagePageRasterizer, PageRasterizer, Raster, RenderError};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 文字填充测试用的系统字体，找不到时直接失败
pub fn system_font() -> FontArc {
    unredact_core::load_font(None)
        .expect("文字填充测试需要系统字体（DejaVu Sans 或 Liberation Sans）")
}

/// 单页文字 PDF：每段文字一个 Tj，最后在文字上盖一个 120x16 的黑框
pub fn text_pdf_bytes(parts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let shows: String = parts.iter().map(|p| format!("({}) Tj ", p)).collect();
    let content = format!("BT /F1 12 Tf 72 700 Td {}ET 0 g 70 695 120 16 re f", shows);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// 单页“扫描件”：整页一张白底图片，左上角有一块黑色
pub fn scanned_pdf(width: u32, height: u32) -> LoadedPdf {
    let image = RgbImage::from_fn(width, height, |x, y| {
        if x < width / 4 && y < height / 4 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let encoded = encode_image_page(&image).unwrap();
    let mut pdf = LoadedPdf::blank(1, width as f32, height as f32).unwrap();
    pdf.replace_page(0, &encoded).unwrap();
    LoadedPdf::from_bytes("scanned.pdf", pdf.to_bytes().unwrap()).unwrap()
}

pub fn scanned_pdf_bytes(width: u32, height: u32) -> Vec<u8> {
    scanned_pdf(width, height).source_bytes().to_vec()
}

/// 单页图片页：图片字典声明 70000x70000 灰度，但只有 16 字节数据
pub fn oversized_image_pdf_bytes() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(70_000),
            "Height" => Object::Integer(70_000),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => Object::Integer(8),
        },
        vec![0; 16],
    ));
    let content = b"q 100 0 0 100 0 0 cm /Im0 Do Q".to_vec();
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(100),
            Object::Integer(100),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// 图片页按真实像素渲染，其余页面渲染成白纸
pub struct PaperRasterizer;

impl PageRasterizer for PaperRasterizer {
    fn render(&self, pdf: &LoadedPdf, page_index: usize, scale: f32) -> unredact_render::Result<Raster> {
        match ImagePageRasterizer.render(pdf, page_index, scale) {
            Err(RenderError::Unsupported { .. }) => {
                let mb = pdf.media_box(page_index)?;
                let w = (mb.width() * scale).round().max(1.0) as u32;
                let h = (mb.height() * scale).round().max(1.0) as u32;
                Ok(Raster::new(
                    RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
                    scale,
                    page_index,
                ))
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "paper"
    }
}

/// 对任何位图都返回同一段文字
pub struct ScriptedOcr {
    pub text: String,
}

impl OcrEngine for ScriptedOcr {
    fn recognize_image(&mut self, _img: &DynamicImage) -> Result<Vec<OcrTextResult>, OcrError> {
        Ok(self
            .text
            .split_whitespace()
            .map(|word| OcrTextResult {
                text: word.to_string(),
                confidence: 0.8,
                bbox: BBox {
                    x: 0.0,
                    y: 0.0,
                    w: 0.1,
                    h: 0.1,
                },
                line: LineKey::default(),
            })
            .collect())
    }

    fn audit_info(&self) -> OcrAuditInfo {
        OcrAuditInfo {
            engine: "scripted".to_string(),
            engine_version: Some("1".to_string()),
            engine_params: None,
            tessdata_hash: None,
        }
    }
}
