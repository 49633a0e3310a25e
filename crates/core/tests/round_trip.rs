mod common;

use common::{init_logging, scanned_pdf, system_font, text_pdf_bytes, ScriptedOcr};
use image::Rgba;
use pretty_assertions::assert_eq;
use unredact_core::{
    BoxSelector, Color, DocumentPipeline, FillSpec, OverlayEditor, PageStatus, PipelineState,
    RedactionBox, TextRecoverer, TextSource,
};
use unredact_pdf::LoadedPdf;
use unredact_render::{ImagePageRasterizer, PageRasterizer, Raster};

#[test]
fn test_each_cycle_multiplies_page_size_by_scale() {
    init_logging();
    let scale = 2.0;
    let fill = FillSpec::solid(Color::BLACK);
    let editor = OverlayEditor::new();
    let mut pipeline = DocumentPipeline::from_pdf(scanned_pdf(100, 50));

    for n in 0..3u32 {
        pipeline.rasterize(&ImagePageRasterizer, scale).unwrap();
        let factor = 2u32.pow(n + 1);
        let raster = pipeline.raster(0).unwrap();
        assert_eq!((raster.width(), raster.height()), (100 * factor, 50 * factor));

        let selector = BoxSelector::for_raster(raster);
        let rect = selector
            .select(0, unredact_core::RegionRect::new(0, 0, 10, 10))
            .unwrap();
        pipeline.edit(&editor, &[rect], &fill).unwrap();
        pipeline.reencode().unwrap();
        pipeline = pipeline.next_cycle().unwrap();

        let media_box = pipeline.pdf().media_box(0).unwrap();
        assert_eq!(
            (media_box.width(), media_box.height()),
            ((100 * factor) as f32, (50 * factor) as f32)
        );
    }

    assert_eq!(pipeline.cycle(), 3);
    assert_eq!(pipeline.history().len(), 3);
    assert!(pipeline.history().iter().all(|record| record.fill == fill));
    let cycles: Vec<u32> = pipeline.history().iter().map(|r| r.cycle).collect();
    assert_eq!(cycles, vec![0, 1, 2]);
}

/// 框内深色像素所占的行数（字形的像素高度）
fn glyph_height(raster: &Raster, b: &RedactionBox) -> u32 {
    let rows: Vec<u32> = (b.y..b.y + b.height)
        .filter(|&y| (b.x..b.x + b.width).any(|x| raster.image.get_pixel(x, y).0[0] < 128))
        .collect();
    match (rows.first(), rows.last()) {
        (Some(top), Some(bottom)) => bottom - top + 1,
        _ => 0,
    }
}

#[test]
fn test_text_fill_keeps_pixel_size_while_page_grows() {
    init_logging();
    let scale = 2.0;
    let font_size = 12.0;
    let editor = OverlayEditor::with_font(system_font());
    let fill = FillSpec::text("REDACTED", font_size);
    let mut pipeline = DocumentPipeline::from_pdf(scanned_pdf(120, 60));
    let b = RedactionBox {
        page_index: 0,
        x: 4,
        y: 4,
        width: 200,
        height: 40,
    };

    let mut widths = Vec::new();
    let mut heights = Vec::new();
    for _ in 0..3 {
        pipeline.rasterize(&ImagePageRasterizer, scale).unwrap();
        pipeline.edit(&editor, &[b], &fill).unwrap();
        let raster = pipeline.raster(0).unwrap();
        widths.push(raster.width());
        heights.push(glyph_height(raster, &b));
        pipeline.reencode().unwrap();
        pipeline = pipeline.next_cycle().unwrap();
    }

    // 页面每轮放大 S 倍，字形始终约为 font_size·S 像素
    assert_eq!(widths, vec![240, 480, 960]);
    let expected = font_size * scale;
    for h in &heights {
        let h = *h as f32;
        assert!(h >= expected * 0.5 && h <= expected * 1.2, "{:?}", heights);
    }
    assert!(heights.iter().all(|h| h.abs_diff(heights[0]) <= 1), "{:?}", heights);

    for record in pipeline.history() {
        match &record.fill {
            FillSpec::Text { font_size, .. } => assert_eq!(*font_size, 12.0),
            other => panic!("unexpected fill {:?}", other),
        }
    }
}

#[test]
fn test_edited_pixels_persist_through_reencode() {
    let mut pipeline = DocumentPipeline::from_pdf(scanned_pdf(40, 40));
    pipeline.rasterize(&ImagePageRasterizer, 1.0).unwrap();
    let b = RedactionBox {
        page_index: 0,
        x: 20,
        y: 20,
        width: 10,
        height: 10,
    };
    pipeline
        .edit(&OverlayEditor::new(), &[b], &FillSpec::solid("#ff0000".parse().unwrap()))
        .unwrap();
    pipeline.reencode().unwrap();
    let next = pipeline.next_cycle().unwrap();

    let raster = ImagePageRasterizer.render(next.pdf(), 0, 1.0).unwrap();
    assert_eq!(raster.image.get_pixel(25, 25), &Rgba([255, 0, 0, 255]));
    // 原有的左上角黑块保留
    assert_eq!(raster.image.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
    assert_eq!(raster.image.get_pixel(35, 5), &Rgba([255, 255, 255, 255]));
}

#[test]
fn test_raw_text_is_concatenation_of_operands() {
    init_logging();
    let pdf = LoadedPdf::from_bytes("statement.pdf", text_pdf_bytes(&["Account ", "4411-", "0923"]))
        .unwrap();
    let mut pipeline = DocumentPipeline::from_pdf(pdf);
    pipeline.rasterize(&common::PaperRasterizer, 1.0).unwrap();

    let mut engine = ScriptedOcr {
        text: "Account".to_string(),
    };
    let results = pipeline
        .recover(&TextRecoverer::new(1.0), Some(&mut engine))
        .unwrap()
        .to_vec();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].raw_extracted, "Account 4411-0923");
    assert_eq!(results[0].ocr_extracted, "Account");
    assert_eq!(results[0].primary_source(), TextSource::Raw);
    assert_eq!(results[0].status, PageStatus::Ok);
    assert_eq!(pipeline.state(), PipelineState::Recovered);
}

#[test]
fn test_scanned_page_falls_back_to_ocr() {
    let mut pipeline = DocumentPipeline::from_pdf(scanned_pdf(60, 60));
    pipeline.rasterize(&ImagePageRasterizer, 1.0).unwrap();

    let mut engine = ScriptedOcr {
        text: "hidden name".to_string(),
    };
    let results = pipeline
        .recover(&TextRecoverer::new(1.0), Some(&mut engine))
        .unwrap();

    assert_eq!(results[0].raw_extracted, "");
    assert_eq!(results[0].ocr_extracted, "hidden name");
    assert_eq!(results[0].primary_source(), TextSource::Ocr);
}

#[test]
fn test_candidates_from_drawn_black_box() {
    let pdf = LoadedPdf::from_bytes("boxes.pdf", text_pdf_bytes(&["Secret"])).unwrap();
    let candidates = BoxSelector::candidates(&pdf, 0, 1.0).unwrap();
    assert_eq!(
        candidates,
        vec![RedactionBox {
            page_index: 0,
            x: 70,
            y: 81,
            width: 120,
            height: 16,
        }]
    );

    let hit = BoxSelector::hit_test(&candidates, 100, 90).unwrap();
    let group = BoxSelector::matching(&candidates, &hit);
    assert_eq!(group.members.len(), 1);
    assert!(BoxSelector::hit_test(&candidates, 10, 10).is_none());
}
