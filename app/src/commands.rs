//! 子命令实现

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use unredact_core::{
    load_font, BatchOptions, BatchRunner, BoxSelector, DocumentPipeline, EngineFactory, FillSpec,
    OverlayEditor, PageState, RedactionBox, TextRecoverer,
};
use unredact_ocr::{detect_tesseract_status, OcrEngine, TesseractEngine};
use unredact_pdf::LoadedPdf;
use unredact_render::{
    auto_rasterizer, pdfium_status, scale_for_dpi, PageRasterizer, RasterizerConfig,
};

use crate::config::{save_config, AppConfig};
use crate::EditArgs;

fn rasterizer(config: &AppConfig) -> Box<dyn PageRasterizer> {
    auto_rasterizer(&RasterizerConfig {
        pdfium_path: config.pdfium_dir(),
    })
}

/// 找不到 Tesseract 时返回 None，只做原始文字提取
fn ocr_engine(config: &AppConfig) -> Option<TesseractEngine> {
    match TesseractEngine::new(config.tesseract_config()) {
        Ok(engine) => Some(engine),
        Err(e) => {
            log::warn!("[OCR] Tesseract 不可用: {}", e);
            None
        }
    }
}

fn page_index(page: usize, count: usize) -> Result<usize> {
    if page == 0 || page > count {
        bail!("页码 {} 超出范围（共 {} 页）", page, count);
    }
    Ok(page - 1)
}

pub fn boxes(config: &AppConfig, pdf_path: &Path, page: Option<usize>) -> Result<()> {
    let pdf = LoadedPdf::open(pdf_path)?;
    let scale = scale_for_dpi(config.preview_dpi_or_default());
    let pages = match page {
        Some(page) => vec![page_index(page, pdf.page_count())?],
        None => (0..pdf.page_count()).collect(),
    };

    let mut all = Vec::new();
    for index in pages {
        let candidates = BoxSelector::candidates(&pdf, index, scale)?;
        println!("page {}: {} boxes", index + 1, candidates.len());
        for b in &candidates {
            println!("  at {},{}  size {}x{}", b.x, b.y, b.width, b.height);
        }
        all.extend(candidates);
    }

    println!("groups (raster px at {} dpi):", config.preview_dpi_or_default());
    for group in BoxSelector::group_by_dimensions(&all) {
        let pages: Vec<String> = group
            .members
            .iter()
            .map(|b| (b.page_index + 1).to_string())
            .collect();
        println!(
            "  {}x{}: {} boxes on pages {}",
            group.width,
            group.height,
            group.members.len(),
            pages.join(",")
        );
    }
    Ok(())
}

fn fill_spec(args: &EditArgs) -> FillSpec {
    match &args.text {
        Some(text) => FillSpec::Text {
            text: text.clone(),
            font_size: args.font_size,
            color: args.text_color,
            background: args.background,
        },
        None => FillSpec::solid(args.fill.unwrap_or(unredact_core::Color::BLACK)),
    }
}

/// 把第一轮选中的框换算到后续轮次的位图上（每轮页面放大 `factor` 倍）
fn grow_box(b: &RedactionBox, factor: f32, raster_w: u32, raster_h: u32) -> Option<RedactionBox> {
    let x = ((b.x as f32) * factor).round() as u32;
    let y = ((b.y as f32) * factor).round() as u32;
    if x >= raster_w || y >= raster_h {
        return None;
    }
    let width = (((b.width as f32) * factor).round() as u32).min(raster_w - x);
    let height = (((b.height as f32) * factor).round() as u32).min(raster_h - y);
    Some(RedactionBox {
        page_index: b.page_index,
        x,
        y,
        width,
        height,
    })
}

fn select_boxes(
    args: &EditArgs,
    pipeline: &DocumentPipeline,
    index: usize,
    scale: f32,
) -> Result<Vec<RedactionBox>> {
    let raster = pipeline
        .raster(index)
        .ok_or_else(|| anyhow!("第 {} 页渲染失败", index + 1))?;

    let selected = match (args.rect, args.at) {
        (Some(rect), _) => BoxSelector::for_raster(raster).select(index, rect)?,
        (None, Some((x, y))) => {
            let candidates = BoxSelector::candidates(pipeline.pdf(), index, scale)?;
            BoxSelector::hit_test(&candidates, x, y)
                .ok_or_else(|| anyhow!("第 {} 页 ({}, {}) 处没有脱敏框", index + 1, x, y))?
        }
        (None, None) => bail!("需要 --rect 或 --at"),
    };

    if !args.all_matching {
        return Ok(vec![selected]);
    }

    let mut all = Vec::new();
    for page in 0..pipeline.page_count() {
        all.extend(BoxSelector::candidates(pipeline.pdf(), page, scale)?);
    }
    let group = BoxSelector::matching(&all, &selected);
    log::info!(
        "[Edit] {}x{} 的框共 {} 个",
        group.width,
        group.height,
        group.members.len()
    );
    Ok(group.members)
}

/// 只统计所在页面已成功写回的框
fn edited_box_count(boxes: &[RedactionBox], states: &[PageState]) -> usize {
    boxes
        .iter()
        .filter(|b| matches!(states.get(b.page_index), Some(PageState::Reencoded)))
        .count()
}

pub fn edit(config: &AppConfig, args: &EditArgs) -> Result<()> {
    if args.cycles == 0 {
        bail!("--cycles 至少为 1");
    }
    let fill = fill_spec(args);
    let editor = if fill.needs_font() {
        OverlayEditor::with_font(load_font(config.font_file().as_deref())?)
    } else {
        OverlayEditor::new()
    };
    let rasterizer = rasterizer(config);
    let scale = scale_for_dpi(config.preview_dpi_or_default());

    let mut pipeline = DocumentPipeline::load(&args.pdf)
        .with_context(|| format!("无法打开 {}", args.pdf.display()))?;
    let index = page_index(args.page, pipeline.page_count())?;
    let mut first: Vec<RedactionBox> = Vec::new();

    for cycle in 0..args.cycles {
        pipeline.rasterize(rasterizer.as_ref(), scale)?;

        let boxes = if cycle == 0 {
            first = select_boxes(args, &pipeline, index, scale)?;
            first.clone()
        } else {
            let factor = scale.powi(cycle as i32);
            first
                .iter()
                .filter_map(|b| {
                    let raster = pipeline.raster(b.page_index)?;
                    grow_box(b, factor, raster.width(), raster.height())
                })
                .collect()
        };

        pipeline.edit(&editor, &boxes, &fill)?;
        pipeline.reencode()?;
        pipeline.save(&args.output)?;

        let states = pipeline.page_states();
        for (page, state) in states.iter().enumerate() {
            if let PageState::Failed { reason } = state {
                println!("cycle {}: page {} failed: {}", cycle + 1, page + 1, reason);
            }
        }
        let media_box = pipeline.pdf().media_box(index)?;
        println!(
            "cycle {}: {} boxes edited, page {} is now {}x{} pt",
            cycle + 1,
            edited_box_count(&boxes, states),
            args.page,
            media_box.width(),
            media_box.height()
        );

        if cycle + 1 < args.cycles {
            pipeline = pipeline.next_cycle()?;
        }
    }

    println!("saved {}", args.output.display());
    Ok(())
}

pub fn recover(config: &AppConfig, pdf_path: &Path, json: bool) -> Result<()> {
    let rasterizer = rasterizer(config);
    let mut engine = ocr_engine(config);
    let recoverer = TextRecoverer::new(scale_for_dpi(config.ocr_dpi_or_default()));

    let mut pipeline = DocumentPipeline::load(pdf_path)
        .with_context(|| format!("无法打开 {}", pdf_path.display()))?;
    pipeline.rasterize(rasterizer.as_ref(), recoverer.ocr_scale())?;
    let results = pipeline.recover(
        &recoverer,
        engine.as_mut().map(|e| e as &mut dyn OcrEngine),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    for result in results {
        println!("== page {} ({:?}) ==", result.page_index + 1, result.primary_source());
        println!("raw: {}", result.raw_extracted);
        if let Some(error) = &result.raw_error {
            println!("raw error: {}", error);
        }
        println!("ocr: {}", result.ocr_extracted);
        if let Some(error) = &result.ocr_error {
            println!("ocr error: {}", error);
        }
    }
    Ok(())
}

pub fn batch(
    config: &AppConfig,
    input_dir: &Path,
    output_dir: &Path,
    workers: Option<usize>,
) -> Result<()> {
    let rasterizer = rasterizer(config);
    let tesseract = config.tesseract_config();
    let factory: EngineFactory = Box::new(move || {
        TesseractEngine::new(tesseract.clone())
            .map(|engine| Box::new(engine) as Box<dyn OcrEngine>)
            .map_err(|e| log::warn!("[OCR] Tesseract 不可用: {}", e))
            .ok()
    });
    let options = BatchOptions {
        workers: workers.unwrap_or_else(|| config.workers_or_default()),
        ocr_scale: scale_for_dpi(config.ocr_dpi_or_default()),
    };

    let report = BatchRunner::new(rasterizer.as_ref(), factory, options).run(input_dir, output_dir)?;
    println!(
        "{} documents: {} ok, {} failed",
        report.entries.len(),
        report.succeeded_count(),
        report.failed_count()
    );
    println!("{}", output_dir.join("index.html").display());
    Ok(())
}

pub fn status(config: &AppConfig) -> Result<()> {
    let pdfium = pdfium_status(config.pdfium_dir().as_ref());
    if pdfium.available {
        println!(
            "pdfium: available ({})",
            pdfium.library_path.as_deref().unwrap_or("system")
        );
    } else {
        println!(
            "pdfium: unavailable ({}), only full-page image pages can be rendered",
            pdfium.error.as_deref().unwrap_or("unknown error")
        );
    }

    let tesseract = detect_tesseract_status(&config.tesseract_config());
    if tesseract.installed {
        println!(
            "tesseract: {} at {}",
            tesseract.version.as_deref().unwrap_or("?"),
            tesseract.binary_path.as_deref().unwrap_or("?")
        );
        println!(
            "  tessdata: {}",
            tesseract.tessdata_path.as_deref().unwrap_or("default")
        );
        println!("  languages: {}", tesseract.available_langs.join(", "));
    } else {
        println!(
            "tesseract: not installed ({})",
            tesseract.error.as_deref().unwrap_or("not found")
        );
    }
    Ok(())
}

pub fn config(config: &AppConfig, path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            bail!("{} 已存在", path.display());
        }
        save_config(path, &AppConfig::with_defaults())?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
