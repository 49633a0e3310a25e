//! 批量自动恢复
//!
//! 文档之间互不共享可变状态，用 rayon 线程池按文档并行；OCR 引擎由工厂
//! 在每个工作线程上各创建一个。

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use unredact_ocr::OcrEngine;
use unredact_render::PageRasterizer;

use crate::pipeline::{CancelFlag, DocumentPipeline};
use crate::recover::TextRecoverer;
use crate::report::{Report, ReportEntry};
use crate::site::write_report;
use crate::{CoreError, Result};

/// 每个工作线程调用一次，返回 `None` 表示 OCR 不可用
pub type EngineFactory<'a> = Box<dyn Fn() -> Option<Box<dyn OcrEngine>> + Send + Sync + 'a>;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub workers: usize,
    /// OCR 渲染缩放比例
    pub ocr_scale: f32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            ocr_scale: 150.0 / 72.0,
        }
    }
}

/// 可用并行度，最多 4 个
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4)
}

/// 列出目录下的 PDF（扩展名不区分大小写），按文件名排序
pub fn list_documents(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut docs: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    docs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(docs)
}

pub struct BatchRunner<'a> {
    rasterizer: &'a dyn PageRasterizer,
    engine_factory: EngineFactory<'a>,
    options: BatchOptions,
    cancel: CancelFlag,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        rasterizer: &'a dyn PageRasterizer,
        engine_factory: EngineFactory<'a>,
        options: BatchOptions,
    ) -> Self {
        Self {
            rasterizer,
            engine_factory,
            options,
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// 处理输入目录中的全部 PDF，把报告站点写到输出目录
    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<Report> {
        let report = self.collect(input_dir)?;
        fs::create_dir_all(output_dir)?;
        write_report(&report, output_dir)?;
        Ok(report)
    }

    /// 只处理不写盘；条目顺序与目录枚举顺序一致
    pub fn collect(&self, input_dir: &Path) -> Result<Report> {
        let documents = list_documents(input_dir)?;
        log::info!(
            "[Batch] {} 中找到 {} 个 PDF，{} 个工作线程",
            input_dir.display(),
            documents.len(),
            self.options.workers
        );

        let ocr_engine = (self.engine_factory)().map(|engine| engine.audit_info());
        if ocr_engine.is_none() {
            log::warn!("[Batch] OCR 引擎不可用，只进行原始文字提取");
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers.max(1))
            .build()
            .map_err(|e| CoreError::BatchItem {
                path: input_dir.display().to_string(),
                reason: format!("无法创建线程池: {}", e),
            })?;

        let recoverer = TextRecoverer::new(self.options.ocr_scale);
        let entries: Vec<ReportEntry> = pool.install(|| {
            documents
                .par_iter()
                .map_init(
                    || (self.engine_factory)(),
                    |engine, path| self.process(path, &recoverer, engine.as_deref_mut()),
                )
                .collect()
        });

        if self.cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let report = Report {
            input_dir: input_dir.display().to_string(),
            rasterizer: self.rasterizer.name().to_string(),
            ocr_engine,
            entries,
        };
        log::info!(
            "[Batch] 完成: {} 成功, {} 失败",
            report.succeeded_count(),
            report.failed_count()
        );
        Ok(report)
    }

    fn process(
        &self,
        path: &Path,
        recoverer: &TextRecoverer,
        engine: Option<&mut (dyn OcrEngine + '_)>,
    ) -> ReportEntry {
        if self.cancel.is_cancelled() {
            return ReportEntry::failed(path, CoreError::Cancelled.to_string());
        }

        match self.process_document(path, recoverer, engine) {
            Ok(entry) => entry,
            Err(e) => {
                let item = CoreError::BatchItem {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                };
                log::warn!("[Batch] {}", item);
                ReportEntry::failed(path, e.to_string())
            }
        }
    }

    fn process_document(
        &self,
        path: &Path,
        recoverer: &TextRecoverer,
        engine: Option<&mut (dyn OcrEngine + '_)>,
    ) -> Result<ReportEntry> {
        log::info!("[Batch] 处理 {}", path.display());
        let mut pipeline = DocumentPipeline::load(path)?.with_cancel_flag(self.cancel.clone());
        pipeline.rasterize(self.rasterizer, recoverer.ocr_scale())?;
        pipeline.recover(recoverer, engine)?;
        Ok(ReportEntry::succeeded(path, pipeline.into_recoveries()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_documents_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let docs = list_documents(dir.path()).unwrap();
        let names: Vec<String> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_default_workers_capped() {
        let n = default_workers();
        assert!((1..=4).contains(&n));
    }
}
