//! 脱敏框覆盖编辑与文字恢复
//!
//! - `selection`：选框校验、按尺寸分组、候选框检测
//! - `overlay`：在页面位图上绘制纯色或文字填充
//! - `recover`：原始文字 + OCR 双路恢复
//! - `pipeline`：单文档 渲染 → 编辑/恢复 → 回写 → 保存
//! - `batch` / `report` / `site`：目录批处理与静态报告

pub mod batch;
mod error;
pub mod fill;
pub mod fonts;
pub mod overlay;
pub mod pipeline;
pub mod recover;
pub mod report;
pub mod selection;
pub mod site;

pub use batch::{default_workers, list_documents, BatchOptions, BatchRunner, EngineFactory};
pub use error::CoreError;
pub use fill::{Color, FillSpec};
pub use fonts::load_font;
pub use overlay::OverlayEditor;
pub use pipeline::{CancelFlag, DocumentPipeline, EditRecord, PageState, PipelineState};
pub use recover::{primary_source, PageStatus, RecoveryResult, TextRecoverer, TextSource};
pub use report::{DocumentStatus, Report, ReportEntry};
pub use selection::{BoxGroup, BoxSelector, RedactionBox, RegionRect};
pub use site::{build_site, write_report, SiteFile};

pub type Result<T> = std::result::Result<T, CoreError>;
