//! OCR 引擎接口与 Tesseract CLI 实现
//!
//! 引擎只负责 位图 -> 单词级结果；行拼接和置信度汇总在 `assemble_text` 里完成，
//! 与具体引擎无关。

mod engine;
mod error;
mod tesseract;
mod types;

pub use engine::{assemble_text, OcrEngine};
pub use error::OcrError;
pub use tesseract::{
    compute_tessdata_hash, detect_tesseract_status, get_tesseract_langs, get_tesseract_version,
    parse_tesseract_tsv, TesseractEngine,
};
pub use types::{
    BBox, LineKey, OcrAuditInfo, OcrText, OcrTextResult, TesseractConfig, TesseractStatus,
};
