//! 批处理报告模型

use std::path::Path;

use serde::{Deserialize, Serialize};
use unredact_ocr::OcrAuditInfo;

use crate::recover::RecoveryResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DocumentStatus {
    Ok,
    Failed { reason: String },
}

/// 一个文档的恢复结果（按页顺序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub document: String,
    /// 文件名，用于展示和生成页面名
    pub name: String,
    pub status: DocumentStatus,
    pub page_count: usize,
    pub pages: Vec<RecoveryResult>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl ReportEntry {
    pub fn succeeded(path: &Path, pages: Vec<RecoveryResult>) -> Self {
        Self {
            document: path.display().to_string(),
            name: file_name(path),
            status: DocumentStatus::Ok,
            page_count: pages.len(),
            pages,
        }
    }

    pub fn failed(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            document: path.display().to_string(),
            name: file_name(path),
            status: DocumentStatus::Failed {
                reason: reason.into(),
            },
            page_count: 0,
            pages: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, DocumentStatus::Failed { .. })
    }

    pub fn pages_with_raw(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| !p.raw_extracted.trim().is_empty())
            .count()
    }

    pub fn pages_with_ocr(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| !p.ocr_extracted.trim().is_empty())
            .count()
    }
}

/// 整个批处理的报告；静态站点完全由它生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub input_dir: String,
    /// 使用的渲染后端
    pub rasterizer: String,
    pub ocr_engine: Option<OcrAuditInfo>,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failed()).count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.entries.len() - self.failed_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recover::PageStatus;

    fn page(raw: &str, ocr: &str) -> RecoveryResult {
        RecoveryResult {
            document: "a.pdf".to_string(),
            page_index: 0,
            raw_extracted: raw.to_string(),
            ocr_extracted: ocr.to_string(),
            ocr_confidence: None,
            raw_error: None,
            ocr_error: None,
            page_kind: None,
            status: PageStatus::Ok,
        }
    }

    #[test]
    fn test_entry_counts() {
        let entry = ReportEntry::succeeded(
            Path::new("/in/a.pdf"),
            vec![page("x", ""), page("", "y"), page("z", "z"), page(" ", "")],
        );
        assert_eq!(entry.name, "a.pdf");
        assert_eq!(entry.page_count, 4);
        assert_eq!(entry.pages_with_raw(), 2);
        assert_eq!(entry.pages_with_ocr(), 2);
    }

    #[test]
    fn test_failed_entry() {
        let entry = ReportEntry::failed(Path::new("/in/bad.pdf"), "无法加载");
        assert!(entry.is_failed());
        assert_eq!(entry.page_count, 0);

        let report = Report {
            input_dir: "/in".to_string(),
            rasterizer: "image-page".to_string(),
            ocr_engine: None,
            entries: vec![entry, ReportEntry::succeeded(Path::new("/in/a.pdf"), vec![])],
        };
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.succeeded_count(), 1);
    }
}
