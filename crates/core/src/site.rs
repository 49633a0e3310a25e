//! 报告静态站点
//!
//! `build_site` 是纯函数：报告 -> 文件列表（相对路径 + 内容）。
//! 只有 `write_report` 触碰文件系统。

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::recover::{PageStatus, TextSource};
use crate::report::{DocumentStatus, Report, ReportEntry};
use crate::Result;

const STYLE: &str = r#"body { font-family: sans-serif; margin: 2em; color: #222; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
.failed { color: #b00020; }
.page { border-top: 2px solid #444; margin-top: 2em; }
.texts { display: flex; gap: 1em; }
.texts > div { flex: 1; min-width: 0; }
.primary h3::after { content: " (primary)"; color: #2e7d32; }
pre { white-space: pre-wrap; word-break: break-word; background: #f6f6f6; padding: 8px; }
.error { color: #b00020; font-style: italic; }
"#;

/// 站点中的一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    /// 相对输出目录的路径
    pub path: PathBuf,
    pub contents: String,
}

/// 文件名中只保留字母数字、`-` 和 `_`
fn slug(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let slug: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug
    }
}

/// 第 `index` 个文档的页面路径（相对输出目录）
pub fn document_page_path(index: usize, entry: &ReportEntry) -> String {
    format!("documents/{:03}-{}.html", index + 1, slug(&entry.name))
}

fn page_head(title: &str, css: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<link rel=\"stylesheet\" href=\"{}\">\n</head>\n<body>\n",
        encode_text(title),
        encode_double_quoted_attribute(css)
    )
}

fn render_index(report: &Report) -> String {
    let mut html = page_head("Unredact report", "style.css");
    let _ = writeln!(html, "<h1>Unredact report</h1>");
    let _ = writeln!(
        html,
        "<p>Input: <code>{}</code> &middot; {} documents, {} failed &middot; renderer: {}</p>",
        encode_text(&report.input_dir),
        report.entries.len(),
        report.failed_count(),
        encode_text(&report.rasterizer)
    );
    match &report.ocr_engine {
        Some(audit) => {
            let _ = writeln!(
                html,
                "<p>OCR: {} {} <code>{}</code>{}</p>",
                encode_text(&audit.engine),
                encode_text(audit.engine_version.as_deref().unwrap_or("")),
                encode_text(audit.engine_params.as_deref().unwrap_or("")),
                audit
                    .tessdata_hash
                    .as_deref()
                    .map(|h| format!(" &middot; tessdata {}", encode_text(h)))
                    .unwrap_or_default()
            );
        }
        None => {
            let _ = writeln!(html, "<p class=\"error\">OCR engine unavailable</p>");
        }
    }

    html.push_str(
        "<table>\n<tr><th>#</th><th>Document</th><th>Status</th><th>Pages</th><th>Raw text pages</th><th>OCR text pages</th></tr>\n",
    );
    for (index, entry) in report.entries.iter().enumerate() {
        let status = match &entry.status {
            DocumentStatus::Ok => "ok".to_string(),
            DocumentStatus::Failed { reason } => {
                format!("<span class=\"failed\">failed: {}</span>", encode_text(reason))
            }
        };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            index + 1,
            encode_double_quoted_attribute(&document_page_path(index, entry)),
            encode_text(&entry.name),
            status,
            entry.page_count,
            entry.pages_with_raw(),
            entry.pages_with_ocr()
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn text_block(html: &mut String, title: &str, text: &str, error: Option<&str>, primary: bool) {
    let class = if primary { " class=\"primary\"" } else { "" };
    let _ = writeln!(html, "<div{}>\n<h3>{}</h3>", class, title);
    if text.is_empty() {
        html.push_str("<p><em>(empty)</em></p>\n");
    } else {
        let _ = writeln!(html, "<pre>{}</pre>", encode_text(text));
    }
    if let Some(error) = error {
        let _ = writeln!(html, "<p class=\"error\">{}</p>", encode_text(error));
    }
    html.push_str("</div>\n");
}

fn render_document(entry: &ReportEntry) -> String {
    let mut html = page_head(&entry.name, "../style.css");
    let _ = writeln!(html, "<p><a href=\"../index.html\">&larr; index</a></p>");
    let _ = writeln!(html, "<h1>{}</h1>", encode_text(&entry.name));
    let _ = writeln!(html, "<p><code>{}</code></p>", encode_text(&entry.document));

    if let DocumentStatus::Failed { reason } = &entry.status {
        let _ = writeln!(html, "<p class=\"failed\">Failed: {}</p>", encode_text(reason));
    }

    if !entry.pages.is_empty() {
        html.push_str("<p>Pages:");
        for page in &entry.pages {
            let n = page.page_index + 1;
            let _ = write!(html, " <a href=\"#page-{}\">{}</a>", n, n);
        }
        html.push_str("</p>\n");
    }

    for page in &entry.pages {
        let n = page.page_index + 1;
        let _ = writeln!(html, "<section class=\"page\" id=\"page-{}\">", n);
        let kind = page
            .page_kind
            .map(|k| format!("{:?}", k))
            .unwrap_or_else(|| "unknown".to_string());
        let confidence = page
            .ocr_confidence
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            html,
            "<h2>Page {}</h2>\n<p>Kind: {} &middot; OCR confidence: {}</p>",
            n,
            encode_text(&kind),
            confidence
        );
        if let PageStatus::Failed { reason } = &page.status {
            let _ = writeln!(html, "<p class=\"failed\">Failed: {}</p>", encode_text(reason));
        }

        let primary = page.primary_source();
        html.push_str("<div class=\"texts\">\n");
        text_block(
            &mut html,
            "Raw text",
            &page.raw_extracted,
            page.raw_error.as_deref(),
            primary == TextSource::Raw,
        );
        text_block(
            &mut html,
            "OCR text",
            &page.ocr_extracted,
            page.ocr_error.as_deref(),
            primary == TextSource::Ocr,
        );
        html.push_str("</div>\n</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// 由报告生成站点文件：index.html、每文档一页、style.css、report.json
pub fn build_site(report: &Report) -> Result<Vec<SiteFile>> {
    let mut files = vec![
        SiteFile {
            path: PathBuf::from("index.html"),
            contents: render_index(report),
        },
        SiteFile {
            path: PathBuf::from("style.css"),
            contents: STYLE.to_string(),
        },
        SiteFile {
            path: PathBuf::from("report.json"),
            contents: serde_json::to_string_pretty(report)?,
        },
    ];

    for (index, entry) in report.entries.iter().enumerate() {
        files.push(SiteFile {
            path: PathBuf::from(document_page_path(index, entry)),
            contents: render_document(entry),
        });
    }

    Ok(files)
}

/// 写出站点，返回 index.html 路径
pub fn write_report(report: &Report, out_dir: &Path) -> Result<PathBuf> {
    for file in build_site(report)? {
        let dest = out_dir.join(&file.path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, file.contents)?;
    }

    let index = out_dir.join("index.html");
    log::info!("[Batch] 报告已写入 {}", index.display());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recover::RecoveryResult;
    use pretty_assertions::assert_eq;

    fn report() -> Report {
        let page = RecoveryResult {
            document: "/in/a&b.pdf".to_string(),
            page_index: 0,
            raw_extracted: "<script>alert(1)</script>".to_string(),
            ocr_extracted: "OCR".to_string(),
            ocr_confidence: Some(0.9),
            raw_error: None,
            ocr_error: None,
            page_kind: None,
            status: PageStatus::Ok,
        };
        Report {
            input_dir: "/in".to_string(),
            rasterizer: "image-page".to_string(),
            ocr_engine: None,
            entries: vec![
                ReportEntry::succeeded(Path::new("/in/a&b.pdf"), vec![page]),
                ReportEntry::failed(Path::new("/in/bad file.pdf"), "load <error>"),
            ],
        }
    }

    #[test]
    fn test_site_layout() {
        let files = build_site(&report()).unwrap();
        let paths: Vec<String> = files
            .iter()
            .map(|f| f.path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            vec![
                "index.html",
                "style.css",
                "report.json",
                "documents/001-a-b.html",
                "documents/002-bad-file.html",
            ]
        );
    }

    #[test]
    fn test_site_escapes_text_and_links_pages() {
        let files = build_site(&report()).unwrap();
        let index = &files[0].contents;
        assert!(index.contains("href=\"documents/001-a-b.html\""));
        assert!(index.contains("a&amp;b.pdf"));
        assert!(index.contains("load &lt;error&gt;"));

        let doc = &files[3].contents;
        assert!(doc.contains("id=\"page-1\""));
        assert!(doc.contains("href=\"#page-1\""));
        assert!(doc.contains("&lt;script&gt;"));
        assert!(!doc.contains("<script>"));
        assert!(doc.contains("class=\"primary\""));
    }

    #[test]
    fn test_site_is_pure_and_json_round_trips() {
        let report = report();
        assert_eq!(build_site(&report).unwrap(), build_site(&report).unwrap());
        let json = &build_site(&report).unwrap()[2].contents;
        let back: Report = serde_json::from_str(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let index = write_report(&report(), dir.path()).unwrap();
        assert!(index.is_file());
        assert!(dir.path().join("documents/002-bad-file.html").is_file());
    }
}
