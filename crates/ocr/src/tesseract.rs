//! Tesseract OCR 引擎实现（CLI 包装）

use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use crate::engine::OcrEngine;
use crate::types::{
    BBox, LineKey, OcrAuditInfo, OcrTextResult, TesseractConfig, TesseractStatus,
};
use crate::OcrError;

/// Tesseract OCR 引擎
pub struct TesseractEngine {
    config: TesseractConfig,
    version: Option<String>,
}

impl TesseractEngine {
    /// 创建 Tesseract 引擎，先确认可执行文件可用
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        let version = get_tesseract_version(config.binary_or_default())?;

        log::info!("[Tesseract] 初始化成功，版本: {}", version);

        Ok(Self {
            config,
            version: Some(version),
        })
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    fn run(&self, image_path: &Path, img_width: f32, img_height: f32) -> Result<Vec<OcrTextResult>, OcrError> {
        let mut cmd = Command::new(self.config.binary_or_default());

        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(self.config.lang_or_default())
            .arg("--psm")
            .arg(self.config.psm_or_default().to_string())
            .arg("--oem")
            .arg(self.config.oem_or_default().to_string())
            .arg("tsv");

        // 设置 tessdata 路径
        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }

        log::debug!(
            "[Tesseract] 执行: {} {} -l {} --psm {} --oem {} tsv",
            self.config.binary_or_default(),
            image_path.display(),
            self.config.lang_or_default(),
            self.config.psm_or_default(),
            self.config.oem_or_default()
        );

        let output = cmd
            .output()
            .map_err(|e| OcrError::NotAvailable(format!("执行 tesseract 失败: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "Tesseract 执行失败: {}",
                stderr.trim()
            )));
        }

        let tsv_output = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tesseract_tsv(&tsv_output, img_width, img_height))
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize_image(&mut self, img: &DynamicImage) -> Result<Vec<OcrTextResult>, OcrError> {
        let start = Instant::now();

        if img.width() == 0 || img.height() == 0 {
            return Err(OcrError::ImageProcess("图片尺寸为 0".to_string()));
        }

        // 每次识别使用独立临时文件，多个工作线程并发时互不覆盖
        let temp_input = tempfile::Builder::new()
            .prefix("unredact-ocr-")
            .suffix(".png")
            .tempfile()?;

        img.to_rgb8()
            .save_with_format(temp_input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::ImageProcess(format!("保存临时图片失败: {}", e)))?;

        let results = self.run(temp_input.path(), img.width() as f32, img.height() as f32)?;

        log::info!(
            "[Tesseract] 识别完成，耗时: {} ms，结果数: {}",
            start.elapsed().as_millis(),
            results.len()
        );

        Ok(results)
    }

    fn audit_info(&self) -> OcrAuditInfo {
        let params = serde_json::json!({
            "lang": self.config.lang_or_default(),
            "psm": self.config.psm_or_default(),
            "oem": self.config.oem_or_default(),
        });

        OcrAuditInfo {
            engine: "tesseract".to_string(),
            engine_version: self.version.clone(),
            engine_params: Some(params.to_string()),
            tessdata_hash: self
                .config
                .tessdata_path
                .as_ref()
                .and_then(|p| compute_tessdata_hash(Path::new(p)).ok()),
        }
    }
}

/// TSV 中单词所在层级
const WORD_LEVEL: u8 = 5;

/// TSV 一行：level page block par line word left top width height conf text
struct TsvRow<'a> {
    level: u8,
    line: LineKey,
    rect: [f32; 4],
    conf: f32,
    text: &'a str,
}

impl<'a> TsvRow<'a> {
    fn parse(row: &'a str) -> Option<Self> {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            return None;
        }
        let int = |i: usize| cols[i].trim().parse::<u32>().ok();
        let num = |i: usize| cols[i].trim().parse::<f32>().ok();

        Some(Self {
            level: cols[0].trim().parse().ok()?,
            line: LineKey {
                block: int(2)?,
                par: int(3)?,
                line: int(4)?,
            },
            rect: [num(6)?, num(7)?, num(8)?, num(9)?],
            conf: num(10).unwrap_or(-1.0),
            text: cols[11].trim(),
        })
    }

    /// 有文字、有置信度的单词行
    fn is_word(&self) -> bool {
        self.level == WORD_LEVEL && !self.text.is_empty() && self.conf >= 0.0
    }
}

/// 解析 `tesseract ... tsv` 的输出，返回单词级结果
///
/// bbox 归一化到 0-1，置信度从 0-100 换算到 0-1；表头和无法解析的行被跳过。
pub fn parse_tesseract_tsv(tsv: &str, img_width: f32, img_height: f32) -> Vec<OcrTextResult> {
    tsv.lines()
        .skip(1)
        .filter_map(TsvRow::parse)
        .filter(TsvRow::is_word)
        .map(|row| {
            let [left, top, width, height] = row.rect;
            OcrTextResult {
                text: row.text.to_string(),
                confidence: row.conf / 100.0,
                bbox: BBox {
                    x: left / img_width,
                    y: top / img_height,
                    w: width / img_width,
                    h: height / img_height,
                },
                line: row.line,
            }
        })
        .collect()
}

/// 获取 Tesseract 版本
pub fn get_tesseract_version(binary_path: &str) -> Result<String, OcrError> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::NotAvailable(format!("无法执行 {}: {}", binary_path, e)))?;

    if !output.status.success() {
        return Err(OcrError::NotAvailable(
            "tesseract --version 执行失败".to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    Ok(parse_version(&combined).unwrap_or_else(|| "unknown".to_string()))
}

/// 版本号通常在第一行，格式为 "tesseract 5.3.0" 或 "tesseract v5.3.0"
fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| line.contains("tesseract"))
        .find_map(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
}

/// 获取 Tesseract 可用语言列表
pub fn get_tesseract_langs(
    binary_path: &str,
    tessdata_path: Option<&str>,
) -> Result<Vec<String>, OcrError> {
    let mut cmd = Command::new(binary_path);
    cmd.arg("--list-langs");

    if let Some(path) = tessdata_path {
        cmd.env("TESSDATA_PREFIX", path);
    }

    let output = cmd
        .output()
        .map_err(|e| OcrError::NotAvailable(format!("执行失败: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(parse_langs(&format!("{}{}", stdout, stderr)))
}

fn parse_langs(output: &str) -> Vec<String> {
    let mut langs = Vec::new();
    let mut found_list = false;

    for line in output.lines() {
        let line = line.trim();
        if line.contains("List of available languages") {
            found_list = true;
            continue;
        }
        if found_list && !line.is_empty() && !line.contains(':') {
            langs.push(line.to_string());
        }
    }

    langs
}

/// 检测 Tesseract 安装状态
pub fn detect_tesseract_status(config: &TesseractConfig) -> TesseractStatus {
    // 先试配置路径或 PATH 中的 tesseract，再试 which 找到的完整路径
    let mut candidates = vec![config.binary_or_default().to_string()];
    if let Some(found) = which_tesseract("tesseract") {
        if !candidates.contains(&found) {
            candidates.push(found);
        }
    }

    for binary in &candidates {
        let Ok(version) = get_tesseract_version(binary) else {
            continue;
        };
        let langs =
            get_tesseract_langs(binary, config.tessdata_path.as_deref()).unwrap_or_default();
        let tessdata = config
            .tessdata_path
            .clone()
            .or_else(|| find_tessdata_path(binary));

        return TesseractStatus {
            installed: true,
            version: Some(version),
            binary_path: which_tesseract(binary).or_else(|| Some(binary.clone())),
            tessdata_path: tessdata,
            available_langs: langs,
            error: None,
        };
    }

    TesseractStatus {
        installed: false,
        version: None,
        binary_path: None,
        tessdata_path: None,
        available_langs: Vec::new(),
        error: Some("无法检测到 Tesseract，请确认已安装并正确配置".to_string()),
    }
}

/// 查找 tesseract 可执行文件的完整路径
fn which_tesseract(binary: &str) -> Option<String> {
    #[cfg(target_os = "windows")]
    let finder = "where";
    #[cfg(not(target_os = "windows"))]
    let finder = "which";

    Command::new(finder)
        .arg(binary)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| {
            String::from_utf8_lossy(&o.stdout)
                .lines()
                .next()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
}

/// 常见的 tessdata 安装位置
const TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    "C:\\Program Files\\Tesseract-OCR\\tessdata",
];

/// 依次查找 TESSDATA_PREFIX、tesseract 自报的参数、常见安装目录
fn find_tessdata_path(binary_path: &str) -> Option<String> {
    let exists = |p: &str| Path::new(p).is_dir();

    std::env::var("TESSDATA_PREFIX")
        .ok()
        .filter(|p| exists(p))
        .or_else(|| {
            let output = Command::new(binary_path).arg("--print-parameters").output().ok()?;
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .filter(|l| l.contains("tessdata"))
                .filter_map(|l| l.split_whitespace().last())
                .map(|p| p.trim_matches('"').to_string())
                .find(|p| exists(p))
        })
        .or_else(|| {
            TESSDATA_DIRS
                .iter()
                .find(|p| exists(p))
                .map(|p| p.to_string())
        })
}

/// 计算 tessdata 目录摘要（用于审计）
///
/// 对所有 `.traineddata` 文件按文件名排序后，把文件名和大小喂给 SHA-256。
pub fn compute_tessdata_hash(tessdata_path: &Path) -> Result<String, OcrError> {
    let mut entries: Vec<(String, u64)> = std::fs::read_dir(tessdata_path)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "traineddata")
                .unwrap_or(false)
        })
        .map(|e| {
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            (e.file_name().to_string_lossy().to_string(), size)
        })
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (name, size) in &entries {
        hasher.update(name.as_bytes());
        hasher.update(size.to_le_bytes());
    }

    Ok(hex::encode(hasher.finalize()))
}
