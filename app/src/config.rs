use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use unredact_core::default_workers;
use unredact_ocr::TesseractConfig;

pub const DEFAULT_PREVIEW_DPI: u32 = 108;
pub const DEFAULT_OCR_DPI: u32 = 150;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    // ============ 渲染 ============
    /// 交互编辑时的渲染 DPI
    pub preview_dpi: Option<u32>,
    /// OCR 渲染 DPI
    pub ocr_dpi: Option<u32>,
    /// pdfium 动态库所在目录
    pub pdfium_path: Option<String>,

    // ============ 编辑 ============
    /// 文字填充使用的 TrueType 字体
    pub font_path: Option<String>,

    // ============ 批处理 ============
    pub workers: Option<usize>,

    // ============ OCR ============
    pub tesseract: Option<TesseractConfig>,
}

impl AppConfig {
    pub fn preview_dpi_or_default(&self) -> u32 {
        self.preview_dpi.unwrap_or(DEFAULT_PREVIEW_DPI)
    }

    pub fn ocr_dpi_or_default(&self) -> u32 {
        self.ocr_dpi.unwrap_or(DEFAULT_OCR_DPI)
    }

    pub fn workers_or_default(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    pub fn pdfium_dir(&self) -> Option<PathBuf> {
        self.pdfium_path.as_ref().map(PathBuf::from)
    }

    pub fn font_file(&self) -> Option<PathBuf> {
        self.font_path.as_ref().map(PathBuf::from)
    }

    pub fn tesseract_config(&self) -> TesseractConfig {
        self.tesseract.clone().unwrap_or_default()
    }

    /// 所有字段都填上默认值，供 `config --init` 写出
    pub fn with_defaults() -> Self {
        Self {
            preview_dpi: Some(DEFAULT_PREVIEW_DPI),
            ocr_dpi: Some(DEFAULT_OCR_DPI),
            pdfium_path: None,
            font_path: None,
            workers: Some(default_workers()),
            tesseract: Some(TesseractConfig {
                binary_path: None,
                tessdata_path: None,
                lang: Some("eng".to_string()),
                psm: Some(3),
                oem: Some(1),
            }),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// 用 `UNREDACT_*` 变量覆盖配置；数值只接受正数
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn positive<T: std::str::FromStr + PartialOrd + Default>(raw: Option<String>) -> Option<T> {
            raw.and_then(|v| v.trim().parse::<T>().ok())
                .filter(|v| *v > T::default())
        }

        if let Some(dpi) = positive(lookup("UNREDACT_OCR_DPI")) {
            self.ocr_dpi = Some(dpi);
        }
        if let Some(dpi) = positive(lookup("UNREDACT_PREVIEW_DPI")) {
            self.preview_dpi = Some(dpi);
        }
        if let Some(workers) = positive(lookup("UNREDACT_WORKERS")) {
            self.workers = Some(workers);
        }
        if let Some(path) = lookup("UNREDACT_PDFIUM_PATH").filter(|p| !p.trim().is_empty()) {
            self.pdfium_path = Some(path);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config dir unavailable")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("unredact").join("config.json"))
}

/// 文件不存在时返回默认配置
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        log::debug!("[Config] {} 不存在，使用默认配置", path.display());
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(path, raw)?;
    log::info!("[Config] 配置已写入 {}", path.display());
    Ok(())
}
