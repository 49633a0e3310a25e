//! OCR 共享类型定义

use serde::{Deserialize, Serialize};

/// 单词所在的行（Tesseract 的 block / paragraph / line 编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LineKey {
    pub block: u32,
    pub par: u32,
    pub line: u32,
}

/// OCR 识别结果（单词级）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrTextResult {
    pub text: String,
    /// 0-1
    pub confidence: f32,
    pub bbox: BBox,
    pub line: LineKey,
}

/// 边界框（相对坐标 0-1）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// 整页识别文本
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrText {
    pub text: String,
    /// 单词平均置信度，没有识别出任何单词时为 `None`
    pub confidence: Option<f32>,
}

/// Tesseract 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TesseractConfig {
    /// Tesseract 可执行文件路径
    pub binary_path: Option<String>,
    /// tessdata 目录路径
    pub tessdata_path: Option<String>,
    /// 语言（如 "eng" 或 "chi_sim+eng"）
    pub lang: Option<String>,
    /// 页面分割模式 (0-13)
    pub psm: Option<u8>,
    /// OCR 引擎模式 (0-3)
    pub oem: Option<u8>,
}

impl TesseractConfig {
    pub fn binary_or_default(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("tesseract")
    }

    pub fn lang_or_default(&self) -> &str {
        self.lang.as_deref().unwrap_or("eng")
    }

    /// 默认整页自动分割：被遮盖的文字分布在整页各处
    pub fn psm_or_default(&self) -> u8 {
        self.psm.unwrap_or(3)
    }

    pub fn oem_or_default(&self) -> u8 {
        self.oem.unwrap_or(1)
    }
}

/// Tesseract 安装状态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TesseractStatus {
    /// 是否已安装
    pub installed: bool,
    pub version: Option<String>,
    /// 可执行文件路径
    pub binary_path: Option<String>,
    pub tessdata_path: Option<String>,
    /// 可用语言列表
    pub available_langs: Vec<String>,
    pub error: Option<String>,
}

/// OCR 审计信息，写入批处理报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrAuditInfo {
    /// 引擎名称
    pub engine: String,
    pub engine_version: Option<String>,
    /// 引擎参数（JSON）
    pub engine_params: Option<String>,
    /// tessdata 目录摘要（仅 Tesseract）
    pub tessdata_hash: Option<String>,
}
