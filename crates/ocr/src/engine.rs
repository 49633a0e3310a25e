//! OCR 引擎 trait 定义

use crate::types::{LineKey, OcrAuditInfo, OcrText, OcrTextResult};
use crate::OcrError;
use image::DynamicImage;

/// OCR 引擎统一 trait
///
/// 引擎实例可以持有可变状态，批处理时每个工作线程各自创建一个实例。
pub trait OcrEngine: Send {
    /// 识别图片中的文字（单词级）
    fn recognize_image(&mut self, img: &DynamicImage) -> Result<Vec<OcrTextResult>, OcrError>;

    /// 识别并拼接成整页文本
    fn recognize_text(&mut self, img: &DynamicImage) -> Result<OcrText, OcrError> {
        let results = self.recognize_image(img)?;
        Ok(assemble_text(&results))
    }

    /// 获取审计信息
    fn audit_info(&self) -> OcrAuditInfo;
}

/// 把单词级结果拼成文本：同一行的单词用空格连接，换行处插入 `\n`
///
/// 结果按引擎输出顺序处理，行号变化即视为换行。
pub fn assemble_text(results: &[OcrTextResult]) -> OcrText {
    let mut text = String::new();
    let mut current: Option<LineKey> = None;
    let mut conf_sum = 0.0f32;

    for word in results {
        match current {
            Some(line) if line == word.line => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(&word.text);
        current = Some(word.line);
        conf_sum += word.confidence;
    }

    let confidence = if results.is_empty() {
        None
    } else {
        Some(conf_sum / results.len() as f32)
    };

    OcrText { text, confidence }
}
