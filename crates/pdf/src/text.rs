//! 原始文字提取：直接读取内容流里文字操作符的字符串操作数，不经过渲染。

use crate::{PdfError, Result};
use lopdf::{content::Content, Object};

/// 按内容流顺序拼接所有文字显示操作符（Tj / TJ / ' / "）的字符串操作数
///
/// 不插入任何分隔符，也不考虑字形位置；TJ 数组里的字距调整数值被忽略。
/// 没有文字对象的页面（例如扫描件）返回空字符串。
pub fn extract_text_operands(content_data: &[u8]) -> Result<String> {
    let content = Content::decode(content_data).map_err(|e| PdfError::Content(e.to_string()))?;
    let mut text = String::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" | "'" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    text.push_str(&decode_pdf_string(bytes));
                }
            }
            "\"" => {
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    text.push_str(&decode_pdf_string(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(arr)) = op.operands.first() {
                    for item in arr {
                        if let Object::String(bytes, _) = item {
                            text.push_str(&decode_pdf_string(bytes));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(text)
}

/// 解码 PDF 字符串
///
/// 带 BOM 或高字节全为 0 时按 UTF-16BE 解码（常见于 CID 字体），否则按 Latin-1。
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16be(rest);
    }

    let looks_like_utf16 = bytes.len() >= 2
        && bytes.len() % 2 == 0
        && bytes.chunks(2).all(|pair| pair[0] == 0 && pair[1] != 0);
    if looks_like_utf16 {
        return decode_utf16be(bytes);
    }

    bytes.iter().map(|&b| b as char).collect()
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|chunk| match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}
