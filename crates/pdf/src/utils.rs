use crate::{PdfError, Result};
use lopdf::{content::Content, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

/// 页面边界框（PDF 用户空间，左下角为原点）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl MediaBox {
    /// Letter 尺寸，页面树里找不到任何边界框时使用
    pub const LETTER: MediaBox = MediaBox {
        llx: 0.0,
        lly: 0.0,
        urx: 612.0,
        ury: 792.0,
    };

    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }

    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }
}

/// 页面内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Text,       // 包含文字操作符 (Tj/TJ)
    PathDrawn,  // 主要是路径绘制
    ImageBased, // 主要是图片（扫描件）
    Mixed,      // 混合类型
    Empty,      // 空页面
}

/// 从数组对象中提取边界框坐标
fn extract_box_values(arr: &[Object]) -> Option<MediaBox> {
    let values: Vec<f32> = arr.iter().filter_map(get_number).collect();
    if values.len() == 4 {
        Some(MediaBox {
            llx: values[0].min(values[2]),
            lly: values[1].min(values[3]),
            urx: values[0].max(values[2]),
            ury: values[1].max(values[3]),
        })
    } else {
        None
    }
}

/// 获取页面的有效边界框（优先使用 CropBox，否则使用 MediaBox，沿 Parent 链继承）
pub fn get_media_box(doc: &Document, page_id: ObjectId) -> MediaBox {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        // 页面树深度一般不超过十几层，防止循环引用
        if depth > 32 {
            break;
        }
        depth += 1;

        let Ok(Object::Dictionary(dict)) = doc.get_object(id) else {
            break;
        };

        // 只有页面自身的 CropBox 有意义，继承时只看 MediaBox
        if id == page_id {
            if let Ok(Object::Array(arr)) = dict.get(b"CropBox") {
                if let Some(values) = extract_box_values(arr) {
                    return values;
                }
            }
        }

        if let Some(values) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| extract_box_values(arr))
        {
            return values;
        }

        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => Some(*parent),
            _ => None,
        };
    }

    log::warn!("[MediaBox] 页面 {:?} 未找到边界框，使用默认 Letter 尺寸", page_id);
    MediaBox::LETTER
}

/// 解引用间接对象
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// 从 Object 获取数值
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// 获取流内容（支持压缩和未压缩的流）
fn get_stream_content(stream: &Stream) -> Vec<u8> {
    match stream.decompressed_content() {
        Ok(data) => data,
        Err(_) => stream.content.clone(),
    }
}

/// 获取页面的内容流数据
///
/// 多个内容流按顺序拼接；没有 Contents 的页面视为空白页。
pub fn get_page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc
        .get_object(page_id)
        .map_err(|e| PdfError::Content(e.to_string()))?;

    let Object::Dictionary(dict) = page else {
        return Err(PdfError::Content(format!("{:?} 不是页面字典", page_id)));
    };

    let Ok(contents) = dict.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match contents {
        Object::Reference(ref_id) => match doc.get_object(*ref_id) {
            Ok(Object::Stream(stream)) => Ok(get_stream_content(stream)),
            Ok(Object::Array(arr)) => Ok(concat_streams(doc, arr)),
            _ => Err(PdfError::Content(format!("内容流 {:?} 无效", ref_id))),
        },
        Object::Array(arr) => Ok(concat_streams(doc, arr)),
        Object::Stream(stream) => Ok(get_stream_content(stream)),
        _ => Err(PdfError::Content("无法获取页面内容".to_string())),
    }
}

fn concat_streams(doc: &Document, arr: &[Object]) -> Vec<u8> {
    let mut all_content = Vec::new();
    for item in arr {
        if let Object::Reference(ref_id) = item {
            if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                all_content.extend(get_stream_content(stream));
                all_content.push(b'\n');
            }
        }
    }
    all_content
}

/// 检测页面内容类型
pub fn classify_page(content_data: &[u8]) -> PageKind {
    let content = match Content::decode(content_data) {
        Ok(c) => c,
        Err(_) => return PageKind::Empty,
    };

    let mut text_op_count = 0;
    let mut path_op_count = 0;
    let mut has_image_ops = false;

    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" | "TJ" | "'" | "\"" => text_op_count += 1,
            "m" | "l" | "c" | "v" | "y" | "h" | "re" => path_op_count += 1,
            "Do" | "BI" => has_image_ops = true,
            _ => {}
        }
    }

    log::debug!(
        "[ContentType] text_ops={}, path_ops={}, image_ops={}",
        text_op_count,
        path_op_count,
        has_image_ops
    );

    let has_text_ops = text_op_count > 0;
    let has_path_ops = path_op_count > 0;

    // 纯图片页面（扫描件）
    if !has_text_ops && !has_path_ops && has_image_ops {
        return PageKind::ImageBased;
    }

    // 表格边框之类的少量路径不影响文字型判断
    if has_text_ops && path_op_count < 500 {
        return PageKind::Text;
    }

    if !has_text_ops && !has_image_ops && has_path_ops {
        return PageKind::PathDrawn;
    }

    if has_text_ops || has_path_ops || has_image_ops {
        return PageKind::Mixed;
    }

    PageKind::Empty
}
