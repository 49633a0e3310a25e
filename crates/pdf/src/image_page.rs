//! 整页图片的编码与解码
//!
//! 编辑后的页面以一张整页图片重新写回：页面尺寸（pt）等于位图像素尺寸，
//! 内容流只有一条 `Do`。解码方向用于纯图片页（扫描件或本工具输出的页面）。

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{Rgba, RgbImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::utils::{get_page_content, resolve};
use crate::{PdfError, Result};

/// 页面边长上限（PDF 用户空间单位的实现限制）
pub const MAX_PAGE_SIDE: u32 = 14_400;

/// 整页图片在页面资源里的名字
pub const IMAGE_NAME: &str = "Im0";

/// 编码好的整页图片页面，交给 `LoadedPdf::replace_page` 写回文档
#[derive(Debug, Clone)]
pub struct EncodedPage {
    pub width: u32,
    pub height: u32,
    pub(crate) image: Stream,
    pub(crate) content: Vec<u8>,
}

/// 把 RGB 位图包装成整页图片：1 像素 = 1 pt
pub fn encode_image_page(image: &RgbImage) -> Result<EncodedPage> {
    let (width, height) = image.dimensions();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(image.as_raw())?;
    let data = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
        "Filter" => "FlateDecode",
    };
    // 已经是 Flate 数据，保存时不要再压一遍
    let stream = Stream::new(dict, data).with_compression(false);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content = content
        .encode()
        .map_err(|e| PdfError::Image(e.to_string()))?;

    Ok(EncodedPage {
        width,
        height,
        image: stream,
        content,
    })
}

/// 页面资源字典（支持引用和从 Parent 继承）
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = Some(page_id);
    let mut depth = 0;
    while let Some(id) = current {
        if depth > 32 {
            return None;
        }
        depth += 1;
        let dict = doc.get_object(id).ok()?.as_dict().ok()?;
        if let Ok(obj) = dict.get(b"Resources") {
            return resolve(doc, obj)?.as_dict().ok();
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => Some(*parent),
            _ => None,
        };
    }
    None
}

/// 读取纯图片页上的那张图片
///
/// 只接受内容流里恰好一次 `Do`、没有文字和路径操作的页面；
/// 其余页面返回 `Ok(None)`，由调用方决定是否换用完整渲染器。
pub fn decode_page_image(doc: &Document, page_id: ObjectId) -> Result<Option<RgbaImage>> {
    let content_data = get_page_content(doc, page_id)?;
    let content = Content::decode(&content_data).map_err(|e| PdfError::Content(e.to_string()))?;

    let mut image_names = Vec::new();
    for op in &content.operations {
        match op.operator.as_str() {
            "Do" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    image_names.push(name.clone());
                }
            }
            "Tj" | "TJ" | "'" | "\"" | "m" | "l" | "c" | "v" | "y" | "re" | "BI" | "sh" => {
                return Ok(None);
            }
            _ => {}
        }
    }

    let [name] = image_names.as_slice() else {
        return Ok(None);
    };

    let xobjects = page_resources(doc, page_id)
        .and_then(|res| res.get(b"XObject").ok())
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok());
    let Some(xobjects) = xobjects else {
        return Ok(None);
    };

    let stream = match xobjects.get(name).ok().and_then(|obj| resolve(doc, obj)) {
        Some(Object::Stream(stream)) => stream,
        _ => return Ok(None),
    };

    let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name);
    if !matches!(subtype, Ok(n) if n == b"Image") {
        return Ok(None);
    }

    decode_image_stream(stream).map(Some)
}

fn filter_name(stream: &Stream) -> Option<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(n)) => Some(n.clone()),
        Ok(Object::Array(arr)) => match arr.as_slice() {
            [Object::Name(n)] => Some(n.clone()),
            [] => None,
            // 多级过滤器链暂不支持，交给后面报错
            _ => Some(b"Chain".to_vec()),
        },
        _ => None,
    }
}

/// 读取图片边长，必须在 1..=MAX_PAGE_SIDE 内
fn image_side(stream: &Stream, key: &str) -> Result<u32> {
    let value = match stream.dict.get(key.as_bytes()) {
        Ok(Object::Integer(v)) => *v,
        _ => return Err(PdfError::Image(format!("缺少 {}", key))),
    };
    u32::try_from(value)
        .ok()
        .filter(|v| (1..=MAX_PAGE_SIDE).contains(v))
        .ok_or_else(|| {
            PdfError::Image(format!(
                "图片 {} 为 {}，超出支持范围（1..={}）",
                key, value, MAX_PAGE_SIDE
            ))
        })
}

fn decode_image_stream(stream: &Stream) -> Result<RgbaImage> {
    let width = image_side(stream, "Width")?;
    let height = image_side(stream, "Height")?;

    let data = match filter_name(stream).as_deref() {
        None => stream.content.clone(),
        Some(b"FlateDecode") => {
            let mut decoder = ZlibDecoder::new(stream.content.as_slice());
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| PdfError::Image(format!("Flate 解压失败: {}", e)))?;
            out
        }
        Some(b"DCTDecode") => {
            let img = image::load_from_memory(&stream.content)
                .map_err(|e| PdfError::Image(format!("JPEG 解码失败: {}", e)))?;
            return Ok(img.to_rgba8());
        }
        Some(other) => {
            return Err(PdfError::Image(format!(
                "不支持的过滤器: {}",
                String::from_utf8_lossy(other)
            )))
        }
    };

    let bits_per_component = match stream.dict.get(b"BitsPerComponent") {
        Ok(Object::Integer(b)) => *b,
        _ => 8,
    };
    if bits_per_component != 8 {
        return Err(PdfError::Image(format!(
            "不支持的位深: {}",
            bits_per_component
        )));
    }

    let color_space = stream.dict.get(b"ColorSpace").and_then(Object::as_name);
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| PdfError::Image(format!("图片尺寸溢出: {}x{}", width, height)))?;

    match color_space {
        Ok(b"DeviceRGB") if data.len() >= pixels.saturating_mul(3) => {
            let mut img = RgbaImage::new(width, height);
            for (i, px) in data.chunks_exact(3).take(pixels).enumerate() {
                let x = (i as u32) % width;
                let y = (i as u32) / width;
                img.put_pixel(x, y, Rgba([px[0], px[1], px[2], 255]));
            }
            Ok(img)
        }
        Ok(b"DeviceGray") if data.len() >= pixels => {
            let mut img = RgbaImage::new(width, height);
            for (i, &gray) in data.iter().take(pixels).enumerate() {
                let x = (i as u32) % width;
                let y = (i as u32) / width;
                img.put_pixel(x, y, Rgba([gray, gray, gray, 255]));
            }
            Ok(img)
        }
        _ => Err(PdfError::Image(format!(
            "不支持的颜色空间或数据长度不符（{}x{}，{} 字节）",
            width,
            height,
            data.len()
        ))),
    }
}
