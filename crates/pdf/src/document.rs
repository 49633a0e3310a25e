//! 已加载的 PDF 文档
//!
//! 同时保存源文件字节和解析后的 lopdf 文档：pdfium 渲染需要原始字节，
//! 文字提取与页面替换走 lopdf。

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::image_page::{EncodedPage, IMAGE_NAME};
use crate::utils::{classify_page, get_media_box, get_page_content, MediaBox, PageKind};
use crate::{PdfError, Result};

/// 页面替换时需要去掉的页面键：新页面只用 MediaBox 定义尺寸，且不旋转
const STALE_PAGE_KEYS: [&[u8]; 5] = [b"CropBox", b"TrimBox", b"BleedBox", b"ArtBox", b"Rotate"];

#[derive(Debug, Clone)]
pub struct LoadedPdf {
    path: PathBuf,
    bytes: Vec<u8>,
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl LoadedPdf {
    /// 从文件加载
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::from_bytes(path, bytes)
    }

    /// 从内存加载，`path` 仅用于显示和命名
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self> {
        let path = path.into();
        let doc = Document::load_mem(&bytes).map_err(|e| PdfError::Load(e.to_string()))?;
        let page_ids: Vec<ObjectId> = doc.page_iter().collect();

        log::debug!("[Pdf] 加载 {}（{} 页）", path.display(), page_ids.len());

        Ok(Self {
            path,
            bytes,
            doc,
            page_ids,
        })
    }

    /// 生成 `pages` 页空白文档（尺寸单位 pt），主要用于测试和占位
    pub fn blank(pages: usize, width: f32, height: f32) -> Result<Self> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(pages);
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ],
                "Resources" => dictionary! {},
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| PdfError::Save(e.to_string()))?;
        Self::from_bytes("blank.pdf", bytes)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载时的原始字节（页面替换后不会更新）
    pub fn source_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(PdfError::MissingPage {
                index,
                count: self.page_ids.len(),
            })
    }

    pub fn page_content(&self, index: usize) -> Result<Vec<u8>> {
        get_page_content(&self.doc, self.page_id(index)?)
    }

    pub fn media_box(&self, index: usize) -> Result<MediaBox> {
        Ok(get_media_box(&self.doc, self.page_id(index)?))
    }

    pub fn page_kind(&self, index: usize) -> Result<PageKind> {
        Ok(classify_page(&self.page_content(index)?))
    }

    /// 用整页图片替换第 `index` 页的内容
    ///
    /// 页面对象本身保留（注释、链接等其他键不动），只替换内容、资源和尺寸。
    pub fn replace_page(&mut self, index: usize, page: &EncodedPage) -> Result<()> {
        let page_id = self.page_id(index)?;

        let image_id = self.doc.add_object(page.image.clone());
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, page.content.clone()));

        let dict = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::Content(e.to_string()))?;

        dict.set("Contents", Object::Reference(content_id));
        dict.set(
            "Resources",
            dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => Object::Reference(image_id),
                },
            },
        );
        dict.set(
            "MediaBox",
            vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(page.width as i64),
                Object::Integer(page.height as i64),
            ],
        );
        for key in STALE_PAGE_KEYS {
            dict.remove(key);
        }

        log::debug!(
            "[Pdf] 替换第 {} 页为 {}x{} 图片页",
            index + 1,
            page.width,
            page.height
        );
        Ok(())
    }

    /// 序列化当前文档（清理孤立对象并压缩）
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let pruned = self.doc.prune_objects();
        if !pruned.is_empty() {
            log::debug!("[Pdf] 清理 {} 个孤立对象", pruned.len());
        }
        self.doc.compress();

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| PdfError::Save(e.to_string()))?;
        Ok(out)
    }

    /// 保存到文件
    pub fn save(&mut self, dest: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(dest.as_ref(), bytes)?;
        log::info!("[Pdf] 已保存 {}", dest.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode_image_page;
    use image::RgbImage;

    #[test]
    fn test_blank_document() {
        let pdf = LoadedPdf::blank(3, 200.0, 100.0).unwrap();
        assert_eq!(pdf.page_count(), 3);
        let mb = pdf.media_box(2).unwrap();
        assert_eq!((mb.width(), mb.height()), (200.0, 100.0));
        assert_eq!(pdf.page_kind(0).unwrap(), PageKind::Empty);
    }

    #[test]
    fn test_missing_page() {
        let pdf = LoadedPdf::blank(1, 200.0, 100.0).unwrap();
        assert!(matches!(
            pdf.page_id(5),
            Err(PdfError::MissingPage { index: 5, count: 1 })
        ));
    }

    #[test]
    fn test_corrupt_bytes_fail_to_load() {
        let result = LoadedPdf::from_bytes("bad.pdf", b"not a pdf".to_vec());
        assert!(matches!(result, Err(PdfError::Load(_))));
    }

    #[test]
    fn test_replace_page_sets_media_box_and_drops_crop_box() {
        let mut pdf = LoadedPdf::blank(2, 612.0, 792.0).unwrap();
        let page_id = pdf.page_id(1).unwrap();
        if let Ok(Object::Dictionary(dict)) = pdf.doc.get_object_mut(page_id) {
            let crop: Vec<Object> = [0, 0, 300, 300].into_iter().map(Object::Integer).collect();
            dict.set("CropBox", crop);
            dict.set("Rotate", 90_i64);
        }

        let encoded = encode_image_page(&RgbImage::new(40, 30)).unwrap();
        pdf.replace_page(1, &encoded).unwrap();

        let reloaded = LoadedPdf::from_bytes("out.pdf", pdf.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.page_count(), 2);
        let mb = reloaded.media_box(1).unwrap();
        assert_eq!((mb.width(), mb.height()), (40.0, 30.0));
        assert_eq!(reloaded.page_kind(1).unwrap(), PageKind::ImageBased);

        let dict = reloaded
            .document()
            .get_object(reloaded.page_id(1).unwrap())
            .and_then(Object::as_dict)
            .unwrap();
        assert!(dict.get(b"Rotate").is_err());
        assert!(dict.get(b"CropBox").is_err());

        // 未替换的页面保持原尺寸
        let first = reloaded.media_box(0).unwrap();
        assert_eq!((first.width(), first.height()), (612.0, 792.0));
    }
}
