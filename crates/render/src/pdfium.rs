//! pdfium 渲染后端

use std::path::PathBuf;
use std::sync::Mutex;

use pdfium_render::prelude::*;
use serde::Serialize;
use unredact_pdf::LoadedPdf;

use crate::{check_scale, target_size, PageRasterizer, Raster, RenderError, Result};

/// pdfium 不是线程安全的，所有调用串行化
static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

/// pdfium 库状态（供 `status` 命令展示）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfiumStatus {
    pub available: bool,
    pub library_path: Option<String>,
    pub error: Option<String>,
}

/// 获取 pdfium 库的搜索路径
fn get_pdfium_search_paths(configured: Option<&PathBuf>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. 配置文件指定的目录
    if let Some(dir) = configured {
        paths.push(dir.clone());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            // 2. 可执行文件同级的 libs 目录和同级目录
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());

            // 3. macOS: app bundle 内的 Resources 目录
            #[cfg(target_os = "macos")]
            {
                if let Some(contents_dir) = exe_dir.parent() {
                    paths.push(contents_dir.join("Resources").join("libs"));
                }
            }
        }
    }

    // 4. 当前目录
    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));

    paths
}

/// 尝试绑定 pdfium 库，返回库实例和来源描述
fn bind_pdfium(configured: Option<&PathBuf>) -> std::result::Result<(Pdfium, String), String> {
    for path in &get_pdfium_search_paths(configured) {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(path);
        log::debug!("[Render] 尝试加载 pdfium: {:?}", lib_path);

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            return Ok((Pdfium::new(bindings), lib_path.display().to_string()));
        }
    }

    // 最后尝试系统库
    log::debug!("[Render] 尝试加载系统 pdfium 库");
    Pdfium::bind_to_system_library()
        .map(|bindings| (Pdfium::new(bindings), "system".to_string()))
        .map_err(|e| format!("Pdfium 库不可用: {}", e))
}

/// 检测 pdfium 是否可用
pub fn pdfium_status(configured: Option<&PathBuf>) -> PdfiumStatus {
    let _guard = PDFIUM_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    match bind_pdfium(configured) {
        Ok((_, path)) => PdfiumStatus {
            available: true,
            library_path: Some(path),
            error: None,
        },
        Err(e) => PdfiumStatus {
            available: false,
            library_path: None,
            error: Some(e),
        },
    }
}

/// 使用 pdfium 完整渲染页面
///
/// 只保存库路径配置；每次渲染在全局锁内重新绑定库并加载文档字节。
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    /// 检查库能否绑定
    pub fn check(&self) -> Result<()> {
        let _guard = PDFIUM_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        bind_pdfium(self.library_dir.as_ref())
            .map(|(_, path)| log::info!("[Render] 成功加载 pdfium: {}", path))
            .map_err(RenderError::Backend)
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(&self, pdf: &LoadedPdf, page_index: usize, scale: f32) -> Result<Raster> {
        check_scale(scale)?;
        // 先用 lopdf 校验页码，错误信息与其他后端一致
        pdf.page_id(page_index)?;

        let _guard = PDFIUM_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (pdfium, _) = bind_pdfium(self.library_dir.as_ref()).map_err(RenderError::Backend)?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf.source_bytes(), None)
            .map_err(|e| RenderError::Backend(format!("加载 PDF 失败: {}", e)))?;

        let page = document
            .pages()
            .get(page_index as u16)
            .map_err(|e| RenderError::Backend(format!("获取页面 {} 失败: {}", page_index, e)))?;

        let (target_width, target_height) =
            target_size(page.width().value, page.height().value, scale)?;

        log::debug!(
            "[Render] 页面 {}: {}x{} pt -> {}x{} px (scale {})",
            page_index,
            page.width().value,
            page.height().value,
            target_width,
            target_height,
            scale
        );

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width as i32)
            .set_target_height(target_height as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RenderError::Backend(format!("渲染页面失败: {}", e)))?;

        let image = bitmap.as_image().into_rgba8();
        Ok(Raster::new(image, scale, page_index))
    }

    fn name(&self) -> &'static str {
        "pdfium"
    }
}
