//! 文字填充使用的字体

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;

use crate::{CoreError, Result};

/// 常见系统字体位置，按顺序尝试
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// 加载字体：优先使用配置的路径，否则在系统字体目录中查找
pub fn load_font(configured: Option<&Path>) -> Result<FontArc> {
    if let Some(path) = configured {
        return load_font_file(path);
    }

    match find_system_font() {
        Some(path) => load_font_file(&path),
        None => Err(CoreError::Font(
            "未找到可用的系统字体，请在配置中设置 fontPath".to_string(),
        )),
    }
}

pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONT_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

fn load_font_file(path: &Path) -> Result<FontArc> {
    let data = std::fs::read(path)
        .map_err(|e| CoreError::Font(format!("读取 {} 失败: {}", path.display(), e)))?;
    let font = FontArc::try_from_vec(data)
        .map_err(|e| CoreError::Font(format!("{} 不是有效字体: {}", path.display(), e)))?;
    log::debug!("[Overlay] 使用字体 {}", path.display());
    Ok(font)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_font_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a font").unwrap();
        assert!(matches!(load_font(Some(file.path())), Err(CoreError::Font(_))));
    }

    #[test]
    fn test_missing_font_file() {
        let result = load_font(Some(Path::new("/nonexistent/font.ttf")));
        assert!(matches!(result, Err(CoreError::Font(_))));
    }
}
