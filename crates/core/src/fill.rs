//! 填充方式：纯色块或文字

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// RGB 颜色，文本形式为 `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn rgba(&self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 255])
    }
}

impl FromStr for Color {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || CoreError::InvalidColor(s.to_string());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// 一次编辑使用的填充方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillSpec {
    /// 不透明纯色块
    Solid { color: Color },
    /// 先用背景色铺满框，再从框左上角写入文字；`font_size` 单位为 pt
    Text {
        text: String,
        font_size: f32,
        color: Color,
        background: Color,
    },
}

impl FillSpec {
    pub fn solid(color: Color) -> Self {
        FillSpec::Solid { color }
    }

    /// 白底黑字
    pub fn text(text: impl Into<String>, font_size: f32) -> Self {
        FillSpec::Text {
            text: text.into(),
            font_size,
            color: Color::BLACK,
            background: Color::WHITE,
        }
    }

    pub fn needs_font(&self) -> bool {
        matches!(self, FillSpec::Text { .. })
    }
}
