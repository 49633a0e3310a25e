//! 深色填充矩形检测
//!
//! 脱敏工具通常用 `re` + `f` 画实心黑框盖住文字。这里跟踪 CTM 和非描边颜色，
//! 找出所有足够大、颜色足够深的填充矩形，作为候选脱敏框。

use crate::utils::get_number;
use crate::{PdfError, Result};
use lopdf::content::{Content, Operation};
use serde::{Deserialize, Serialize};

/// 颜色分量（0-1）全部低于该值视为“黑框”
const DARK_THRESHOLD: f32 = 0.3;
/// 宽或高不超过该值（pt）的矩形忽略，避免把表格线当成黑框
const MIN_SIDE: f32 = 5.0;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// 填充矩形（PDF 用户空间，左下角为原点）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilledRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: [f32; 6],
    fill: [f32; 3],
}

impl Default for GraphicsState {
    fn default() -> Self {
        // PDF 默认填充色为黑色
        Self {
            ctm: IDENTITY,
            fill: [0.0, 0.0, 0.0],
        }
    }
}

fn concat(ctm: [f32; 6], m: [f32; 6]) -> [f32; 6] {
    let [a, b, c, d, e, f] = m;
    [
        ctm[0] * a + ctm[2] * b,
        ctm[1] * a + ctm[3] * b,
        ctm[0] * c + ctm[2] * d,
        ctm[1] * c + ctm[3] * d,
        ctm[0] * e + ctm[2] * f + ctm[4],
        ctm[1] * e + ctm[3] * f + ctm[5],
    ]
}

fn transform_rect(ctm: [f32; 6], x: f32, y: f32, w: f32, h: f32) -> FilledRect {
    let corners = [(x, y), (x + w, y), (x, y + h), (x + w, y + h)];
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;

    for (px, py) in corners {
        let tx = ctm[0] * px + ctm[2] * py + ctm[4];
        let ty = ctm[1] * px + ctm[3] * py + ctm[5];
        min_x = min_x.min(tx);
        min_y = min_y.min(ty);
        max_x = max_x.max(tx);
        max_y = max_y.max(ty);
    }

    FilledRect {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

fn numbers(op: &Operation) -> Vec<f32> {
    op.operands.iter().filter_map(get_number).collect()
}

/// 把 gray / RGB / CMYK 分量统一成 RGB
fn to_rgb(components: &[f32]) -> Option<[f32; 3]> {
    match components {
        [g] => Some([*g, *g, *g]),
        [r, g, b] => Some([*r, *g, *b]),
        [c, m, y, k] => Some([
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        ]),
        _ => None,
    }
}

fn is_dark(fill: [f32; 3]) -> bool {
    fill.iter().all(|c| *c < DARK_THRESHOLD)
}

/// 扫描内容流，返回深色填充矩形（按出现顺序）
pub fn detect_filled_rects(content_data: &[u8]) -> Result<Vec<FilledRect>> {
    let content = Content::decode(content_data).map_err(|e| PdfError::Content(e.to_string()))?;

    let mut stack: Vec<GraphicsState> = Vec::new();
    let mut state = GraphicsState::default();
    let mut path_rects: Vec<FilledRect> = Vec::new();
    let mut path_is_rects = true;
    let mut found = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => stack.push(state),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    state = saved;
                }
            }
            "cm" => {
                if let [a, b, c, d, e, f] = numbers(op)[..] {
                    state.ctm = concat(state.ctm, [a, b, c, d, e, f]);
                }
            }
            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(rgb) = to_rgb(&numbers(op)) {
                    state.fill = rgb;
                }
            }
            "re" => {
                if let [x, y, w, h] = numbers(op)[..] {
                    path_rects.push(transform_rect(state.ctm, x, y, w, h));
                }
            }
            "m" | "l" | "c" | "v" | "y" => path_is_rects = false,
            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                if path_is_rects && is_dark(state.fill) {
                    found.extend(
                        path_rects
                            .iter()
                            .filter(|r| r.width > MIN_SIDE && r.height > MIN_SIDE)
                            .copied(),
                    );
                }
                path_rects.clear();
                path_is_rects = true;
            }
            "n" | "S" | "s" => {
                path_rects.clear();
                path_is_rects = true;
            }
            _ => {}
        }
    }

    log::debug!("[Boxes] 检测到 {} 个深色填充矩形", found.len());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_black_fill_is_detected() {
        let rects = detect_filled_rects(b"100 200 80 12 re f").unwrap();
        assert_eq!(
            rects,
            vec![FilledRect {
                x: 100.0,
                y: 200.0,
                width: 80.0,
                height: 12.0
            }]
        );
    }

    #[test]
    fn test_light_fill_and_thin_rects_ignored() {
        let content = b"0.9 g 10 10 50 50 re f 0 g 10 10 50 2 re f 0 0 0 rg 10 100 40 20 re f";
        let rects = detect_filled_rects(content).unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].y, 100.0);
    }

    #[test]
    fn test_ctm_applied_and_restored() {
        let content = b"q 2 0 0 2 10 10 cm 0 0 20 10 re f Q 0 0 20 10 re f";
        let rects = detect_filled_rects(content).unwrap();
        assert_eq!(rects.len(), 2);
        assert_eq!((rects[0].x, rects[0].width, rects[0].height), (10.0, 40.0, 20.0));
        assert_eq!((rects[1].x, rects[1].width), (0.0, 20.0));
    }

    #[test]
    fn test_stroked_and_mixed_paths_ignored() {
        let content = b"10 10 50 50 re S 10 10 m 60 10 l 60 60 l 10 60 re f";
        assert!(detect_filled_rects(content).unwrap().is_empty());
    }

    #[test]
    fn test_cmyk_black() {
        let rects = detect_filled_rects(b"0 0 0 1 k 5 5 30 30 re f").unwrap();
        assert_eq!(rects.len(), 1);
    }
}
