//! 脱敏框选择与按尺寸分组
//!
//! 所有坐标都在页面位图空间（左上角为原点，单位像素）。

use serde::{Deserialize, Serialize};
use unredact_pdf::{detect_filled_rects, LoadedPdf};
use unredact_render::Raster;

use crate::{CoreError, Result};

/// 用户拖出的原始矩形，可能为负或越界，由 `BoxSelector::select` 校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl RegionRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 已确认的脱敏框：宽高为正，且完整落在所在页面的位图内
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionBox {
    pub page_index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RedactionBox {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && py >= self.y && px - self.x < self.width && py - self.y < self.height
    }
}

/// 尺寸完全相同的一组脱敏框（“应用到所有同尺寸框”）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxGroup {
    pub width: u32,
    pub height: u32,
    pub members: Vec<RedactionBox>,
}

/// 某一页位图上的选框模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxSelector {
    width: u32,
    height: u32,
}

impl BoxSelector {
    /// `width` x `height` 为页面位图尺寸
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn for_raster(raster: &Raster) -> Self {
        Self::new(raster.width(), raster.height())
    }

    /// 校验选区并生成脱敏框
    pub fn select(&self, page_index: usize, rect: RegionRect) -> Result<RedactionBox> {
        if rect.width <= 0 || rect.height <= 0 {
            return Err(CoreError::InvalidRegion(format!(
                "宽高必须为正: {}x{}",
                rect.width, rect.height
            )));
        }

        let out_of_bounds = || {
            CoreError::InvalidRegion(format!(
                "选区 ({}, {}, {}x{}) 超出页面位图 {}x{}",
                rect.x, rect.y, rect.width, rect.height, self.width, self.height
            ))
        };
        let right = rect.x.checked_add(rect.width).ok_or_else(out_of_bounds)?;
        let bottom = rect.y.checked_add(rect.height).ok_or_else(out_of_bounds)?;
        if rect.x < 0 || rect.y < 0 || right > self.width as i64 || bottom > self.height as i64 {
            return Err(out_of_bounds());
        }

        // 以上检查保证四个值都落在 0..=u32::MAX
        let to_u32 = |v: i64| u32::try_from(v).map_err(|_| out_of_bounds());
        Ok(RedactionBox {
            page_index,
            x: to_u32(rect.x)?,
            y: to_u32(rect.y)?,
            width: to_u32(rect.width)?,
            height: to_u32(rect.height)?,
        })
    }

    /// 按 (宽, 高) 精确分组，组的顺序与组内顺序都按首次出现顺序
    pub fn group_by_dimensions(boxes: &[RedactionBox]) -> Vec<BoxGroup> {
        let mut groups: Vec<BoxGroup> = Vec::new();
        for b in boxes {
            match groups
                .iter_mut()
                .find(|g| (g.width, g.height) == b.dimensions())
            {
                Some(group) => group.members.push(*b),
                None => groups.push(BoxGroup {
                    width: b.width,
                    height: b.height,
                    members: vec![*b],
                }),
            }
        }
        groups
    }

    /// 页面上检测到的深色填充矩形，换算到缩放比例 `scale` 的位图空间
    ///
    /// 位置和尺寸分别取整，保证同尺寸的矩形换算后尺寸仍然相同；
    /// 超出位图的部分被裁掉，完全在外的矩形丢弃。
    pub fn candidates(pdf: &LoadedPdf, page_index: usize, scale: f32) -> Result<Vec<RedactionBox>> {
        let content = pdf.page_content(page_index)?;
        let media_box = pdf.media_box(page_index)?;
        let raster_w = (media_box.width() * scale).round().max(1.0) as i64;
        let raster_h = (media_box.height() * scale).round().max(1.0) as i64;

        let mut boxes = Vec::new();
        for rect in detect_filled_rects(&content)? {
            let x = ((rect.x - media_box.llx) * scale).round() as i64;
            let y = ((media_box.ury - (rect.y + rect.height)) * scale).round() as i64;
            let w = (rect.width * scale).round() as i64;
            let h = (rect.height * scale).round() as i64;

            let x0 = x.max(0);
            let y0 = y.max(0);
            let x1 = (x + w).min(raster_w);
            let y1 = (y + h).min(raster_h);
            if x1 <= x0 || y1 <= y0 {
                continue;
            }

            boxes.push(RedactionBox {
                page_index,
                x: x0 as u32,
                y: y0 as u32,
                width: (x1 - x0) as u32,
                height: (y1 - y0) as u32,
            });
        }

        log::debug!(
            "[Select] 第 {} 页候选框 {} 个",
            page_index + 1,
            boxes.len()
        );
        Ok(boxes)
    }

    /// 点击位置命中的候选框；重叠时取后绘制（位于上层）的那个
    pub fn hit_test(candidates: &[RedactionBox], px: u32, py: u32) -> Option<RedactionBox> {
        candidates.iter().rev().find(|b| b.contains(px, py)).copied()
    }

    /// 所有页面中与选中框尺寸完全相同的框（包括选中框本身）
    pub fn matching(all: &[RedactionBox], selected: &RedactionBox) -> BoxGroup {
        let mut members: Vec<RedactionBox> = all
            .iter()
            .filter(|b| b.dimensions() == selected.dimensions())
            .copied()
            .collect();
        if !members.contains(selected) {
            members.insert(0, *selected);
        }
        BoxGroup {
            width: selected.width,
            height: selected.height,
            members,
        }
    }
}
