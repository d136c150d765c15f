use crate::fonts::FontRole;

use super::layout::FormLayout;

/// Row of equal bordered boxes holding one block capital each, as used for
/// numbers and names on the printed form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Grid {
    pub(super) cell_width: f32,
    pub(super) cell_height: f32,
    pub(super) spacing: f32,
    pub(super) font_size: f32,
}

/// Identification numbers, names, addresses.
pub(super) const STANDARD: Grid = Grid {
    cell_width: 12.0,
    cell_height: 15.0,
    spacing: 2.0,
    font_size: 8.0,
};

/// Plate choices and date parts.
pub(super) const SMALL: Grid = Grid {
    cell_width: 10.0,
    cell_height: 12.0,
    spacing: 1.0,
    font_size: 7.0,
};

impl Grid {
    pub(super) fn pitch(&self) -> f32 {
        self.cell_width + self.spacing
    }

    /// Horizontal extent of `count` boxes.
    pub(super) fn width(&self, count: usize) -> f32 {
        if count == 0 {
            return 0.0;
        }
        count as f32 * self.pitch() - self.spacing
    }
}

/// Upper-cased glyphs of `text`, one per box, truncated to `count`.
pub(super) fn cell_glyphs(text: &str, count: usize) -> Vec<String> {
    text.trim()
        .to_uppercase()
        .chars()
        .take(count)
        .map(String::from)
        .collect()
}

impl FormLayout<'_> {
    /// Draw `count` boxes at (`x`, `top`) and fill them from `text`.
    pub(super) fn grid(&mut self, grid: Grid, x: f32, top: f32, count: usize, text: Option<&str>) {
        for i in 0..count {
            self.rect(
                x + i as f32 * grid.pitch(),
                top,
                grid.cell_width,
                grid.cell_height,
            );
        }
        let Some(text) = text else {
            return;
        };
        let glyphs = cell_glyphs(text, count);
        if text.trim().chars().count() > count {
            log::warn!(
                "{:?} truncated to {count} boxes",
                text.trim()
            );
        }
        let glyph_top = top + (grid.cell_height - grid.font_size) / 2.0;
        for (i, glyph) in glyphs.iter().enumerate() {
            if glyph == " " {
                continue;
            }
            let glyph_width = self
                .fonts()
                .text_width(FontRole::Regular, glyph, grid.font_size);
            let cell_x = x + i as f32 * grid.pitch();
            let glyph_x = cell_x + (grid.cell_width - glyph_width).max(0.0) / 2.0;
            self.text_at(FontRole::Regular, grid.font_size, glyph_x, glyph_top, glyph);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontSet;
    use crate::pdf::layout::Op;

    #[test]
    fn glyphs_are_uppercased_and_truncated() {
        assert_eq!(cell_glyphs("abc123", 4), ["A", "B", "C", "1"]);
        assert!(cell_glyphs("  ", 5).is_empty());
    }

    #[test]
    fn grid_draws_every_box_and_one_glyph_per_filled_box() {
        let fonts = FontSet::standard();
        let mut layout = FormLayout::new(&fonts);
        layout.grid(STANDARD, 50.0, 100.0, 7, Some("n 12"));
        let ops = layout.into_pages().remove(0);
        let boxes = ops.iter().filter(|op| matches!(op, Op::Rect { .. })).count();
        let glyphs: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                Op::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(boxes, 7);
        assert_eq!(glyphs, ["N", "1", "2"]);
    }

    #[test]
    fn width_excludes_trailing_spacing() {
        assert_eq!(STANDARD.width(20), 20.0 * 14.0 - 2.0);
        assert_eq!(SMALL.width(0), 0.0);
    }
}
