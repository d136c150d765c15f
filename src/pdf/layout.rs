use std::collections::HashMap;

use pdf_writer::{Content, Name, Str};

use crate::fonts::{FontEntry, FontRole, FontSet};

pub(super) const PAGE_WIDTH: f32 = 595.28;
pub(super) const PAGE_HEIGHT: f32 = 841.89;
pub(super) const MARGIN: f32 = 50.0;
pub(super) const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum Align {
    Left,
    Center,
    Right,
}

/// One drawing operation in top-left page coordinates.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum Op {
    /// `top` is the top of the line box; the baseline sits one ascent below.
    Text {
        role: FontRole,
        size: f32,
        x: f32,
        top: f32,
        text: String,
    },
    Rect {
        x: f32,
        top: f32,
        width: f32,
        height: f32,
    },
    Line {
        x1: f32,
        x2: f32,
        y: f32,
    },
}

/// Vertical cursor over a growing list of pages. `y` is the distance of the
/// cursor from the top edge of the current page.
pub(super) struct FormLayout<'a> {
    fonts: &'a FontSet,
    pages: Vec<Vec<Op>>,
    pub(super) y: f32,
}

impl<'a> FormLayout<'a> {
    pub(super) fn new(fonts: &'a FontSet) -> Self {
        Self {
            fonts,
            pages: vec![Vec::new()],
            y: MARGIN,
        }
    }

    pub(super) fn fonts(&self) -> &FontSet {
        self.fonts
    }

    pub(super) fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(super) fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = MARGIN;
    }

    /// Start a new page unless `height` more points fit above the bottom
    /// margin. A fresh page is never abandoned, so oversized blocks overflow
    /// rather than loop.
    pub(super) fn reserve(&mut self, height: f32) {
        let room = PAGE_HEIGHT - MARGIN - self.y;
        if height > room && self.y > MARGIN {
            log::debug!("Page break before block of {height:.0}pt ({room:.0}pt left)");
            self.new_page();
        }
    }

    pub(super) fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    fn push(&mut self, op: Op) {
        if let Some(page) = self.pages.last_mut() {
            page.push(op);
        }
    }

    /// Text at an absolute position on the cursor's page.
    pub(super) fn text_at(&mut self, role: FontRole, size: f32, x: f32, top: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        self.push(Op::Text {
            role,
            size,
            x,
            top,
            text: text.to_string(),
        });
    }

    /// One line at the cursor, aligned within the content width.
    pub(super) fn line(&mut self, role: FontRole, size: f32, align: Align, text: &str) {
        let width = self.fonts.text_width(role, text, size);
        let x = match align {
            Align::Left => MARGIN,
            Align::Center => MARGIN + (CONTENT_WIDTH - width).max(0.0) / 2.0,
            Align::Right => MARGIN + (CONTENT_WIDTH - width).max(0.0),
        };
        self.text_at(role, size, x, self.y, text);
    }

    /// Greedy word wrap at `x` within `width`, starting at `top`. Returns the
    /// number of lines used.
    pub(super) fn wrapped_at(
        &mut self,
        role: FontRole,
        size: f32,
        x: f32,
        top: f32,
        width: f32,
        line_height: f32,
        text: &str,
    ) -> usize {
        let lines = self.wrap(role, size, width, text);
        for (i, line) in lines.iter().enumerate() {
            self.text_at(role, size, x, top + i as f32 * line_height, line);
        }
        lines.len()
    }

    pub(super) fn wrap(&self, role: FontRole, size: f32, width: f32, text: &str) -> Vec<String> {
        let space = self.fonts.text_width(role, " ", size);
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0f32;
        for word in text.split_whitespace() {
            let word_width = self.fonts.text_width(role, word, size);
            if !current.is_empty() && current_width + space + word_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_width += space;
            }
            current.push_str(word);
            current_width += word_width;
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    pub(super) fn rect(&mut self, x: f32, top: f32, width: f32, height: f32) {
        self.push(Op::Rect {
            x,
            top,
            width,
            height,
        });
    }

    pub(super) fn hline(&mut self, x1: f32, x2: f32, y: f32) {
        self.push(Op::Line { x1, x2, y });
    }

    pub(super) fn into_pages(self) -> Vec<Vec<Op>> {
        self.pages
    }
}

/// Encode one page's operations. Font switches are only emitted on change.
pub(super) fn render_ops(
    content: &mut Content,
    ops: &[Op],
    fonts: &FontSet,
    entries: &HashMap<FontRole, FontEntry>,
) {
    content.set_line_width(0.5);
    content.set_fill_gray(0.0);
    content.set_stroke_gray(0.0);
    let mut current: Option<(FontRole, f32)> = None;
    let mut in_text = false;

    for op in ops {
        match op {
            Op::Text {
                role,
                size,
                x,
                top,
                text,
            } => {
                let Some(entry) = entries.get(role) else {
                    continue;
                };
                if !in_text {
                    content.begin_text();
                    in_text = true;
                    current = None;
                }
                if current != Some((*role, *size)) {
                    content.set_font(Name(entry.pdf_name.as_bytes()), *size);
                    current = Some((*role, *size));
                }
                let baseline = PAGE_HEIGHT - top - fonts.ascent(*role, *size);
                content.set_text_matrix([1.0, 0.0, 0.0, 1.0, *x, baseline]);
                content.show(Str(&entry.encode(text)));
            }
            Op::Rect {
                x,
                top,
                width,
                height,
            } => {
                if in_text {
                    content.end_text();
                    in_text = false;
                }
                content.rect(*x, PAGE_HEIGHT - top - height, *width, *height);
                content.stroke();
            }
            Op::Line { x1, x2, y } => {
                if in_text {
                    content.end_text();
                    in_text = false;
                }
                content.move_to(*x1, PAGE_HEIGHT - y);
                content.line_to(*x2, PAGE_HEIGHT - y);
                content.stroke();
            }
        }
    }
    if in_text {
        content.end_text();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_breaks_only_when_the_block_does_not_fit() {
        let fonts = FontSet::standard();
        let mut layout = FormLayout::new(&fonts);
        layout.reserve(PAGE_HEIGHT);
        assert_eq!(layout.page_count(), 1, "fresh page is never abandoned");

        layout.advance(600.0);
        layout.reserve(100.0);
        assert_eq!(layout.page_count(), 1);
        layout.reserve(200.0);
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.y, MARGIN);
    }

    #[test]
    fn wrap_respects_width() {
        let fonts = FontSet::standard();
        let layout = FormLayout::new(&fonts);
        let text = "I declare that all the particulars furnished by me are true and correct.";
        let lines = layout.wrap(FontRole::Regular, 8.0, 120.0, text);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(fonts.text_width(FontRole::Regular, line, 8.0) <= 120.0 || !line.contains(' '));
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn centered_line_is_inside_margins() {
        let fonts = FontSet::standard();
        let mut layout = FormLayout::new(&fonts);
        layout.line(FontRole::Bold, 12.0, Align::Center, "REPUBLIC OF NAMIBIA");
        let pages = layout.into_pages();
        let Op::Text { x, .. } = &pages[0][0] else {
            panic!("expected text op");
        };
        assert!(*x > MARGIN && *x < PAGE_WIDTH / 2.0);
    }
}
