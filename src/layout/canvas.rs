//! The drawing surface the renderer writes into.
//!
//! A canvas is a list of pages, each a flat list of draw operations in PDF
//! coordinates (origin bottom-left). The vertical cursor only ever moves
//! down; there is no bounds check against the bottom margin, so a form with
//! more lines than fit will draw below the printable area.

use crate::config::GeneratorConfig;
use crate::font::{StandardFont, TypeTier, Typography};

/// A single page of positioned draw operations.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<DrawOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// One line of text with its baseline at `y`.
    Text(TextRun),
    /// A stroked horizontal rule.
    Rule { x1: f64, x2: f64, y: f64, width: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f64,
    pub y: f64,
    pub font: StandardFont,
    pub size: f64,
    pub text: String,
}

/// Mutable drawing state: the finished pages plus the vertical cursor.
#[derive(Debug, Clone)]
pub struct Canvas {
    pages: Vec<LayoutPage>,
    width: f64,
    height: f64,
    left_margin: f64,
    header_baseline: f64,
    body_baseline: f64,
    line_step: f64,
    typography: Typography,
    cursor_y: f64,
}

impl Canvas {
    pub fn new(config: &GeneratorConfig) -> Self {
        let (width, height) = config.page_size.dimensions();
        Self {
            pages: Vec::new(),
            width,
            height,
            left_margin: config.left_margin,
            header_baseline: config.header_baseline,
            body_baseline: config.body_baseline,
            line_step: config.line_step,
            typography: config.typography(),
            cursor_y: config.body_baseline,
        }
    }

    /// Start a new page with the given header text. The cursor is reset to
    /// the first body baseline.
    pub fn begin_page(&mut self, header: &str) {
        let face = self.typography.face(TypeTier::Header);
        let mut page = LayoutPage {
            width: self.width,
            height: self.height,
            elements: Vec::new(),
        };
        page.elements.push(DrawOp::Text(TextRun {
            x: self.left_margin,
            y: self.header_baseline,
            font: face.font,
            size: face.size,
            text: header.to_string(),
        }));
        let rule_y = self.header_baseline - face.size * 0.5;
        page.elements.push(DrawOp::Rule {
            x1: self.left_margin,
            x2: self.width - self.left_margin,
            y: rule_y,
            width: 0.75,
        });
        self.pages.push(page);
        self.cursor_y = self.body_baseline;
    }

    /// Draw one body line at the cursor and move the cursor down one step.
    ///
    /// Starts an untitled page first if nothing has been drawn yet.
    pub fn draw_line(&mut self, text: &str) {
        if self.pages.is_empty() {
            self.pages.push(LayoutPage {
                width: self.width,
                height: self.height,
                elements: Vec::new(),
            });
            self.cursor_y = self.body_baseline;
        }
        let face = self.typography.face(TypeTier::Body);
        let run = TextRun {
            x: self.left_margin,
            y: self.cursor_y,
            font: face.font,
            size: face.size,
            text: text.to_string(),
        };
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(DrawOp::Text(run));
        }
        self.cursor_y -= self.line_step;
    }

    pub fn cursor_y(&self) -> f64 {
        self.cursor_y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[LayoutPage] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<LayoutPage> {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_moves_down_by_step() {
        let config = GeneratorConfig::default();
        let mut canvas = Canvas::new(&config);
        canvas.begin_page("Header");
        assert_eq!(canvas.cursor_y(), 700.0);
        canvas.draw_line("a");
        canvas.draw_line("b");
        assert_eq!(canvas.cursor_y(), 660.0);
    }

    #[test]
    fn begin_page_resets_cursor() {
        let config = GeneratorConfig::default();
        let mut canvas = Canvas::new(&config);
        canvas.begin_page("One");
        canvas.draw_line("a");
        canvas.begin_page("Two");
        assert_eq!(canvas.cursor_y(), 700.0);
        assert_eq!(canvas.page_count(), 2);
    }

    #[test]
    fn header_uses_header_face() {
        let config = GeneratorConfig::default();
        let mut canvas = Canvas::new(&config);
        canvas.begin_page("Tax Form 1040");
        canvas.draw_line("Wages: $1.00");
        let page = &canvas.pages()[0];
        let runs: Vec<&TextRun> = page
            .elements
            .iter()
            .filter_map(|e| match e {
                DrawOp::Text(run) => Some(run),
                _ => None,
            })
            .collect();
        assert_eq!(runs[0].font, StandardFont::HelveticaBold);
        assert_eq!(runs[0].size, 16.0);
        assert_eq!(runs[0].y, 750.0);
        assert_eq!(runs[1].font, StandardFont::Helvetica);
        assert_eq!(runs[1].size, 12.0);
    }

    #[test]
    fn overflow_is_not_corrected() {
        let config = GeneratorConfig::default();
        let mut canvas = Canvas::new(&config);
        canvas.begin_page("Long");
        for _ in 0..40 {
            canvas.draw_line("line");
        }
        assert_eq!(canvas.page_count(), 1);
        assert!(canvas.cursor_y() < 0.0);
    }
}
