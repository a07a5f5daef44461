//! The contract between the composition engine and whatever actually makes marks.
//!
//! The engine never assumes drawing state survives between calls: every primitive is
//! issued by `Canvas` as a fresh setter-then-draw sequence.

use crate::error::EngineError;
use crate::types::{Color, Pt, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    Fill,
    Stroke,
    FillStroke,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkMark {
    pub text: String,
    pub size: Pt,
    pub color: Color,
    pub opacity: f32,
    pub angle_deg: f32,
}

/// Drawing backend driven by the engine.
///
/// Coordinates are in points with the origin at the top-left corner of the page and y
/// growing downwards. Text `y` is the baseline.
pub trait Renderer {
    fn add_page(&mut self, size: Size);

    fn page_count(&self) -> usize;

    /// Makes a previously created page (1-based) the target of subsequent drawing.
    fn select_page(&mut self, page_number: usize) -> Result<(), EngineError>;

    fn set_fill_color(&mut self, color: Color);

    fn set_stroke_color(&mut self, color: Color);

    fn set_line_width(&mut self, width: Pt);

    fn set_font(&mut self, weight: FontWeight, size: Pt);

    fn rect(&mut self, rect: Rect, mode: PaintMode, radius: Pt);

    fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt);

    fn text(&mut self, x: Pt, y: Pt, text: &str, align: TextAlign);

    fn text_width(&self, text: &str, weight: FontWeight, size: Pt) -> Pt;

    fn wrap_text(&self, text: &str, weight: FontWeight, size: Pt, max_width: Pt) -> Vec<String>;

    /// Overlays a rotated, translucent text mark centred on every page.
    fn watermark(&mut self, mark: &WatermarkMark);

    fn finish(self) -> Result<Vec<u8>, EngineError>;
}
