use crate::backend::{FontWeight, PaintMode, Renderer, TextAlign};
use crate::config::CanvasBuilder;
use crate::debug::DebugLogger;
use crate::error::EngineError;
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::recorder::Recorder;
use crate::theme::{PageGeometry, Theme};
use crate::types::{Color, Pt, Rect};
use std::fmt;
use std::time::Instant;

/// Lifecycle of one document. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Composing,
    Finalizing,
    Output,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Composing => "composing",
            Phase::Finalizing => "finalizing",
            Phase::Output => "output",
        };
        f.write_str(name)
    }
}

/// Passed to the continuation header each time a new page is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageContext {
    pub page_number: usize,
    /// Top edge the chrome should be drawn from.
    pub top: Pt,
    pub height: Pt,
}

/// Continuation chrome callback. Invoked by the pagination controller only.
pub type OnPage<'a, R> = dyn Fn(&mut Canvas<R>, &PageContext) + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionStyle {
    pub fill: Option<Color>,
    pub border: Option<(Color, Pt)>,
    pub radius: Pt,
}

impl RegionStyle {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn bordered(fill: Option<Color>, border: Color, width: Pt) -> Self {
        Self {
            fill,
            border: Some((border, width)),
            radius: Pt::ZERO,
        }
    }

    pub fn rounded(mut self, radius: Pt) -> Self {
        self.radius = radius;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub rect: Rect,
    pub style: RegionStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSpec {
    pub size: Pt,
    pub weight: FontWeight,
    pub color: Color,
    pub align: TextAlign,
}

impl TextSpec {
    pub fn new(size: Pt, color: Color) -> Self {
        Self {
            size,
            weight: FontWeight::Regular,
            color,
            align: TextAlign::Left,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    pub fn italic(mut self) -> Self {
        self.weight = FontWeight::Italic;
        self
    }

    pub fn weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }
}

/// One document session: page geometry, the write cursor, the current page and the
/// renderer that receives every mark.
pub struct Canvas<R: Renderer = Recorder> {
    pub(crate) renderer: R,
    geometry: PageGeometry,
    theme: Theme,
    pub(crate) cursor_y: Pt,
    pub(crate) page_number: usize,
    pub(crate) phase: Phase,
    pub(crate) total_pages: Option<usize>,
    pub(crate) metrics: DocumentMetrics,
    pub(crate) debug: Option<DebugLogger>,
    pub(crate) page_blocks: usize,
    pub(crate) page_start: Instant,
}

impl Canvas<Recorder> {
    pub fn builder() -> CanvasBuilder<Recorder> {
        CanvasBuilder::new()
    }
}

impl<R: Renderer> Canvas<R> {
    pub(crate) fn from_parts(
        mut renderer: R,
        geometry: PageGeometry,
        theme: Theme,
        debug: Option<DebugLogger>,
    ) -> Self {
        renderer.add_page(geometry.page_size);
        Self {
            renderer,
            cursor_y: geometry.margins.top,
            geometry,
            theme,
            page_number: 1,
            phase: Phase::Composing,
            total_pages: None,
            metrics: DocumentMetrics::default(),
            debug,
            page_blocks: 0,
            page_start: Instant::now(),
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor_y(&self) -> Pt {
        self.cursor_y
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Final page count; `None` until footers have been finalized.
    pub fn total_pages(&self) -> Option<usize> {
        self.total_pages
    }

    pub fn metrics(&self) -> &DocumentMetrics {
        &self.metrics
    }

    pub fn content_left(&self) -> Pt {
        self.geometry.content_left()
    }

    pub fn content_width(&self) -> Pt {
        self.geometry.content_width()
    }

    pub(crate) fn ensure_phase(&self, expected: Phase, operation: &'static str) -> Result<(), EngineError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::PhaseViolation {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Moves the cursor down by `height`.
    pub fn advance(&mut self, height: Pt) -> Result<(), EngineError> {
        self.ensure_phase(Phase::Composing, "advance")?;
        self.cursor_y += height.max(Pt::ZERO);
        Ok(())
    }

    /// Moves the cursor to `y` unless that would move it upwards.
    pub(crate) fn advance_to(&mut self, y: Pt) {
        self.cursor_y = self.cursor_y.max(y);
    }

    pub fn draw_region(&mut self, region: &Region) {
        let style = region.style;
        let mode = match (style.fill, style.border) {
            (Some(_), Some(_)) => PaintMode::FillStroke,
            (Some(_), None) => PaintMode::Fill,
            (None, Some(_)) => PaintMode::Stroke,
            (None, None) => return,
        };
        if let Some(fill) = style.fill {
            self.renderer.set_fill_color(fill);
        }
        if let Some((color, width)) = style.border {
            self.renderer.set_stroke_color(color);
            self.renderer.set_line_width(width);
        }
        self.renderer.rect(region.rect, mode, style.radius);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.draw_region(&Region {
            rect,
            style: RegionStyle::filled(color),
        });
    }

    pub fn hline(&mut self, x1: Pt, x2: Pt, y: Pt, color: Color, width: Pt) {
        self.renderer.set_stroke_color(color);
        self.renderer.set_line_width(width);
        self.renderer.line(x1, y, x2, y);
    }

    pub fn vline(&mut self, x: Pt, y1: Pt, y2: Pt, color: Color, width: Pt) {
        self.renderer.set_stroke_color(color);
        self.renderer.set_line_width(width);
        self.renderer.line(x, y1, x, y2);
    }

    /// Draws one line of text with its baseline at `y`.
    pub fn text(&mut self, x: Pt, y: Pt, text: &str, spec: &TextSpec) {
        self.renderer.set_fill_color(spec.color);
        self.renderer.set_font(spec.weight, spec.size);
        self.renderer.text(x, y, text, spec.align);
    }

    pub fn text_width(&self, text: &str, weight: FontWeight, size: Pt) -> Pt {
        self.renderer.text_width(text, weight, size)
    }

    pub fn wrap_text(&self, text: &str, weight: FontWeight, size: Pt, max_width: Pt) -> Vec<String> {
        self.renderer.wrap_text(text, weight, size, max_width)
    }

    /// Baseline for text of `size` whose line box starts at `top` and is `box_height` tall.
    pub fn baseline_in(&self, top: Pt, box_height: Pt, size: Pt) -> Pt {
        top + box_height.half() + size * 0.35
    }

    pub(crate) fn close_page_metrics(&mut self) {
        let elapsed = self.page_start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.compose_ms += elapsed;
        self.metrics.pages.push(PageMetrics {
            page_number: self.page_number,
            blocks: self.page_blocks,
            compose_ms: elapsed,
        });
        self.page_blocks = 0;
        self.page_start = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Command;

    #[test]
    fn new_canvas_starts_on_page_one_at_the_top_margin() {
        let canvas = Canvas::builder().build().expect("default config");
        assert_eq!(canvas.page_number(), 1);
        assert_eq!(canvas.cursor_y(), canvas.geometry().margins.top);
        assert_eq!(canvas.phase(), Phase::Composing);
        assert_eq!(canvas.total_pages(), None);
        assert_eq!(canvas.renderer().page_count(), 1);
    }

    #[test]
    fn every_primitive_sets_its_own_state_first() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let spec = TextSpec::new(Pt::from_f32(9.0), Color::BLACK).bold();
        canvas.text(Pt::ZERO, Pt::from_f32(20.0), "one", &spec);
        canvas.text(Pt::ZERO, Pt::from_f32(30.0), "two", &spec);

        let commands = &canvas.renderer().document().pages[0].commands;
        let texts: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter(|(_, cmd)| matches!(cmd, Command::Text { .. }))
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(texts.len(), 2);
        for idx in texts {
            assert!(matches!(commands[idx - 1], Command::SetFont { weight: FontWeight::Bold, .. }));
            assert!(matches!(commands[idx - 2], Command::SetFillColor(_)));
        }
    }

    #[test]
    fn region_without_fill_or_border_draws_nothing() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let rect = Rect::new(Pt::ZERO, Pt::ZERO, Pt::from_f32(10.0), Pt::from_f32(10.0));
        canvas.draw_region(&Region {
            rect,
            style: RegionStyle::default(),
        });
        assert!(canvas.renderer().document().pages[0].commands.is_empty());

        canvas.draw_region(&Region {
            rect,
            style: RegionStyle::bordered(Some(Color::WHITE), Color::BLACK, Pt::from_f32(0.5))
                .rounded(Pt::from_f32(2.0)),
        });
        assert!(canvas.renderer().document().pages[0].commands.iter().any(|cmd| matches!(
            cmd,
            Command::Rect {
                mode: PaintMode::FillStroke,
                ..
            }
        )));
    }

    #[test]
    fn advance_never_moves_the_cursor_up() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let start = canvas.cursor_y();
        canvas.advance(-Pt::from_f32(5.0)).expect("composing");
        assert_eq!(canvas.cursor_y(), start);
        canvas.advance_to(start - Pt::from_f32(1.0));
        assert_eq!(canvas.cursor_y(), start);
    }
}
