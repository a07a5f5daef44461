use crate::backend::{FontWeight, PaintMode, Renderer, TextAlign, WatermarkMark};
use crate::error::EngineError;
use crate::font::FontMetrics;
use crate::types::{Color, Pt, Rect, Size};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetFont {
        weight: FontWeight,
        size: Pt,
    },
    Rect {
        rect: Rect,
        mode: PaintMode,
        radius: Pt,
    },
    Line {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
    },
    Text {
        x: Pt,
        y: Pt,
        text: String,
        align: TextAlign,
    },
    Watermark(WatermarkMark),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub size: Size,
    pub commands: Vec<Command>,
}

impl Page {
    fn new(size: Size) -> Self {
        Self {
            size,
            commands: Vec::new(),
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|text| text.contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

/// Default renderer: records every primitive as a `Command` on its page and serializes
/// the result to PDF when finished.
#[derive(Debug, Default)]
pub struct Recorder {
    document: Document,
    current: usize,
    metrics: FontMetrics,
    title: Option<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    fn push(&mut self, command: Command) {
        if let Some(page) = self.document.pages.get_mut(self.current) {
            page.commands.push(command);
        } else {
            log::warn!("dropping draw command issued before the first page was created");
        }
    }
}

impl Renderer for Recorder {
    fn add_page(&mut self, size: Size) {
        self.document.pages.push(Page::new(size));
        self.current = self.document.pages.len() - 1;
    }

    fn page_count(&self) -> usize {
        self.document.pages.len()
    }

    fn select_page(&mut self, page_number: usize) -> Result<(), EngineError> {
        let count = self.document.pages.len();
        if page_number == 0 || page_number > count {
            return Err(EngineError::PageOutOfRange {
                page: page_number,
                count,
            });
        }
        self.current = page_number - 1;
        Ok(())
    }

    fn set_fill_color(&mut self, color: Color) {
        self.push(Command::SetFillColor(color));
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.push(Command::SetStrokeColor(color));
    }

    fn set_line_width(&mut self, width: Pt) {
        self.push(Command::SetLineWidth(width.max(Pt::ZERO)));
    }

    fn set_font(&mut self, weight: FontWeight, size: Pt) {
        self.push(Command::SetFont { weight, size });
    }

    fn rect(&mut self, rect: Rect, mode: PaintMode, radius: Pt) {
        self.push(Command::Rect { rect, mode, radius });
    }

    fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.push(Command::Line { x1, y1, x2, y2 });
    }

    fn text(&mut self, x: Pt, y: Pt, text: &str, align: TextAlign) {
        self.push(Command::Text {
            x,
            y,
            text: text.to_string(),
            align,
        });
    }

    fn text_width(&self, text: &str, weight: FontWeight, size: Pt) -> Pt {
        self.metrics.measure(text, weight, size)
    }

    fn wrap_text(&self, text: &str, weight: FontWeight, size: Pt, max_width: Pt) -> Vec<String> {
        self.metrics.wrap(text, weight, size, max_width)
    }

    fn watermark(&mut self, mark: &WatermarkMark) {
        for page in &mut self.document.pages {
            page.commands.push(Command::Watermark(mark.clone()));
        }
    }

    fn finish(self) -> Result<Vec<u8>, EngineError> {
        crate::pdf::document_to_pdf(&self.document, self.title.as_deref(), &self.metrics)
    }
}
