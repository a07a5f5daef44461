use crate::backend::Renderer;
use crate::canvas::Canvas;
use crate::debug::DebugLogger;
use crate::error::EngineError;
use crate::recorder::Recorder;
use crate::theme::{Palette, PageGeometry, Spacing, StatusColors, Theme, Typography, normalize_status};
use crate::types::{Margins, Pt, Size};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Partial theme read from JSON. Sections that are present replace the current ones;
/// status entries are merged by normalized name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeOverrides {
    pub palette: Option<Palette>,
    pub typography: Option<Typography>,
    pub spacing: Option<Spacing>,
    pub statuses: BTreeMap<String, StatusColors>,
    pub neutral_status: Option<StatusColors>,
    pub placeholder: Option<String>,
}

impl ThemeOverrides {
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn apply(self, theme: &mut Theme) {
        if let Some(palette) = self.palette {
            theme.palette = palette;
        }
        if let Some(typography) = self.typography {
            theme.typography = typography;
        }
        if let Some(spacing) = self.spacing {
            theme.spacing = spacing;
        }
        for (name, colors) in self.statuses {
            theme.statuses.insert(normalize_status(&name), colors);
        }
        if let Some(neutral) = self.neutral_status {
            theme.neutral_status = neutral;
        }
        if let Some(placeholder) = self.placeholder {
            theme.placeholder = placeholder;
        }
    }
}

pub struct CanvasBuilder<R: Renderer = Recorder> {
    renderer: R,
    geometry: PageGeometry,
    theme: Theme,
    debug_path: Option<PathBuf>,
    debug_logger: Option<DebugLogger>,
}

impl CanvasBuilder<Recorder> {
    pub fn new() -> Self {
        Self {
            renderer: Recorder::new(),
            geometry: PageGeometry::default(),
            theme: Theme::default(),
            debug_path: None,
            debug_logger: None,
        }
    }

    /// Document title written to the PDF metadata.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.renderer = self.renderer.with_title(title);
        self
    }
}

impl Default for CanvasBuilder<Recorder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Renderer> CanvasBuilder<R> {
    /// Swaps the drawing backend.
    pub fn renderer<T: Renderer>(self, renderer: T) -> CanvasBuilder<T> {
        CanvasBuilder {
            renderer,
            geometry: self.geometry,
            theme: self.theme,
            debug_path: self.debug_path,
            debug_logger: self.debug_logger,
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.geometry.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.geometry.margins = margins;
        self
    }

    pub fn footer_reserve(mut self, reserve: Pt) -> Self {
        self.geometry.footer_reserve = reserve;
        self
    }

    pub fn continuation_header_height(mut self, height: Pt) -> Self {
        self.geometry.continuation_header_height = height;
        self
    }

    pub fn block_gap(mut self, gap: Pt) -> Self {
        self.geometry.block_gap = gap;
        self
    }

    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn theme_json(mut self, raw: &str) -> Result<Self, EngineError> {
        ThemeOverrides::from_json(raw)?.apply(&mut self.theme);
        Ok(self)
    }

    /// Writes a JSONL trace of layout decisions to `path`.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn debug_logger(mut self, logger: DebugLogger) -> Self {
        self.debug_logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<Canvas<R>, EngineError> {
        validate_geometry(&self.geometry)?;
        let debug = match (self.debug_logger, self.debug_path) {
            (Some(logger), _) => Some(logger),
            (None, Some(path)) => Some(DebugLogger::new(path)?),
            (None, None) => None,
        };
        log::debug!(
            "canvas {}x{} break limit {}",
            self.geometry.page_size.width,
            self.geometry.page_size.height,
            self.geometry.break_limit()
        );
        Ok(Canvas::from_parts(self.renderer, self.geometry, self.theme, debug))
    }
}

fn validate_geometry(geometry: &PageGeometry) -> Result<(), EngineError> {
    let margins = geometry.margins;
    let lengths = [
        ("margin top", margins.top),
        ("margin right", margins.right),
        ("margin bottom", margins.bottom),
        ("margin left", margins.left),
        ("footer reserve", geometry.footer_reserve),
        ("continuation header height", geometry.continuation_header_height),
        ("block gap", geometry.block_gap),
    ];
    if let Some((name, value)) = lengths.iter().find(|(_, value)| *value < Pt::ZERO) {
        return Err(EngineError::InvalidConfiguration(format!("{name} is negative ({value})")));
    }
    if geometry.content_width() <= Pt::ZERO {
        return Err(EngineError::InvalidConfiguration(
            "left and right margins leave no content width".to_string(),
        ));
    }
    if geometry.break_limit() <= margins.top {
        return Err(EngineError::InvalidConfiguration(
            "margins and footer reserve leave no usable height".to_string(),
        ));
    }
    if geometry.usable_height(true) <= Pt::ZERO {
        return Err(EngineError::InvalidConfiguration(
            "continuation header leaves no usable height".to_string(),
        ));
    }
    Ok(())
}
