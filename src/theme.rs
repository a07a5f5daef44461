//! Page geometry and the visual theme shared by every composer.
//!
//! Everything here is plain data. A `Theme` is fixed for the lifetime of one document.

use crate::types::{Color, Margins, Pt, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_size: Size,
    pub margins: Margins,
    /// Space kept free above the bottom margin for the footer stamped at finalization.
    pub footer_reserve: Pt,
    /// Height of the compact header redrawn on every page after the first.
    pub continuation_header_height: Pt,
    pub block_gap: Pt,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_size: Size::a4(),
            margins: Margins::all_mm(12.0),
            footer_reserve: Pt::from_mm(18.0),
            continuation_header_height: Pt::from_mm(14.0),
            block_gap: Pt::from_mm(4.0),
        }
    }
}

impl PageGeometry {
    pub fn content_left(&self) -> Pt {
        self.margins.left
    }

    pub fn content_right(&self) -> Pt {
        self.page_size.width - self.margins.right
    }

    pub fn content_width(&self) -> Pt {
        self.content_right() - self.content_left()
    }

    /// Lowest y any content may reach before a page break is required.
    pub fn break_limit(&self) -> Pt {
        self.page_size.height - self.margins.bottom - self.footer_reserve
    }

    /// Where content resumes on a freshly created page.
    pub fn resume_y(&self, with_continuation_header: bool) -> Pt {
        if with_continuation_header {
            self.margins.top + self.continuation_header_height + self.block_gap
        } else {
            self.margins.top
        }
    }

    /// Height available to a block placed at the top of a fresh page.
    pub fn usable_height(&self, with_continuation_header: bool) -> Pt {
        (self.break_limit() - self.resume_y(with_continuation_header)).max(Pt::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub section_header_height: Pt,
    pub accent_bar_width: Pt,
    pub grid_row_height: Pt,
    pub grid_label_width: Pt,
    pub summary_width: Pt,
    pub summary_row_height: Pt,
    pub metric_card_height: Pt,
    pub metric_card_gap: Pt,
    pub metric_card_min_width: Pt,
    pub badge_padding_x: Pt,
    pub badge_padding_y: Pt,
    pub badge_radius: Pt,
    pub banner_height: Pt,
    pub cell_padding: Pt,
    pub signature_height: Pt,
    pub rule_width: Pt,
    pub corner_radius: Pt,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            section_header_height: Pt::from_mm(10.0),
            accent_bar_width: Pt::from_mm(1.2),
            grid_row_height: Pt::from_mm(6.5),
            grid_label_width: Pt::from_mm(32.0),
            summary_width: Pt::from_mm(80.0),
            summary_row_height: Pt::from_mm(6.5),
            metric_card_height: Pt::from_mm(20.0),
            metric_card_gap: Pt::from_mm(4.0),
            metric_card_min_width: Pt::from_mm(12.0),
            badge_padding_x: Pt::from_mm(2.5),
            badge_padding_y: Pt::from_mm(1.2),
            badge_radius: Pt::from_mm(1.5),
            banner_height: Pt::from_mm(11.0),
            cell_padding: Pt::from_mm(2.0),
            signature_height: Pt::from_mm(28.0),
            rule_width: Pt::from_f32(0.5),
            corner_radius: Pt::from_mm(1.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub title: Pt,
    pub heading: Pt,
    pub body: Pt,
    pub small: Pt,
    pub caption: Pt,
    pub metric_value: Pt,
    pub badge: Pt,
    /// Multiplier applied to a font size to get its line advance.
    pub line_height: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            title: Pt::from_f32(18.0),
            heading: Pt::from_f32(11.0),
            body: Pt::from_f32(9.0),
            small: Pt::from_f32(7.5),
            caption: Pt::from_f32(6.5),
            metric_value: Pt::from_f32(16.0),
            badge: Pt::from_f32(7.0),
            line_height: 1.3,
        }
    }
}

impl Typography {
    pub fn line_advance(&self, size: Pt) -> Pt {
        size * self.line_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub primary: Color,
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub surface: Color,
    pub highlight: Color,
    pub highlight_text: Color,
    pub inverse_text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Color::rgb8(0x1e, 0x3a, 0x8a),
            accent: Color::rgb8(0x25, 0x63, 0xeb),
            text: Color::rgb8(0x11, 0x18, 0x27),
            muted: Color::rgb8(0x6b, 0x72, 0x80),
            border: Color::rgb8(0xe5, 0xe7, 0xeb),
            surface: Color::rgb8(0xf9, 0xfa, 0xfb),
            highlight: Color::rgb8(0xef, 0xf6, 0xff),
            highlight_text: Color::rgb8(0x1e, 0x40, 0xaf),
            inverse_text: Color::WHITE,
        }
    }
}

/// Background, text and border colors for one status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusColors {
    pub background: Color,
    pub text: Color,
    pub border: Color,
}

impl StatusColors {
    fn hex(background: &str, text: &str, border: &str) -> Self {
        let parse = |raw: &str| Color::from_hex(raw).unwrap_or(Color::BLACK);
        Self {
            background: parse(background),
            text: parse(text),
            border: parse(border),
        }
    }

    pub fn neutral() -> Self {
        Self::hex("#f3f4f6", "#374151", "#d1d5db")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub palette: Palette,
    pub typography: Typography,
    pub spacing: Spacing,
    pub statuses: BTreeMap<String, StatusColors>,
    pub neutral_status: StatusColors,
    pub placeholder: String,
}

impl Default for Theme {
    fn default() -> Self {
        let green = StatusColors::hex("#dcfce7", "#166534", "#86efac");
        let amber = StatusColors::hex("#fef3c7", "#92400e", "#fcd34d");
        let red = StatusColors::hex("#fee2e2", "#991b1b", "#fca5a5");
        let blue = StatusColors::hex("#dbeafe", "#1e40af", "#93c5fd");
        let indigo = StatusColors::hex("#e0e7ff", "#3730a3", "#a5b4fc");
        let statuses = [
            ("draft", StatusColors::neutral()),
            ("pending", amber),
            ("on_hold", amber),
            ("sent", indigo),
            ("in_progress", indigo),
            ("approved", green),
            ("active", green),
            ("paid", green),
            ("completed", blue),
            ("delivered", blue),
            ("closed", blue),
            ("rejected", red),
            ("cancelled", red),
            ("overdue", red),
        ]
        .into_iter()
        .map(|(name, colors)| (name.to_string(), colors))
        .collect();
        Self {
            palette: Palette::default(),
            typography: Typography::default(),
            spacing: Spacing::default(),
            statuses,
            neutral_status: StatusColors::neutral(),
            placeholder: "\u{2014}".to_string(),
        }
    }
}

impl Theme {
    /// Looks a status up case-insensitively; unknown statuses get the neutral triple.
    pub fn status_colors(&self, status: &str) -> StatusColors {
        self.statuses
            .get(&normalize_status(status))
            .copied()
            .unwrap_or(self.neutral_status)
    }
}

pub fn normalize_status(status: &str) -> String {
    status
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_a4_with_12mm_margins() {
        let geometry = PageGeometry::default();
        assert!((geometry.break_limit().to_mm() - 267.0).abs() < 0.01);
        assert!((geometry.content_width().to_mm() - 186.0).abs() < 0.01);
        assert!(geometry.resume_y(true) > geometry.resume_y(false));
    }

    #[test]
    fn status_lookup_normalizes_names() {
        let theme = Theme::default();
        let active = theme.status_colors("active");
        assert_eq!(theme.status_colors(" Active "), active);
        assert_eq!(
            theme.status_colors("In Progress"),
            theme.status_colors("in-progress")
        );
        assert_ne!(active, theme.neutral_status);
    }

    #[test]
    fn unknown_status_falls_back_to_neutral() {
        let theme = Theme::default();
        assert_eq!(theme.status_colors("archived-by-robot"), theme.neutral_status);
        assert_eq!(theme.status_colors(""), theme.neutral_status);
    }
}
