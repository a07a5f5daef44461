//! Layout composers. Each one reads the cursor, asks the pagination controller for room,
//! draws relative to the cursor and advances it. None of them keep state between calls.

use crate::backend::{FontWeight, Renderer, TextAlign};
use crate::canvas::{Canvas, OnPage, Phase, Region, RegionStyle, TextSpec};
use crate::error::EngineError;
use crate::types::{Color, Pt, Rect, Size};

pub fn section_header<R: Renderer>(
    canvas: &mut Canvas<R>,
    title: &str,
    subtitle: Option<&str>,
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    let theme = canvas.theme();
    let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
    let subtitle = subtitle.map(str::trim).filter(|text| !text.is_empty());

    let title_box = spacing.section_header_height;
    let subtitle_box = if subtitle.is_some() {
        typo.line_advance(typo.small)
    } else {
        Pt::ZERO
    };
    let height = title_box + subtitle_box;
    let top = canvas.reserve("section_header", height, on_page)?;
    let left = canvas.content_left();
    let right = canvas.geometry().content_right();

    let inset = Pt::from_f32(2.0);
    canvas.fill_rect(
        Rect::new(left, top + inset, spacing.accent_bar_width, title_box - inset * 2),
        palette.accent,
    );
    let text_x = left + spacing.accent_bar_width + spacing.cell_padding;
    canvas.text(
        text_x,
        canvas.baseline_in(top, title_box, typo.heading),
        &title.to_uppercase(),
        &TextSpec::new(typo.heading, palette.primary).bold(),
    );
    if let Some(subtitle) = subtitle {
        canvas.text(
            text_x,
            top + title_box + typo.small,
            subtitle,
            &TextSpec::new(typo.small, palette.muted),
        );
    }
    canvas.hline(left, right, top + height, palette.border, spacing.rule_width);
    canvas.commit(top, height);
    Ok(())
}

/// One label/value pair of an info grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfoField {
    pub label: String,
    /// `None` renders the theme placeholder.
    pub value: Option<String>,
    pub full_width: bool,
    pub bold: bool,
    pub highlight: bool,
}

impl InfoField {
    pub fn new(label: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self::optional(label, Some(value.as_ref()))
    }

    pub fn optional(label: impl Into<String>, value: Option<&str>) -> Self {
        let value = value
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        Self {
            label: label.into(),
            value,
            ..Self::default()
        }
    }

    pub fn full_width(mut self) -> Self {
        self.full_width = true;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }
}

fn grid_rows(fields: &[InfoField]) -> Vec<Vec<&InfoField>> {
    let mut rows: Vec<Vec<&InfoField>> = Vec::new();
    let mut pending: Option<&InfoField> = None;
    for field in fields {
        if field.full_width {
            if let Some(left) = pending.take() {
                rows.push(vec![left]);
            }
            rows.push(vec![field]);
        } else if let Some(left) = pending.take() {
            rows.push(vec![left, field]);
        } else {
            pending = Some(field);
        }
    }
    if let Some(left) = pending {
        rows.push(vec![left]);
    }
    rows
}

/// Label/value pairs two to a row; full-width fields take a row of their own.
///
/// Returns the number of grid rows drawn.
pub fn info_grid<R: Renderer>(
    canvas: &mut Canvas<R>,
    fields: &[InfoField],
    on_page: Option<&OnPage<'_, R>>,
) -> Result<usize, EngineError> {
    canvas.ensure_phase(Phase::Composing, "info_grid")?;
    if fields.is_empty() {
        return Ok(0);
    }
    let theme = canvas.theme();
    let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
    let placeholder = theme.placeholder.clone();

    let left = canvas.content_left();
    let width = canvas.content_width();
    let half = width / 2;
    let advance = typo.line_advance(typo.body);
    let padding_y = Pt::from_f32(2.0);

    let rows = grid_rows(fields);
    for (row_idx, row) in rows.iter().enumerate() {
        let cell_width = if row.len() == 1 && row[0].full_width { width } else { half };
        let value_width = (cell_width - spacing.grid_label_width - spacing.cell_padding).max(Pt::from_f32(1.0));

        let cells: Vec<(&InfoField, Vec<String>)> = row
            .iter()
            .map(|field| {
                let weight = if field.bold { FontWeight::Bold } else { FontWeight::Regular };
                let lines = match &field.value {
                    Some(value) => canvas.wrap_text(value, weight, typo.body, value_width),
                    None => vec![placeholder.clone()],
                };
                (*field, lines)
            })
            .collect();
        let line_count = cells.iter().map(|(_, lines)| lines.len()).max().unwrap_or(1);
        let height = spacing.grid_row_height.max(advance * line_count as f32 + padding_y * 2);

        let top = if row_idx == 0 {
            canvas.reserve("info_grid.row", height, on_page)?
        } else {
            canvas.reserve_more("info_grid.row", height, on_page)?
        };
        for (idx, (field, lines)) in cells.iter().enumerate() {
            let x = left + half * idx as i32;
            if field.highlight {
                canvas.fill_rect(Rect::new(x, top, cell_width, height), palette.highlight);
            }
            let first_baseline = canvas.baseline_in(top, spacing.grid_row_height, typo.body);
            canvas.text(
                x + spacing.cell_padding,
                first_baseline,
                &field.label,
                &TextSpec::new(typo.small, palette.muted),
            );
            let color = if field.highlight { palette.highlight_text } else { palette.text };
            let mut spec = TextSpec::new(typo.body, color);
            if field.bold {
                spec = spec.bold();
            }
            if field.value.is_none() {
                spec.color = palette.muted;
            }
            for (line_idx, line) in lines.iter().enumerate() {
                canvas.text(
                    x + spacing.grid_label_width,
                    first_baseline + advance * line_idx as f32,
                    line,
                    &spec,
                );
            }
        }
        canvas.hline(left, left + width, top + height, palette.border, spacing.rule_width);
        canvas.cursor_y = top + height;
    }
    let bottom = canvas.cursor_y();
    canvas.commit(bottom, Pt::ZERO);
    Ok(rows.len())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryEntry {
    pub label: String,
    pub value: String,
    pub bold: bool,
    pub highlight: bool,
}

impl SummaryEntry {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryRow {
    Entry(SummaryEntry),
    Separator,
}

impl SummaryRow {
    pub fn entry(label: impl Into<String>, value: impl Into<String>) -> Self {
        SummaryRow::Entry(SummaryEntry::new(label, value))
    }

    /// Bold, highlighted row used for grand totals.
    pub fn total(label: impl Into<String>, value: impl Into<String>) -> Self {
        SummaryRow::Entry(SummaryEntry::new(label, value).bold().highlighted())
    }
}

/// Fixed-width key/value stack anchored to the right edge of the content area.
pub fn summary_box<R: Renderer>(
    canvas: &mut Canvas<R>,
    rows: &[SummaryRow],
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    canvas.ensure_phase(Phase::Composing, "summary_box")?;
    if rows.is_empty() {
        return Ok(());
    }
    let theme = canvas.theme();
    let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
    let placeholder = theme.placeholder.clone();

    let row_height = spacing.summary_row_height;
    let separator_height = spacing.cell_padding;
    let padding = spacing.cell_padding;
    let height = rows
        .iter()
        .map(|row| match row {
            SummaryRow::Entry(_) => row_height,
            SummaryRow::Separator => separator_height,
        })
        .sum::<Pt>()
        + padding * 2;

    let top = canvas.reserve("summary_box", height, on_page)?;
    let right = canvas.geometry().content_right();
    let box_width = spacing.summary_width.min(canvas.content_width());
    let x = right - box_width;
    canvas.draw_region(&Region {
        rect: Rect::new(x, top, box_width, height),
        style: RegionStyle::bordered(Some(palette.surface), palette.border, spacing.rule_width)
            .rounded(spacing.corner_radius),
    });

    let mut y = top + padding;
    for row in rows {
        match row {
            SummaryRow::Separator => {
                let mid = y + separator_height.half();
                canvas.hline(x + padding, right - padding, mid, palette.border, spacing.rule_width);
                y += separator_height;
            }
            SummaryRow::Entry(entry) => {
                if entry.highlight {
                    canvas.fill_rect(Rect::new(x, y, box_width, row_height), palette.highlight);
                }
                let color = if entry.highlight { palette.highlight_text } else { palette.text };
                let mut spec = TextSpec::new(typo.body, color);
                if entry.bold {
                    spec = spec.bold();
                }
                let baseline = canvas.baseline_in(y, row_height, typo.body);
                canvas.text(x + padding, baseline, &entry.label, &spec);
                let value = if entry.value.trim().is_empty() {
                    placeholder.as_str()
                } else {
                    entry.value.as_str()
                };
                canvas.text(right - padding, baseline, value, &spec.align(TextAlign::Right));
                y += row_height;
            }
        }
    }
    canvas.commit(top, height);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    pub unit: Option<String>,
    /// Overrides the theme accent for this card's bar.
    pub accent: Option<Color>,
}

impl MetricCard {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn accent(mut self, color: Color) -> Self {
        self.accent = Some(color);
        self
    }
}

/// A single row of equal-width cards of fixed height.
pub fn metric_cards<R: Renderer>(
    canvas: &mut Canvas<R>,
    cards: &[MetricCard],
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    canvas.ensure_phase(Phase::Composing, "metric_cards")?;
    if cards.is_empty() {
        return Ok(());
    }
    let theme = canvas.theme();
    let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
    let placeholder = theme.placeholder.clone();

    let height = spacing.metric_card_height;
    let count = i32::try_from(cards.len()).unwrap_or(i32::MAX);
    let gap = spacing.metric_card_gap;
    let min_width = spacing.metric_card_min_width;
    let mut card_width = (canvas.content_width() - gap * (count - 1)) / count;
    if card_width < min_width {
        log::warn!(
            "{} metric cards leave {card_width} each, drawing them {min_width} wide",
            cards.len()
        );
        card_width = min_width;
    }
    let top = canvas.reserve("metric_cards", height, on_page)?;
    let padding = spacing.cell_padding;

    let mut x = canvas.content_left();
    for card in cards {
        canvas.draw_region(&Region {
            rect: Rect::new(x, top, card_width, height),
            style: RegionStyle::bordered(Some(palette.surface), palette.border, spacing.rule_width)
                .rounded(spacing.corner_radius),
        });
        canvas.fill_rect(
            Rect::new(x, top, spacing.accent_bar_width, height),
            card.accent.unwrap_or(palette.accent),
        );

        let text_x = x + spacing.accent_bar_width + padding;
        let value = if card.value.trim().is_empty() {
            placeholder.as_str()
        } else {
            card.value.as_str()
        };
        let value_baseline = top + padding + typo.metric_value;
        canvas.text(
            text_x,
            value_baseline,
            value,
            &TextSpec::new(typo.metric_value, palette.primary).bold(),
        );
        if let Some(unit) = card.unit.as_deref().filter(|unit| !unit.is_empty()) {
            canvas.text(
                text_x,
                value_baseline + typo.line_advance(typo.caption),
                unit,
                &TextSpec::new(typo.caption, palette.muted),
            );
        }
        canvas.text(
            text_x,
            top + height - padding,
            &card.label.to_uppercase(),
            &TextSpec::new(typo.caption, palette.muted).bold(),
        );
        x += card_width + gap;
    }
    canvas.commit(top, height);
    Ok(())
}

fn badge_label(status: &str) -> String {
    status.trim().replace('_', " ").to_uppercase()
}

/// Size of the pill `badge_at` would draw for `status`.
pub fn measure_badge<R: Renderer>(canvas: &Canvas<R>, status: &str) -> Size {
    let theme = canvas.theme();
    let (typo, spacing) = (theme.typography, theme.spacing);
    let text_width = canvas.text_width(&badge_label(status), FontWeight::Bold, typo.badge);
    Size {
        width: text_width + spacing.badge_padding_x * 2,
        height: typo.badge + spacing.badge_padding_y * 2,
    }
}

/// Draws a status pill with its top-left corner at `(x, y)` and returns its bounds.
/// Does not touch the cursor.
pub fn badge_at<R: Renderer>(canvas: &mut Canvas<R>, x: Pt, y: Pt, status: &str) -> Result<Rect, EngineError> {
    canvas.ensure_phase(Phase::Composing, "badge_at")?;
    Ok(draw_badge(canvas, x, y, status))
}

pub(crate) fn draw_badge<R: Renderer>(canvas: &mut Canvas<R>, x: Pt, y: Pt, status: &str) -> Rect {
    let theme = canvas.theme();
    let (typo, spacing) = (theme.typography, theme.spacing);
    let colors = theme.status_colors(status);
    let size = measure_badge(canvas, status);
    let rect = Rect::new(x, y, size.width, size.height);

    canvas.draw_region(&Region {
        rect,
        style: RegionStyle::bordered(Some(colors.background), colors.border, spacing.rule_width)
            .rounded(spacing.badge_radius.min(size.height.half())),
    });
    canvas.text(
        x + size.width.half(),
        canvas.baseline_in(y, size.height, typo.badge),
        &badge_label(status),
        &TextSpec::new(typo.badge, colors.text)
            .bold()
            .align(TextAlign::Center),
    );
    rect
}

/// Flowing badge at the left content edge.
pub fn badge<R: Renderer>(
    canvas: &mut Canvas<R>,
    status: &str,
    on_page: Option<&OnPage<'_, R>>,
) -> Result<Rect, EngineError> {
    let size = measure_badge(canvas, status);
    let top = canvas.reserve("badge", size.height, on_page)?;
    let left = canvas.content_left();
    let rect = draw_badge(canvas, left, top, status);
    canvas.commit(top, size.height);
    Ok(rect)
}

/// Full-width tinted strip with bold text. `tone` picks colors from the status map.
pub fn banner<R: Renderer>(
    canvas: &mut Canvas<R>,
    text: &str,
    tone: Option<&str>,
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    let theme = canvas.theme();
    let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
    let (background, border, color) = match tone {
        Some(tone) => {
            let colors = theme.status_colors(tone);
            (colors.background, colors.border, colors.text)
        }
        None => (palette.highlight, palette.accent, palette.highlight_text),
    };

    let height = spacing.banner_height;
    let top = canvas.reserve("banner", height, on_page)?;
    let left = canvas.content_left();
    let width = canvas.content_width();
    canvas.draw_region(&Region {
        rect: Rect::new(left, top, width, height),
        style: RegionStyle::filled(background).rounded(spacing.corner_radius),
    });
    canvas.fill_rect(Rect::new(left, top, spacing.accent_bar_width, height), border);
    canvas.text(
        left + spacing.accent_bar_width + spacing.cell_padding * 2,
        canvas.baseline_in(top, height, typo.body),
        text,
        &TextSpec::new(typo.body, color).bold(),
    );
    canvas.commit(top, height);
    Ok(())
}

/// Free text wrapped to the content width. Breaks between lines, never inside one.
pub fn paragraph<R: Renderer>(
    canvas: &mut Canvas<R>,
    text: &str,
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    canvas.ensure_phase(Phase::Composing, "paragraph")?;
    if text.trim().is_empty() {
        return Ok(());
    }
    let theme = canvas.theme();
    let (palette, typo) = (theme.palette, theme.typography);
    let spec = TextSpec::new(typo.body, palette.text);
    let advance = typo.line_advance(typo.body);
    let lines = canvas.wrap_text(text.trim(), FontWeight::Regular, typo.body, canvas.content_width());

    let left = canvas.content_left();
    let mut bottom = canvas.cursor_y();
    for (idx, line) in lines.iter().enumerate() {
        let top = if idx == 0 {
            canvas.reserve("paragraph.line", advance, on_page)?
        } else {
            canvas.reserve_more("paragraph.line", advance, on_page)?
        };
        if !line.is_empty() {
            canvas.text(left, top + typo.body, line, &spec);
        }
        bottom = top + advance;
        canvas.cursor_y = bottom;
    }
    canvas.commit(bottom, Pt::ZERO);
    Ok(())
}

/// Vertical gap. A gap that would cross the break limit starts a new page instead.
pub fn spacer<R: Renderer>(
    canvas: &mut Canvas<R>,
    height: Pt,
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    if height > canvas.remaining_height() {
        return canvas.start_new_page(on_page);
    }
    canvas.advance(height)
}
