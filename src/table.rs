//! Multi-page tables.
//!
//! Grid drawing sits behind [`TableCapability`]: "render these rows, and call this hook
//! whenever a new page begins". [`compose_table`] wires that hook to the pagination
//! controller so the continuation header fires before rows resume on each page, and
//! leaves the cursor below the last row.

use crate::backend::{FontWeight, Renderer, TextAlign};
use crate::canvas::{Canvas, OnPage, Phase, TextSpec};
use crate::error::EngineError;
use crate::types::{Color, Pt, Rect};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowSection {
    Header,
    Body,
    Footer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub header: String,
    pub width: Pt,
    pub align: TextAlign,
}

impl Column {
    pub fn new(key: impl Into<String>, header: impl Into<String>, width: Pt) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            width,
            align: TextAlign::Left,
        }
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }
}

/// One record, cells keyed by column key. Missing keys render the placeholder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    cells: BTreeMap<String, String>,
}

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TableRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Per-cell override returned by a style hook. Unset fields keep the section default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellStyle {
    pub fill: Option<Color>,
    pub text: Option<Color>,
    pub weight: Option<FontWeight>,
}

/// `(section, column key, raw value) -> override`. Must not have side effects.
pub type StyleHook<'a> = dyn Fn(RowSection, &str, &str) -> Option<CellStyle> + 'a;

pub struct TableSpec<'a> {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
    /// Drawn once, after the last body row.
    pub footer_rows: Vec<TableRow>,
    pub style_hook: Option<Box<StyleHook<'a>>>,
}

impl fmt::Debug for TableSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSpec")
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .field("footer_rows", &self.footer_rows.len())
            .field("style_hook", &self.style_hook.is_some())
            .finish()
    }
}

impl<'a> TableSpec<'a> {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            footer_rows: Vec::new(),
            style_hook: None,
        }
    }

    pub fn rows(mut self, rows: Vec<TableRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn footer_rows(mut self, rows: Vec<TableRow>) -> Self {
        self.footer_rows = rows;
        self
    }

    pub fn style_hook(mut self, hook: impl Fn(RowSection, &str, &str) -> Option<CellStyle> + 'a) -> Self {
        self.style_hook = Some(Box::new(hook));
        self
    }

    pub fn total_width(&self) -> Pt {
        self.columns.iter().map(|column| column.width).sum()
    }

    pub fn validate(&self, content_width: Pt) -> Result<(), EngineError> {
        if self.columns.is_empty() {
            return Err(EngineError::InvalidTable("table has no columns".to_string()));
        }
        if let Some(column) = self.columns.iter().find(|column| column.width <= Pt::ZERO) {
            return Err(EngineError::InvalidTable(format!(
                "column '{}' has non-positive width {}",
                column.key, column.width
            )));
        }
        let total = self.total_width();
        if total > content_width {
            return Err(EngineError::InvalidTable(format!(
                "column widths sum to {total}, content width is {content_width}"
            )));
        }
        Ok(())
    }

    fn cell_style(&self, section: RowSection, key: &str, raw: &str) -> CellStyle {
        self.style_hook
            .as_ref()
            .and_then(|hook| hook(section, key, raw))
            .unwrap_or_default()
    }
}

/// New-page hook handed to a [`TableCapability`].
pub struct PageHook<'a, R: Renderer> {
    on_page: Option<&'a OnPage<'a, R>>,
    pages_started: usize,
}

impl<'a, R: Renderer> PageHook<'a, R> {
    pub fn new(on_page: Option<&'a OnPage<'a, R>>) -> Self {
        Self {
            on_page,
            pages_started: 0,
        }
    }

    /// Height available below the chrome of a page this hook creates.
    pub fn usable_height(&self, canvas: &Canvas<R>) -> Pt {
        canvas.geometry().usable_height(self.on_page.is_some())
    }

    /// Opens a page, runs the continuation header and returns where rows resume.
    pub fn new_page(&mut self, canvas: &mut Canvas<R>) -> Result<Pt, EngineError> {
        canvas.start_new_page(self.on_page)?;
        self.pages_started += 1;
        Ok(canvas.cursor_y())
    }

    pub fn pages_started(&self) -> usize {
        self.pages_started
    }
}

pub trait TableCapability<R: Renderer> {
    /// Draws the table starting at `start_y` and returns the y just below its last row.
    fn render(
        &self,
        canvas: &mut Canvas<R>,
        table: &TableSpec<'_>,
        start_y: Pt,
        hook: &mut PageHook<'_, R>,
    ) -> Result<Pt, EngineError>;
}

/// Built-in grid: filled header row repeated on every page, zebra body rows, bold footer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridTable {
    pub zebra: bool,
}

struct LaidOutRow {
    height: Pt,
    cells: Vec<(String, Vec<String>)>,
}

impl GridTable {
    fn layout_row<R: Renderer>(
        &self,
        canvas: &Canvas<R>,
        table: &TableSpec<'_>,
        section: RowSection,
        row: Option<&TableRow>,
    ) -> LaidOutRow {
        let theme = canvas.theme();
        let (typo, spacing) = (theme.typography, theme.spacing);
        let size = section_font_size(canvas, section);
        let padding = spacing.cell_padding;
        let mut line_count = 1usize;
        let cells = table
            .columns
            .iter()
            .map(|column| {
                let raw = match row {
                    None => column.header.clone(),
                    Some(row) => row
                        .get(&column.key)
                        .filter(|value| !value.trim().is_empty())
                        .unwrap_or(theme.placeholder.as_str())
                        .to_string(),
                };
                let weight = table
                    .cell_style(section, &column.key, &raw)
                    .weight
                    .unwrap_or(section_weight(section));
                let width = (column.width - padding * 2).max(Pt::from_f32(1.0));
                let lines = canvas.wrap_text(&raw, weight, size, width);
                line_count = line_count.max(lines.len());
                (raw, lines)
            })
            .collect();
        let height = spacing
            .grid_row_height
            .max(typo.line_advance(size) * line_count as f32 + padding * 2);
        LaidOutRow { height, cells }
    }

    fn draw_row<R: Renderer>(
        &self,
        canvas: &mut Canvas<R>,
        table: &TableSpec<'_>,
        section: RowSection,
        row: &LaidOutRow,
        y: Pt,
        stripe: bool,
    ) {
        let theme = canvas.theme();
        let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
        let size = section_font_size(canvas, section);
        let padding = spacing.cell_padding;
        let (default_fill, default_text) = match section {
            RowSection::Header => (Some(palette.primary), palette.inverse_text),
            RowSection::Footer => (Some(palette.highlight), palette.highlight_text),
            RowSection::Body if stripe => (Some(palette.surface), palette.text),
            RowSection::Body => (None, palette.text),
        };

        let mut x = canvas.content_left();
        for (column, (raw, lines)) in table.columns.iter().zip(&row.cells) {
            let style = table.cell_style(section, &column.key, raw);
            if let Some(fill) = style.fill.or(default_fill) {
                canvas.fill_rect(Rect::new(x, y, column.width, row.height), fill);
            }
            let spec = TextSpec::new(size, style.text.unwrap_or(default_text))
                .weight(style.weight.unwrap_or(section_weight(section)))
                .align(column.align);
            let text_x = match column.align {
                TextAlign::Left => x + padding,
                TextAlign::Center => x + column.width.half(),
                TextAlign::Right => x + column.width - padding,
            };
            for (idx, line) in lines.iter().enumerate() {
                let baseline = y + padding + size + typo.line_advance(size) * idx as f32;
                canvas.text(text_x, baseline, line, &spec);
            }
            x += column.width;
        }
        if section != RowSection::Header {
            let left = canvas.content_left();
            canvas.hline(left, left + table.total_width(), y + row.height, palette.border, spacing.rule_width);
        }
    }
}

fn section_weight(section: RowSection) -> FontWeight {
    match section {
        RowSection::Body => FontWeight::Regular,
        RowSection::Header | RowSection::Footer => FontWeight::Bold,
    }
}

fn section_font_size<R: Renderer>(canvas: &Canvas<R>, section: RowSection) -> Pt {
    let typo = canvas.theme().typography;
    match section {
        RowSection::Header => typo.small,
        RowSection::Body | RowSection::Footer => typo.body,
    }
}

impl<R: Renderer> TableCapability<R> for GridTable {
    fn render(
        &self,
        canvas: &mut Canvas<R>,
        table: &TableSpec<'_>,
        start_y: Pt,
        hook: &mut PageHook<'_, R>,
    ) -> Result<Pt, EngineError> {
        let header = self.layout_row(canvas, table, RowSection::Header, None);
        let body: Vec<LaidOutRow> = table
            .rows
            .iter()
            .map(|row| self.layout_row(canvas, table, RowSection::Body, Some(row)))
            .collect();
        let footer: Vec<LaidOutRow> = table
            .footer_rows
            .iter()
            .map(|row| self.layout_row(canvas, table, RowSection::Footer, Some(row)))
            .collect();

        let usable = hook.usable_height(canvas);
        let tallest = body.iter().chain(&footer).map(|row| row.height).max().unwrap_or(Pt::ZERO);
        if header.height + tallest > usable {
            return Err(EngineError::LayoutOverflow {
                block: "table.row",
                needed: header.height + tallest,
                usable,
            });
        }

        let limit = canvas.geometry().break_limit();
        let first = body.first().or(footer.first()).map_or(Pt::ZERO, |row| row.height);
        let mut y = start_y;
        if y + header.height + first > limit {
            y = hook.new_page(canvas)?;
        }
        self.draw_row(canvas, table, RowSection::Header, &header, y, false);
        y += header.height;

        let sections = body
            .iter()
            .map(|row| (RowSection::Body, row))
            .chain(footer.iter().map(|row| (RowSection::Footer, row)));
        for (idx, (section, row)) in sections.enumerate() {
            if y + row.height > limit {
                y = hook.new_page(canvas)?;
                self.draw_row(canvas, table, RowSection::Header, &header, y, false);
                y += header.height;
            }
            self.draw_row(canvas, table, section, row, y, self.zebra && idx % 2 == 1);
            y += row.height;
        }
        Ok(y)
    }
}

/// Draws `table` from `start_y` using `capability`, then moves the cursor below it.
pub fn compose_table<R: Renderer, C: TableCapability<R> + ?Sized>(
    canvas: &mut Canvas<R>,
    table: &TableSpec<'_>,
    start_y: Pt,
    on_page: Option<&OnPage<'_, R>>,
    capability: &C,
) -> Result<(), EngineError> {
    canvas.ensure_phase(Phase::Composing, "compose_table")?;
    table.validate(canvas.content_width())?;

    let start_page = canvas.page_number();
    canvas.page_blocks += 1;
    let mut hook = PageHook::new(on_page);
    let end_y = capability.render(canvas, table, start_y, &mut hook)?;

    if hook.pages_started() > 0 {
        canvas.metrics.split_tables += 1;
        log::debug!(
            "table of {} rows spans pages {}..={}",
            table.rows.len(),
            start_page,
            canvas.page_number()
        );
        if let Some(logger) = &canvas.debug {
            logger.event(
                "table.span",
                json!({
                    "rows": table.rows.len(),
                    "start_page": start_page,
                    "end_page": canvas.page_number(),
                }),
            );
        }
    }
    canvas.commit(end_y, Pt::ZERO);
    Ok(())
}

/// [`compose_table`] with the built-in grid, starting at the cursor.
pub fn table<R: Renderer>(
    canvas: &mut Canvas<R>,
    table: &TableSpec<'_>,
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    let start = canvas.cursor_y();
    compose_table(canvas, table, start, on_page, &GridTable { zebra: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PageContext;
    use crate::recorder::{Command, Recorder};
    use std::cell::Cell;

    fn line_items(count: usize) -> TableSpec<'static> {
        let columns = vec![
            Column::new("item", "Description", Pt::from_mm(110.0)),
            Column::new("qty", "Qty", Pt::from_mm(20.0)).align(TextAlign::Right),
            Column::new("amount", "Amount", Pt::from_mm(40.0)).align(TextAlign::Right),
        ];
        let rows = (1..=count)
            .map(|idx| {
                TableRow::new()
                    .cell("item", format!("Line item {idx}"))
                    .cell("qty", "2")
                    .cell("amount", format!("{}.00", idx * 10))
            })
            .collect();
        TableSpec::new(columns).rows(rows)
    }

    #[test]
    fn header_repeats_on_every_page_and_chrome_fires_first() {
        let calls = Cell::new(0usize);
        let header = |canvas: &mut Canvas<Recorder>, ctx: &PageContext| {
            calls.set(calls.get() + 1);
            let spec = TextSpec::new(Pt::from_f32(8.0), Color::BLACK);
            canvas.text(canvas.content_left(), ctx.top + Pt::from_f32(10.0), "Continued", &spec);
        };
        let mut canvas = Canvas::builder().build().expect("default config");
        let spec = line_items(90);
        super::table(&mut canvas, &spec, Some(&header)).expect("rows fit");

        let pages = &canvas.renderer().document().pages;
        assert!(pages.len() >= 3);
        assert_eq!(calls.get(), pages.len() - 1);
        for page in pages {
            assert_eq!(page.texts().filter(|text| *text == "Description").count(), 1);
        }
        for page in &pages[1..] {
            let texts: Vec<&str> = page.texts().collect();
            let chrome = texts.iter().position(|text| *text == "Continued");
            let header = texts.iter().position(|text| *text == "Description");
            assert!(chrome < header);
        }
        assert!(pages.last().is_some_and(|page| page.contains_text("Line item 90")));
        assert_eq!(canvas.metrics().split_tables, 1);
        assert!(canvas.cursor_y() > canvas.geometry().resume_y(true));
    }

    #[test]
    fn style_hook_recolors_matching_cells() {
        let red = Color::rgb8(0xdc, 0x26, 0x26);
        let mut canvas = Canvas::builder().build().expect("default config");
        let spec = line_items(3).style_hook(move |section, key, raw| {
            (section == RowSection::Body && key == "amount" && raw == "20.00").then_some(CellStyle {
                text: Some(red),
                weight: Some(FontWeight::Bold),
                ..CellStyle::default()
            })
        });
        super::table(&mut canvas, &spec, None).expect("fits");

        let commands = &canvas.renderer().document().pages[0].commands;
        let idx = commands
            .iter()
            .position(|cmd| matches!(cmd, Command::Text { text, .. } if text == "20.00"))
            .expect("cell drawn");
        assert_eq!(commands[idx - 2], Command::SetFillColor(red));
        assert!(matches!(commands[idx - 1], Command::SetFont { weight: FontWeight::Bold, .. }));
    }

    #[test]
    fn footer_rows_are_drawn_once_after_the_body() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let spec = line_items(60).footer_rows(vec![TableRow::new().cell("item", "Total").cell("amount", "18,300.00")]);
        super::table(&mut canvas, &spec, None).expect("fits");
        let pages = &canvas.renderer().document().pages;
        let totals: usize = pages
            .iter()
            .map(|page| page.texts().filter(|text| *text == "Total").count())
            .sum();
        assert_eq!(totals, 1);
        assert!(pages.last().is_some_and(|page| page.contains_text("18,300.00")));
    }

    #[test]
    fn missing_cells_render_the_placeholder() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let spec = line_items(0).rows(vec![TableRow::from_iter([("item", "Skip hire")])]);
        super::table(&mut canvas, &spec, None).expect("fits");
        let page = &canvas.renderer().document().pages[0];
        assert_eq!(page.texts().filter(|text| *text == "\u{2014}").count(), 2);
    }

    #[test]
    fn columns_wider_than_the_content_are_rejected() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let spec = TableSpec::new(vec![
            Column::new("a", "A", Pt::from_mm(100.0)),
            Column::new("b", "B", Pt::from_mm(100.0)),
        ]);
        assert!(matches!(
            super::table(&mut canvas, &spec, None),
            Err(EngineError::InvalidTable(_))
        ));
        assert!(matches!(
            super::table(&mut canvas, &TableSpec::new(Vec::new()), None),
            Err(EngineError::InvalidTable(_))
        ));
    }

    #[test]
    fn row_taller_than_a_page_is_an_overflow() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let huge = "word ".repeat(4000);
        let spec = line_items(0).rows(vec![TableRow::new().cell("item", huge)]);
        assert!(matches!(
            super::table(&mut canvas, &spec, None),
            Err(EngineError::LayoutOverflow { block: "table.row", .. })
        ));
    }
}
