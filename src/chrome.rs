//! Page chrome: the first-page header, the compact continuation header, the signature
//! block and the footer pass that runs once the page count is final.

use crate::backend::{FontWeight, Renderer, TextAlign, WatermarkMark};
use crate::canvas::{Canvas, OnPage, PageContext, Phase, Region, RegionStyle, TextSpec};
use crate::compose::{draw_badge, measure_badge};
use crate::error::EngineError;
use crate::types::{Color, Pt, Rect};
use chrono::{Local, NaiveDateTime};
use serde_json::json;

/// Identity shown at the top of page 1 and, abbreviated, on every later page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentHeader {
    pub company_name: String,
    /// Address, phone, registration lines under the company name.
    pub company_details: Vec<String>,
    pub document_type: String,
    pub document_number: String,
    pub date: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
}

impl DocumentHeader {
    pub fn new(
        company_name: impl Into<String>,
        document_type: impl Into<String>,
        document_number: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            document_type: document_type.into(),
            document_number: document_number.into(),
            ..Self::default()
        }
    }

    pub fn detail(mut self, line: impl Into<String>) -> Self {
        self.company_details.push(line.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

/// Draws the full header on page 1. Call once, before any other composer.
pub fn draw_first_page_header<R: Renderer>(
    canvas: &mut Canvas<R>,
    header: &DocumentHeader,
) -> Result<(), EngineError> {
    let theme = canvas.theme();
    let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
    let placeholder = theme.placeholder.clone();

    let left = canvas.content_left();
    let right = canvas.geometry().content_right();
    let small_advance = typo.line_advance(typo.small);

    let left_height = typo.line_advance(typo.title) + small_advance * header.company_details.len() as f32;
    let right_lines = 2 + usize::from(header.date.is_some());
    let right_height = typo.line_advance(typo.heading) + small_advance * (right_lines - 1) as f32;
    let identity_height = left_height.max(right_height);

    let title = non_empty(&header.title);
    let status = non_empty(&header.status);
    let banner_height = if title.is_some() || status.is_some() {
        spacing.banner_height + spacing.cell_padding
    } else {
        Pt::ZERO
    };
    let rule_gap = spacing.cell_padding;
    let height = identity_height + rule_gap + banner_height;
    let top = canvas.reserve("first_page_header", height, None)?;

    let company = if header.company_name.trim().is_empty() {
        placeholder.as_str()
    } else {
        header.company_name.as_str()
    };
    let mut y = top + typo.title;
    canvas.text(left, y, company, &TextSpec::new(typo.title, palette.primary).bold());
    y += typo.line_advance(typo.title) - typo.title + typo.small;
    let detail_spec = TextSpec::new(typo.small, palette.muted);
    for line in &header.company_details {
        canvas.text(left, y, line, &detail_spec);
        y += small_advance;
    }

    let mut y = top + typo.heading;
    canvas.text(
        right,
        y,
        &header.document_type.to_uppercase(),
        &TextSpec::new(typo.heading, palette.accent)
            .bold()
            .align(TextAlign::Right),
    );
    y += small_advance;
    let number = if header.document_number.trim().is_empty() {
        placeholder.as_str()
    } else {
        header.document_number.as_str()
    };
    canvas.text(
        right,
        y,
        &format!("No. {number}"),
        &TextSpec::new(typo.small, palette.text).bold().align(TextAlign::Right),
    );
    if let Some(date) = non_empty(&header.date) {
        y += small_advance;
        canvas.text(right, y, date, &detail_spec.align(TextAlign::Right));
    }

    let rule_y = top + identity_height + rule_gap.half();
    canvas.hline(left, right, rule_y, palette.accent, spacing.rule_width * 2);

    if banner_height > Pt::ZERO {
        let banner_top = top + identity_height + rule_gap;
        let banner_rect = Rect::new(left, banner_top, right - left, spacing.banner_height);
        canvas.draw_region(&Region {
            rect: banner_rect,
            style: RegionStyle::bordered(Some(palette.surface), palette.border, spacing.rule_width)
                .rounded(spacing.corner_radius),
        });
        if let Some(title) = title {
            canvas.text(
                left + spacing.cell_padding * 2,
                canvas.baseline_in(banner_top, spacing.banner_height, typo.heading),
                title,
                &TextSpec::new(typo.heading, palette.text).bold(),
            );
        }
        if let Some(status) = status {
            let size = measure_badge(canvas, status);
            let x = right - spacing.cell_padding * 2 - size.width;
            let y = banner_top + (spacing.banner_height - size.height).half();
            draw_badge(canvas, x, y, status);
        }
    }
    canvas.commit(top, height);
    Ok(())
}

/// Compact chrome for every page after the first: company name on the left, document
/// type and number on the right, a rule underneath.
pub fn continuation_header<R: Renderer>(
    header: &DocumentHeader,
) -> impl Fn(&mut Canvas<R>, &PageContext) + '_ {
    move |canvas: &mut Canvas<R>, ctx: &PageContext| {
        let theme = canvas.theme();
        let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
        let left = canvas.content_left();
        let right = canvas.geometry().content_right();
        let baseline = canvas.baseline_in(ctx.top, ctx.height, typo.body);

        canvas.text(
            left,
            baseline,
            &header.company_name,
            &TextSpec::new(typo.body, palette.primary).bold(),
        );
        canvas.text(
            right,
            baseline,
            &format!("{} {}", header.document_type.to_uppercase(), header.document_number),
            &TextSpec::new(typo.small, palette.muted).align(TextAlign::Right),
        );
        canvas.hline(left, right, ctx.top + ctx.height, palette.border, spacing.rule_width);
    }
}

const MAX_SIGNATURES: usize = 3;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureBlock {
    pub labels: Vec<String>,
}

impl SignatureBlock {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Signature lines side by side. Breaks first if the block does not fit.
pub fn draw_signature_block<R: Renderer>(
    canvas: &mut Canvas<R>,
    block: &SignatureBlock,
    on_page: Option<&OnPage<'_, R>>,
) -> Result<(), EngineError> {
    canvas.ensure_phase(Phase::Composing, "draw_signature_block")?;
    if block.labels.is_empty() {
        return Ok(());
    }
    if block.labels.len() > MAX_SIGNATURES {
        log::warn!(
            "signature block has {} labels, drawing the first {MAX_SIGNATURES}",
            block.labels.len()
        );
    }
    let labels = &block.labels[..block.labels.len().min(MAX_SIGNATURES)];

    let theme = canvas.theme();
    let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
    let height = spacing.signature_height;
    let top = canvas.reserve("signature_block", height, on_page)?;

    let count = i32::try_from(labels.len()).unwrap_or(1);
    let gap = spacing.metric_card_gap * 2;
    let width = (canvas.content_width() - gap * (count - 1)) / count;
    let line_y = top + height - typo.line_advance(typo.small) * 2.0;
    let mut x = canvas.content_left();
    for label in labels {
        canvas.hline(x, x + width, line_y, palette.text, spacing.rule_width);
        canvas.text(
            x,
            line_y + typo.line_advance(typo.small),
            label,
            &TextSpec::new(typo.small, palette.muted),
        );
        canvas.text(
            x + width,
            line_y + typo.line_advance(typo.small),
            "Date: ____________",
            &TextSpec::new(typo.caption, palette.muted).align(TextAlign::Right),
        );
        x += width + gap;
    }
    canvas.commit(top, height);
    Ok(())
}

/// What the footer pass stamps on every page.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterSpec {
    pub document_number: String,
    pub generated_at: NaiveDateTime,
    pub issuer: Option<String>,
    pub note: Option<String>,
}

impl FooterSpec {
    pub fn new(document_number: impl Into<String>) -> Self {
        Self {
            document_number: document_number.into(),
            generated_at: Local::now().naive_local(),
            issuer: None,
            note: None,
        }
    }

    pub fn generated_at(mut self, at: NaiveDateTime) -> Self {
        self.generated_at = at;
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

pub fn page_indicator(page: usize, total: usize) -> String {
    format!("Page {page} of {total}")
}

/// Diagonal translucent text laid over every page, e.g. "DRAFT".
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub text: String,
    pub size: Pt,
    pub color: Option<Color>,
    pub opacity: f32,
    pub angle_deg: f32,
}

impl Watermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: Pt::from_f32(72.0),
            color: None,
            opacity: 0.08,
            angle_deg: 45.0,
        }
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

impl<R: Renderer> Canvas<R> {
    /// Ends composition and stamps footers on pages 1..=N. Returns N.
    ///
    /// Runs once; afterwards only watermarking and output are allowed.
    pub fn finalize(&mut self, footer: &FooterSpec) -> Result<usize, EngineError> {
        self.ensure_phase(Phase::Composing, "finalize")?;
        self.close_page_metrics();
        self.phase = Phase::Finalizing;
        let total = self.renderer.page_count();
        self.total_pages = Some(total);
        log::info!("finalizing {total} pages for {}", footer.document_number);

        for page in 1..=total {
            self.renderer.select_page(page)?;
            self.stamp_footer(page, total, footer);
        }
        if let Some(logger) = &self.debug {
            logger.event(
                "finalize",
                json!({
                    "document_number": footer.document_number,
                    "pages": total,
                    "page_breaks": self.metrics.page_breaks,
                }),
            );
        }
        Ok(total)
    }

    fn stamp_footer(&mut self, page: usize, total: usize, footer: &FooterSpec) {
        let theme = self.theme();
        let (palette, typo, spacing) = (theme.palette, theme.typography, theme.spacing);
        let geometry = *self.geometry();
        let left = geometry.content_left();
        let right = geometry.content_right();
        let top = geometry.break_limit() + spacing.cell_padding * 2;
        let caption = TextSpec::new(typo.caption, palette.muted);
        let caption_advance = typo.line_advance(typo.caption);

        self.hline(left, right, top, palette.accent, spacing.rule_width * 2);

        let first_line = top + spacing.cell_padding + typo.caption;
        let stamp = footer.generated_at.format("%Y-%m-%d %H:%M");
        self.text(left, first_line, &format!("Generated {stamp}"), &caption);
        if let Some(issuer) = non_empty(&footer.issuer) {
            self.text(left, first_line + caption_advance, &format!("Issued by {issuer}"), &caption);
        }

        let indicator = page_indicator(page, total);
        let indicator_spec = TextSpec::new(typo.small, palette.primary)
            .bold()
            .align(TextAlign::Center);
        let box_width = self.text_width(&indicator, FontWeight::Bold, typo.small) + spacing.badge_padding_x * 2;
        let box_height = typo.small + spacing.badge_padding_y * 2;
        let box_top = top + spacing.cell_padding;
        let box_rect = Rect::new(right - box_width, box_top, box_width, box_height);
        self.draw_region(&Region {
            rect: box_rect,
            style: RegionStyle::bordered(Some(palette.highlight), palette.border, spacing.rule_width)
                .rounded(spacing.badge_radius),
        });
        self.text(
            box_rect.x + box_width.half(),
            self.baseline_in(box_top, box_height, typo.small),
            &indicator,
            &indicator_spec,
        );
        if !footer.document_number.trim().is_empty() {
            self.text(
                right,
                box_rect.bottom() + caption_advance,
                &footer.document_number,
                &caption.align(TextAlign::Right),
            );
        }

        if let Some(note) = non_empty(&footer.note) {
            let center = left + (right - left).half();
            // Keep clear of the timestamp column and the page box.
            let note_width = (right - left) - box_width * 4;
            let lines = self.wrap_text(note, FontWeight::Italic, typo.caption, note_width.max(Pt::from_f32(40.0)));
            if lines.len() > 2 {
                log::warn!("footer note wraps to {} lines, keeping 2", lines.len());
            }
            for (idx, line) in lines.iter().take(2).enumerate() {
                self.text(
                    center,
                    first_line + caption_advance * idx as f32,
                    line,
                    &caption.italic().align(TextAlign::Center),
                );
            }
        }
    }

    /// Lays a watermark over every page. Only valid between `finalize` and `finish`.
    pub fn stamp_watermark(&mut self, watermark: &Watermark) -> Result<(), EngineError> {
        self.ensure_phase(Phase::Finalizing, "stamp_watermark")?;
        if watermark.text.trim().is_empty() {
            return Ok(());
        }
        let mark = WatermarkMark {
            text: watermark.text.clone(),
            size: watermark.size,
            color: watermark.color.unwrap_or(self.theme().palette.muted),
            opacity: watermark.opacity.clamp(0.0, 1.0),
            angle_deg: watermark.angle_deg,
        };
        self.renderer.watermark(&mark);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::section_header;
    use crate::recorder::{Command, Recorder};
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn header() -> DocumentHeader {
        DocumentHeader::new("Harbour Works Ltd", "Estimate", "EST-0042")
            .detail("4 Quay Street")
            .date("2026-10-17")
            .title("North wall repairs")
            .status("pending")
    }

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .expect("valid date")
    }

    #[test]
    fn first_page_header_draws_identity_title_and_badge() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let header = header();
        draw_first_page_header(&mut canvas, &header).expect("fits");
        let page = &canvas.renderer().document().pages[0];
        for text in ["Harbour Works Ltd", "ESTIMATE", "No. EST-0042", "2026-10-17", "North wall repairs", "PENDING"] {
            assert!(page.contains_text(text), "{text} missing");
        }
        assert!(canvas.cursor_y() > canvas.geometry().margins.top);
    }

    #[test]
    fn continuation_header_appears_on_every_later_page() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let header = header();
        let continuation = continuation_header(&header);
        draw_first_page_header(&mut canvas, &header).expect("fits");
        for idx in 0..40 {
            section_header(&mut canvas, &format!("Section {idx}"), None, Some(&continuation)).expect("fits");
        }
        let pages = &canvas.renderer().document().pages;
        assert!(pages.len() > 1);
        assert!(!pages[0].contains_text("ESTIMATE EST-0042"));
        for page in &pages[1..] {
            assert!(page.contains_text("ESTIMATE EST-0042"));
        }
    }

    #[test]
    fn footer_reads_page_i_of_n_on_every_page() {
        let mut canvas = Canvas::builder().build().expect("default config");
        for _ in 0..3 {
            canvas.start_new_page(None).expect("composing");
        }
        let footer = FooterSpec::new("EST-0042")
            .generated_at(fixed_time())
            .issuer("Harbour Works Ltd")
            .note("Valid for 30 days");
        let total = canvas.finalize(&footer).expect("first finalize");
        assert_eq!(total, 4);
        assert_eq!(canvas.total_pages(), Some(4));

        for (idx, page) in canvas.renderer().document().pages.iter().enumerate() {
            assert!(page.contains_text(&page_indicator(idx + 1, 4)));
            assert!(page.contains_text("Generated 2026-10-17 09:30"));
            assert!(page.contains_text("Valid for 30 days"));
            assert!(page.contains_text("EST-0042"));
        }
    }

    #[test]
    fn composing_after_finalize_is_rejected() {
        let mut canvas = Canvas::builder().build().expect("default config");
        canvas.finalize(&FooterSpec::new("X-1")).expect("finalize");

        let err = section_header(&mut canvas, "Late", None, None).expect_err("phase guard");
        assert!(matches!(
            err,
            EngineError::PhaseViolation {
                phase: Phase::Finalizing,
                ..
            }
        ));
        assert!(canvas.finalize(&FooterSpec::new("X-1")).is_err());
        assert!(canvas.start_new_page(None).is_err());
        assert_eq!(canvas.renderer().page_count(), 1);
    }

    #[test]
    fn placed_badge_is_rejected_after_finalize() {
        let mut canvas = Canvas::builder().build().expect("default config");
        canvas.start_new_page(None).expect("composing");
        canvas.finalize(&FooterSpec::new("X-2")).expect("finalize");
        let before = canvas.renderer().document().pages[1].commands.len();

        let err = crate::compose::badge_at(&mut canvas, Pt::ZERO, Pt::ZERO, "late").expect_err("phase guard");
        assert!(matches!(
            err,
            EngineError::PhaseViolation {
                phase: Phase::Finalizing,
                ..
            }
        ));
        assert_eq!(canvas.renderer().document().pages[1].commands.len(), before);
    }

    #[test]
    fn empty_content_is_still_phase_guarded() {
        let mut canvas = Canvas::builder().build().expect("default config");
        canvas.finalize(&FooterSpec::new("X-3")).expect("finalize");

        assert!(crate::compose::paragraph(&mut canvas, "   ", None).is_err());
        assert!(crate::compose::info_grid(&mut canvas, &[], None).is_err());
        assert!(crate::compose::summary_box(&mut canvas, &[], None).is_err());
        assert!(crate::compose::metric_cards(&mut canvas, &[], None).is_err());
        let empty: [&str; 0] = [];
        assert!(draw_signature_block(&mut canvas, &SignatureBlock::new(empty), None).is_err());
    }

    #[test]
    fn watermark_only_during_finalizing() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let draft = Watermark::new("DRAFT");
        assert!(canvas.stamp_watermark(&draft).is_err());
        canvas.start_new_page(None).expect("composing");
        canvas.finalize(&FooterSpec::new("X-1")).expect("finalize");
        canvas.stamp_watermark(&draft).expect("finalizing");
        for page in &canvas.renderer().document().pages {
            assert!(page.commands.iter().any(|cmd| matches!(cmd, Command::Watermark(mark) if mark.text == "DRAFT")));
        }
    }

    #[test]
    fn signature_block_caps_labels_and_breaks_when_needed() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let room = canvas.remaining_height();
        canvas.advance(room - Pt::from_mm(5.0)).expect("composing");
        let fired = Cell::new(0);
        let cont = |_: &mut Canvas<Recorder>, _: &PageContext| fired.set(fired.get() + 1);
        let block = SignatureBlock::new(["Prepared by", "Approved by", "Client", "Witness"]);
        draw_signature_block(&mut canvas, &block, Some(&cont)).expect("fits on a fresh page");

        assert_eq!(canvas.page_number(), 2);
        assert_eq!(fired.get(), 1);
        let page = &canvas.renderer().document().pages[1];
        assert!(page.contains_text("Client"));
        assert!(!page.contains_text("Witness"));
    }
}
