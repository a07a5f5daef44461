mod backend;
mod canvas;
pub mod chrome;
pub mod compose;
mod config;
mod debug;
mod error;
mod font;
mod metrics;
mod output;
mod pagination;
mod pdf;
mod recorder;
pub mod table;
mod theme;
mod types;

pub use backend::{FontWeight, PaintMode, Renderer, TextAlign, WatermarkMark};
pub use canvas::{Canvas, OnPage, PageContext, Phase, Region, RegionStyle, TextSpec};
pub use chrome::{DocumentHeader, FooterSpec, SignatureBlock, Watermark};
pub use compose::{InfoField, MetricCard, SummaryEntry, SummaryRow};
pub use config::{CanvasBuilder, ThemeOverrides};
pub use debug::DebugLogger;
pub use error::EngineError;
pub use font::FontMetrics;
pub use metrics::{DocumentMetrics, PageMetrics};
pub use output::{RenderedDocument, suggested_filename};
pub use pdf::document_to_pdf;
pub use recorder::{Command, Document, Page, Recorder};
pub use table::{CellStyle, Column, GridTable, PageHook, RowSection, TableCapability, TableRow, TableSpec};
pub use theme::{PageGeometry, Palette, Spacing, StatusColors, Theme, Typography, normalize_status};
pub use types::{Color, Margins, Pt, Rect, Size};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn square_pages() -> Canvas {
        let margin = Pt::from_f32(30.0);
        Canvas::builder()
            .page_size(Size {
                width: Pt::from_f32(600.0),
                height: Pt::from_f32(800.0),
            })
            .margins(Margins {
                top: margin,
                right: margin,
                bottom: margin,
                left: margin,
            })
            .footer_reserve(Pt::from_f32(40.0))
            .build()
            .expect("valid geometry")
    }

    #[test]
    fn page_count_is_ceil_of_content_over_usable_height() {
        // Usable height is 800 - 30 - 40 - 30 = 700pt; blocks are 70pt.
        let block = Pt::from_f32(70.0);
        for blocks in 1..=35usize {
            let mut canvas = square_pages();
            assert_eq!(canvas.geometry().usable_height(false), Pt::from_f32(700.0));
            for _ in 0..blocks {
                canvas.check_page_break(block, None).expect("fits");
                canvas.advance(block).expect("composing");
            }
            assert_eq!(canvas.renderer().page_count(), blocks.div_ceil(10), "{blocks} blocks");
        }
    }

    #[test]
    fn continuation_fires_pages_minus_one_times_across_composers() {
        let fired = Cell::new(0usize);
        let header = DocumentHeader::new("Harbour Works Ltd", "Production Log", "PL-118");
        let continuation = chrome::continuation_header(&header);
        let counting = |canvas: &mut Canvas, ctx: &PageContext| {
            fired.set(fired.get() + 1);
            continuation(canvas, ctx);
        };

        let mut canvas = Canvas::builder().build().expect("default config");
        chrome::draw_first_page_header(&mut canvas, &header).expect("first header");
        for idx in 0..12 {
            compose::section_header(&mut canvas, &format!("Shift {idx}"), None, Some(&counting)).expect("fits");
            compose::metric_cards(
                &mut canvas,
                &[MetricCard::new("Output", "410").unit("units"), MetricCard::new("Scrap", "3")],
                Some(&counting),
            )
            .expect("fits");
            compose::banner(&mut canvas, "Line stopped 14:10-14:25", Some("on hold"), Some(&counting)).expect("fits");
        }
        let pages = canvas.renderer().page_count();
        assert!(pages >= 3);
        assert_eq!(fired.get(), pages - 1);
    }

    #[test]
    fn estimate_renders_end_to_end() {
        let header = DocumentHeader::new("Harbour Works Ltd", "Estimate", "EST-0042")
            .detail("4 Quay Street, Portside")
            .date("17 Oct 2026")
            .title("North wall repairs")
            .status("Approved");
        let continuation = chrome::continuation_header(&header);

        let mut canvas = Canvas::builder().title("EST-0042").build().expect("default config");
        chrome::draw_first_page_header(&mut canvas, &header).expect("first header");
        compose::section_header(&mut canvas, "Client", None, Some(&continuation)).expect("fits");
        compose::info_grid(
            &mut canvas,
            &[
                InfoField::new("Client", "Portside Council"),
                InfoField::new("Site", "North wall"),
                InfoField::optional("Contact", None),
                InfoField::new("Valid until", "16 Nov 2026").bold(),
                InfoField::new("Scope", "Repoint brickwork and replace coping stones").full_width(),
            ],
            Some(&continuation),
        )
        .expect("fits");

        compose::section_header(&mut canvas, "Line items", Some("Labour and materials"), Some(&continuation))
            .expect("fits");
        let rows = (1..=70)
            .map(|idx| {
                TableRow::new()
                    .cell("item", format!("Item {idx}"))
                    .cell("qty", "1")
                    .cell("amount", format!("{idx}.00"))
            })
            .collect();
        let spec = TableSpec::new(vec![
            Column::new("item", "Description", Pt::from_mm(120.0)),
            Column::new("qty", "Qty", Pt::from_mm(20.0)).align(TextAlign::Right),
            Column::new("amount", "Amount", Pt::from_mm(40.0)).align(TextAlign::Right),
        ])
        .rows(rows)
        .footer_rows(vec![TableRow::new().cell("item", "Total").cell("amount", "2,485.00")]);
        table::table(&mut canvas, &spec, Some(&continuation)).expect("rows fit");

        compose::summary_box(
            &mut canvas,
            &[
                SummaryRow::entry("Subtotal", "2,485.00"),
                SummaryRow::entry("VAT 20%", "497.00"),
                SummaryRow::Separator,
                SummaryRow::total("Total", "2,982.00"),
            ],
            Some(&continuation),
        )
        .expect("fits");
        compose::paragraph(&mut canvas, "Prices exclude scaffolding permits.", Some(&continuation)).expect("fits");
        chrome::draw_signature_block(
            &mut canvas,
            &SignatureBlock::new(["Prepared by", "Accepted by"]),
            Some(&continuation),
        )
        .expect("fits");

        let pages = canvas.finalize(&FooterSpec::new("EST-0042").issuer("Harbour Works Ltd")).expect("finalize");
        assert!(pages >= 2);
        assert!(compose::section_header(&mut canvas, "Late", None, None).is_err());
        canvas.stamp_watermark(&Watermark::new("DRAFT")).expect("watermark");

        for (idx, page) in canvas.renderer().document().pages.iter().enumerate() {
            assert!(page.contains_text(&chrome::page_indicator(idx + 1, pages)));
            if idx > 0 {
                assert!(page.contains_text("ESTIMATE EST-0042"));
            }
        }

        let rendered = canvas
            .finish(suggested_filename("Estimate", "EST-0042"))
            .expect("serialize");
        assert_eq!(rendered.filename, "estimate-est-0042.pdf");
        assert_eq!(rendered.page_count, pages);
        assert_eq!(rendered.metrics.pages.len(), pages);
        assert!(rendered.metrics.page_breaks >= 1);

        let parsed = lopdf::Document::load_mem(&rendered.bytes).expect("valid pdf");
        assert_eq!(parsed.get_pages().len(), pages);
    }
}
