//! Vertical flow control. Every composer asks here before drawing a block.

use crate::backend::Renderer;
use crate::canvas::{Canvas, OnPage, PageContext, Phase};
use crate::error::EngineError;
use crate::types::Pt;
use serde_json::json;

impl<R: Renderer> Canvas<R> {
    /// Space left between the cursor and the break limit.
    pub fn remaining_height(&self) -> Pt {
        (self.geometry().break_limit() - self.cursor_y).max(Pt::ZERO)
    }

    /// Starts a new page if a block of `needed` height does not fit below the cursor.
    ///
    /// Returns whether a break happened. When `on_page` is given it is invoked exactly
    /// once on the new page and the cursor is placed below the chrome it draws.
    pub fn check_page_break(&mut self, needed: Pt, on_page: Option<&OnPage<'_, R>>) -> Result<bool, EngineError> {
        self.break_for("block", needed, on_page)
    }

    pub(crate) fn break_for(
        &mut self,
        block: &'static str,
        needed: Pt,
        on_page: Option<&OnPage<'_, R>>,
    ) -> Result<bool, EngineError> {
        self.ensure_phase(Phase::Composing, "check_page_break")?;
        if self.cursor_y + needed <= self.geometry().break_limit() {
            return Ok(false);
        }
        let usable = self.geometry().usable_height(on_page.is_some());
        if needed > usable {
            return Err(EngineError::LayoutOverflow { block, needed, usable });
        }
        self.open_page(block, on_page);
        Ok(true)
    }

    /// Breaks unconditionally.
    pub fn start_new_page(&mut self, on_page: Option<&OnPage<'_, R>>) -> Result<(), EngineError> {
        self.ensure_phase(Phase::Composing, "start_new_page")?;
        self.open_page("explicit", on_page);
        Ok(())
    }

    /// Breaks if needed, then returns the y at which a block of `height` should be drawn.
    /// Counts one block against the page it lands on.
    pub(crate) fn reserve(
        &mut self,
        block: &'static str,
        height: Pt,
        on_page: Option<&OnPage<'_, R>>,
    ) -> Result<Pt, EngineError> {
        let top = self.reserve_more(block, height, on_page)?;
        self.page_blocks += 1;
        Ok(top)
    }

    /// Like [`reserve`](Self::reserve) for the later rows or lines of a block already counted.
    pub(crate) fn reserve_more(
        &mut self,
        block: &'static str,
        height: Pt,
        on_page: Option<&OnPage<'_, R>>,
    ) -> Result<Pt, EngineError> {
        self.break_for(block, height, on_page)?;
        Ok(self.cursor_y)
    }

    /// Moves the cursor below a block drawn at `top` plus the standard block gap.
    pub(crate) fn commit(&mut self, top: Pt, height: Pt) {
        let gap = self.geometry().block_gap;
        self.advance_to(top + height + gap);
    }

    fn open_page(&mut self, reason: &str, on_page: Option<&OnPage<'_, R>>) {
        let from_page = self.page_number;
        self.close_page_metrics();
        let geometry = *self.geometry();
        self.renderer.add_page(geometry.page_size);
        self.page_number += 1;
        self.cursor_y = geometry.margins.top;
        self.metrics.page_breaks += 1;

        log::debug!(
            "page break {} -> {} ({reason}, cursor reset to {})",
            from_page,
            self.page_number,
            geometry.resume_y(on_page.is_some())
        );
        if let Some(logger) = &self.debug {
            logger.event(
                "page_break",
                json!({
                    "from_page": from_page,
                    "to_page": self.page_number,
                    "reason": reason,
                    "continuation_header": on_page.is_some(),
                }),
            );
            logger.increment("page_break", 1);
        }

        if let Some(callback) = on_page {
            let ctx = PageContext {
                page_number: self.page_number,
                top: geometry.margins.top,
                height: geometry.continuation_header_height,
            };
            callback(self, &ctx);
        }
        self.cursor_y = geometry.resume_y(on_page.is_some());
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::Renderer;
    use crate::canvas::{Canvas, PageContext};
    use crate::error::EngineError;
    use crate::recorder::Recorder;
    use crate::types::Pt;
    use std::cell::Cell;

    fn place_blocks(canvas: &mut Canvas, count: usize, height: Pt) -> Vec<usize> {
        let mut pages = Vec::new();
        for _ in 0..count {
            canvas.check_page_break(height, None).expect("fits on a page");
            pages.push(canvas.page_number());
            canvas.advance(height).expect("composing");
        }
        pages
    }

    #[test]
    fn blocks_of_31mm_put_eight_on_the_first_page() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let pages = place_blocks(&mut canvas, 10, Pt::from_mm(31.0));
        assert_eq!(pages.iter().filter(|page| **page == 1).count(), 8);
        assert_eq!(canvas.renderer().page_count(), 2);
    }

    #[test]
    fn block_that_fits_exactly_does_not_break() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let room = canvas.remaining_height();
        assert!(!canvas.check_page_break(room, None).expect("fits"));
        assert_eq!(canvas.page_number(), 1);
        canvas.advance(room).expect("composing");
        assert!(canvas.check_page_break(Pt::from_milli(1), None).expect("breaks"));
        assert_eq!(canvas.page_number(), 2);
    }

    #[test]
    fn continuation_header_runs_once_per_new_page() {
        let calls = Cell::new(0usize);
        let seen = std::cell::RefCell::new(Vec::new());
        let header = |canvas: &mut Canvas<Recorder>, ctx: &PageContext| {
            calls.set(calls.get() + 1);
            seen.borrow_mut().push((ctx.page_number, canvas.cursor_y()));
        };
        let mut canvas = Canvas::builder().build().expect("default config");
        let block = Pt::from_mm(50.0);
        for _ in 0..12 {
            canvas.check_page_break(block, Some(&header)).expect("fits");
            canvas.advance(block).expect("composing");
        }
        let pages = canvas.renderer().page_count();
        assert!(pages > 2);
        assert_eq!(calls.get(), pages - 1);
        for (idx, (page, cursor)) in seen.borrow().iter().enumerate() {
            assert_eq!(*page, idx + 2);
            assert_eq!(*cursor, canvas.geometry().margins.top);
        }
    }

    #[test]
    fn cursor_resumes_below_the_continuation_chrome() {
        let mut canvas = Canvas::builder().build().expect("default config");
        let noop = |_: &mut Canvas<Recorder>, _: &PageContext| {};
        canvas.start_new_page(Some(&noop)).expect("composing");
        assert_eq!(canvas.cursor_y(), canvas.geometry().resume_y(true));
        canvas.start_new_page(None).expect("composing");
        assert_eq!(canvas.cursor_y(), canvas.geometry().margins.top);
        assert_eq!(canvas.metrics().page_breaks, 2);
    }

    #[test]
    fn block_taller_than_a_page_is_rejected() {
        let mut canvas = Canvas::builder().build().expect("default config");
        canvas.advance(Pt::from_mm(100.0)).expect("composing");
        let err = canvas
            .check_page_break(Pt::from_mm(400.0), None)
            .expect_err("cannot fit anywhere");
        assert!(matches!(err, EngineError::LayoutOverflow { .. }));
        assert_eq!(canvas.page_number(), 1);
    }
}
