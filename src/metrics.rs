use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PageMetrics {
    pub page_number: usize,
    /// Composer calls whose block started on this page. Rows and lines carried onto
    /// later pages are not counted again.
    pub blocks: usize,
    pub compose_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub page_breaks: usize,
    /// Tables that continued onto at least one further page.
    pub split_tables: usize,
    pub compose_ms: f64,
    pub total_bytes: usize,
}

impl DocumentMetrics {
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|page| page.blocks).sum()
    }
}
