use crate::backend::Renderer;
use crate::canvas::{Canvas, Phase};
use crate::error::EngineError;
use crate::metrics::DocumentMetrics;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::Path;

/// Finished document handed back to the template layer.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub filename: String,
    pub metrics: DocumentMetrics,
}

impl RenderedDocument {
    /// Writes the bytes to `path`, or to `path/<filename>` when `path` is a directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<std::path::PathBuf, EngineError> {
        let path = path.as_ref();
        let target = if path.is_dir() {
            path.join(&self.filename)
        } else {
            path.to_path_buf()
        };
        std::fs::write(&target, &self.bytes)?;
        log::debug!("wrote {} bytes to {}", self.bytes.len(), target.display());
        Ok(target)
    }

    /// `data:` URI suitable for opening the document in a viewer tab.
    pub fn data_uri(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:application/pdf;base64,{payload}")
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

/// `<document-type>-<number>.pdf`, lowercased and stripped of anything unsafe in a filename.
pub fn suggested_filename(document_type: &str, document_number: &str) -> String {
    let stem = slug::slugify(format!("{document_type} {document_number}"));
    if stem.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}

impl<R: Renderer> Canvas<R> {
    /// Serializes the finalized document. Consumes the session.
    pub fn finish(mut self, filename: impl Into<String>) -> Result<RenderedDocument, EngineError> {
        self.ensure_phase(Phase::Finalizing, "finish")?;
        self.phase = Phase::Output;
        let page_count = self.total_pages.unwrap_or_else(|| self.renderer.page_count());
        let bytes = self.renderer.finish()?;
        self.metrics.total_bytes = bytes.len();

        if let Some(logger) = &self.debug {
            logger.increment("pages", page_count as u64);
            logger.increment("bytes", bytes.len() as u64);
            logger.emit_summary("finish");
            logger.flush();
        }
        log::info!("rendered {page_count} pages, {} bytes", bytes.len());
        Ok(RenderedDocument {
            bytes,
            page_count,
            filename: filename.into(),
            metrics: self.metrics,
        })
    }
}
