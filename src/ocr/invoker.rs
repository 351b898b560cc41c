//! Sends a document to a provider, one call per image or rasterized page.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use super::compress::{compress_to_fit, jpeg_file_name};
use super::raster::PageRasterizer;
use super::{OcrInput, OcrOutput, OcrProvider};
use crate::document::{Document, DocumentKind};
use crate::error::{ConvertError, Result};
use crate::text_layer::PAGE_BREAK;

/// Recognized text for one document plus what it cost.
#[derive(Debug, Clone, Default)]
pub struct OcrOutcome {
    pub pages: Vec<String>,
    pub confidence: Option<f64>,
    pub calls: usize,
    pub compressions: usize,
}

impl OcrOutcome {
    pub fn text(&self) -> String {
        self.pages.join(PAGE_BREAK)
    }
}

/// Drives provider calls for whole documents. Calls are strictly sequential;
/// a fixed courtesy delay separates consecutive calls for the whole run.
pub struct OcrInvoker<'a> {
    rasterizer: &'a dyn PageRasterizer,
    dpi: u32,
    delay: Duration,
    calls_made: usize,
}

impl<'a> OcrInvoker<'a> {
    pub fn new(rasterizer: &'a dyn PageRasterizer, dpi: u32, delay: Duration) -> Self {
        Self {
            rasterizer,
            dpi,
            delay,
            calls_made: 0,
        }
    }

    /// Total provider calls issued so far.
    pub fn calls_made(&self) -> usize {
        self.calls_made
    }

    /// Recognize `doc`, whose bytes are `data`.
    ///
    /// `page_count` is the parsed PDF page count when known; PDFs of unknown
    /// length are always rasterized.
    pub async fn invoke(
        &mut self,
        provider: &dyn OcrProvider,
        doc: &Document,
        data: Vec<u8>,
        page_count: Option<usize>,
    ) -> Result<OcrOutcome> {
        let mut outcome = OcrOutcome::default();
        let mut confidences = Vec::new();

        match doc.kind {
            DocumentKind::Image => {
                let out = self
                    .recognize_image(provider, doc.file_name(), data, &mut outcome)
                    .await?;
                confidences.extend(out.confidence);
                outcome.pages.push(out.pages.join("\n"));
            }
            DocumentKind::Pdf => {
                let limits = provider.limits();
                let native = match (limits.native_pdf_pages, page_count) {
                    (Some(max), Some(n)) => n <= max && data.len() <= limits.max_bytes,
                    _ => false,
                };

                if native {
                    debug!("{}: sending PDF natively to {}", doc.file_name(), provider.kind());
                    let input = OcrInput::Pdf {
                        file_name: doc.file_name(),
                        data,
                    };
                    let out = self.call(provider, &input, &mut outcome).await?;
                    confidences.extend(out.confidence);
                    outcome.pages.extend(out.pages);
                } else {
                    drop(data);
                    self.recognize_pages(provider, &doc.path, &mut outcome, &mut confidences)
                        .await?;
                }
            }
        }

        if outcome.pages.iter().all(|p| p.trim().is_empty()) {
            return Err(ConvertError::EmptyResult {
                backend: provider.kind(),
            });
        }
        if !confidences.is_empty() {
            outcome.confidence = Some(confidences.iter().sum::<f64>() / confidences.len() as f64);
        }
        Ok(outcome)
    }

    /// Rasterize every page into a scratch directory and recognize each one.
    async fn recognize_pages(
        &mut self,
        provider: &dyn OcrProvider,
        pdf_path: &Path,
        outcome: &mut OcrOutcome,
        confidences: &mut Vec<f64>,
    ) -> Result<()> {
        // Removed on drop; cleanup failures are ignored
        let scratch = tempfile::Builder::new().prefix("scan2md-").tempdir()?;
        let images = self
            .rasterizer
            .rasterize(pdf_path, self.dpi, scratch.path())
            .await?;
        let total = images.len();
        info!("{}: {} pages to recognize", pdf_path.display(), total);

        for (index, image_path) in images.iter().enumerate() {
            let data = tokio::fs::read(image_path).await?;
            let _ = tokio::fs::remove_file(image_path).await;

            let name = image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("page-{}.png", index + 1));
            let out = self.recognize_image(provider, name, data, outcome).await?;
            debug!("page {}/{}: {} chars", index + 1, total, out.pages.iter().map(|p| p.len()).sum::<usize>());
            confidences.extend(out.confidence);
            outcome.pages.push(out.pages.join("\n"));
        }
        Ok(())
    }

    /// Fit one image under the provider ceiling (one compression attempt) and recognize it.
    async fn recognize_image(
        &mut self,
        provider: &dyn OcrProvider,
        file_name: String,
        data: Vec<u8>,
        outcome: &mut OcrOutcome,
    ) -> Result<OcrOutput> {
        let limit = provider.limits().max_bytes;
        let input = if data.len() > limit {
            info!(
                "{}: {} bytes over {} limit of {}, compressing",
                file_name,
                data.len(),
                provider.kind(),
                limit
            );
            outcome.compressions += 1;
            OcrInput::Image {
                file_name: jpeg_file_name(&file_name),
                data: compress_to_fit(&data, limit)?,
            }
        } else {
            OcrInput::Image { file_name, data }
        };
        self.call(provider, &input, outcome).await
    }

    async fn call(
        &mut self,
        provider: &dyn OcrProvider,
        input: &OcrInput,
        outcome: &mut OcrOutcome,
    ) -> Result<OcrOutput> {
        if self.calls_made > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls_made += 1;
        outcome.calls += 1;
        provider.recognize(input).await
    }
}
