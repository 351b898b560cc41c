//! Batch driver.
//!
//! Runs every discovered document through text-layer detection, OCR and
//! naming, one at a time, and writes one output file per success. A failed
//! document is counted and logged; it never stops the batch.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::document::{Document, DocumentKind, ExtractionResult, TextSource};
use crate::error::{ConvertError, Result};
use crate::naming::{derive_name, sanitize_filename, unique_output_path, NamingPolicy};
use crate::ocr::invoker::OcrInvoker;
use crate::ocr::select::select_backend;
use crate::ocr::{BackendChoice, BackendKind, OcrProvider};
use crate::text_layer;

const PROVENANCE_PREFIX: &str = "<!-- source: ";
const PROVENANCE_SUFFIX: &str = " -->";
/// Plain-text outputs get a bare header line instead of an HTML comment.
const TXT_PROVENANCE_PREFIX: &str = "source: ";

/// Per-document lifecycle. `Saved`, `Failed` and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocState {
    Pending,
    Extracting,
    Done,
    OcrPending,
    OcrDone,
    Named,
    Saved,
    Failed,
    Skipped,
}

impl DocState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocState::Saved | DocState::Failed | DocState::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Md,
    Txt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Md => "md",
            OutputFormat::Txt => "txt",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches('.') {
            "md" | "markdown" => Ok(Self::Md),
            "txt" | "text" => Ok(Self::Txt),
            other => Err(format!("unknown output format '{}' (expected md or txt)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub skip_existing: bool,
    pub force_ocr: bool,
    pub naming: NamingPolicy,
    pub format: OutputFormat,
    pub backend: BackendChoice,
}

/// Final state of one document.
#[derive(Debug, Clone)]
pub struct DocReport {
    pub source_key: String,
    pub state: DocState,
    pub source: Option<TextSource>,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl fmt::Display for DocReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.state, &self.output, &self.error) {
            (DocState::Saved, Some(out), _) => {
                let name = out.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                match self.source {
                    Some(source) => write!(f, "[saved] {} -> {} ({})", self.source_key, name, source),
                    None => write!(f, "[saved] {} -> {}", self.source_key, name),
                }
            }
            (DocState::Skipped, _, _) => write!(f, "[skipped] {} (output exists)", self.source_key),
            (_, _, Some(err)) => write!(f, "[failed] {}: {}", self.source_key, err),
            (state, _, None) => write!(f, "[{:?}] {}", state, self.source_key),
        }
    }
}

/// Counters for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub text_layer: usize,
    pub ocr: usize,
    pub saved: usize,
    pub failed: usize,
    pub skipped: usize,
    pub ocr_calls: BTreeMap<BackendKind, usize>,
    pub compressions: usize,
    pub reports: Vec<DocReport>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total_ocr_calls(&self) -> usize {
        self.ocr_calls.values().sum()
    }

    pub fn log(&self) {
        info!(
            "Summary: {} documents, {} saved, {} failed, {} skipped",
            self.total, self.saved, self.failed, self.skipped
        );
        info!(
            "  text layer: {}, ocr: {}, compressed images: {}",
            self.text_layer, self.ocr, self.compressions
        );
        for (kind, calls) in &self.ocr_calls {
            info!("  {} calls: {}", kind, calls);
        }
        for report in self.reports.iter().filter(|r| r.state == DocState::Failed) {
            warn!("  {}", report);
        }
    }
}

/// Source keys recorded in the provenance header of existing outputs.
pub fn scan_provenance(output_dir: &Path) -> HashSet<String> {
    let mut sources = HashSet::new();
    let entries = match std::fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(_) => return sources,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse::<OutputFormat>().ok());
        let Some(format) = format else { continue };
        if !path.is_file() {
            continue;
        }
        if let Some(source) = read_provenance(&path, format) {
            sources.insert(source);
        }
    }
    debug!("{} existing outputs in {}", sources.len(), output_dir.display());
    sources
}

fn read_provenance(path: &Path, format: OutputFormat) -> Option<String> {
    let file = std::fs::File::open(path).ok()?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).ok()?;
    let first = first.trim_end();
    let source = match format {
        OutputFormat::Md => first
            .strip_prefix(PROVENANCE_PREFIX)?
            .strip_suffix(PROVENANCE_SUFFIX)?,
        OutputFormat::Txt => first.strip_prefix(TXT_PROVENANCE_PREFIX)?,
    };
    Some(source.to_string())
}

fn render_output(format: OutputFormat, source_key: &str, text: &str) -> String {
    let header = match format {
        OutputFormat::Md => format!("{}{}{}", PROVENANCE_PREFIX, source_key, PROVENANCE_SUFFIX),
        OutputFormat::Txt => format!("{}{}", TXT_PROVENANCE_PREFIX, source_key),
    };
    format!("{}\n\n{}\n", header, text.trim_end())
}

/// Write via a temp file in the same directory, then rename into place.
/// Refuses to overwrite an existing file.
fn write_atomic(target: &Path, content: &str) -> Result<()> {
    let dir = target.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(target).map_err(|e| ConvertError::Io(e.error))?;
    Ok(())
}

pub struct BatchDriver<'a> {
    providers: &'a [Box<dyn OcrProvider>],
    available: Vec<BackendKind>,
    invoker: OcrInvoker<'a>,
    options: BatchOptions,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        providers: &'a [Box<dyn OcrProvider>],
        invoker: OcrInvoker<'a>,
        options: BatchOptions,
    ) -> Self {
        let available = providers.iter().map(|p| p.kind()).collect();
        Self {
            providers,
            available,
            invoker,
            options,
        }
    }

    /// Process `docs` in order. Only failing to create the output directory
    /// is an error; per-document failures land in the summary.
    pub async fn run(&mut self, docs: Vec<Document>) -> Result<BatchSummary> {
        std::fs::create_dir_all(&self.options.output_dir)?;
        let existing = if self.options.skip_existing {
            scan_provenance(&self.options.output_dir)
        } else {
            HashSet::new()
        };

        let mut summary = BatchSummary {
            total: docs.len(),
            ..Default::default()
        };
        info!(
            "Processing {} documents into {}",
            docs.len(),
            self.options.output_dir.display()
        );

        for (index, mut doc) in docs.into_iter().enumerate() {
            debug!(
                "[{}/{}] {} ({} bytes)",
                index + 1,
                summary.total,
                doc.source_key,
                doc.size
            );
            let report = if existing.contains(&doc.source_key) {
                self.skipped(&doc)
            } else {
                self.process(&mut doc, &mut summary).await
            };

            match report.state {
                DocState::Saved => {
                    summary.saved += 1;
                    info!("{}", report);
                }
                DocState::Skipped => {
                    summary.skipped += 1;
                    info!("{}", report);
                }
                _ => {
                    summary.failed += 1;
                    error!("{}", report);
                }
            }
            debug_assert!(report.state.is_terminal());
            summary.reports.push(report);
        }

        summary.log();
        Ok(summary)
    }

    fn skipped(&self, doc: &Document) -> DocReport {
        let mut state = DocState::Pending;
        transition(&mut state, DocState::Skipped, &doc.source_key);
        DocReport {
            source_key: doc.source_key.clone(),
            state,
            source: None,
            output: None,
            error: None,
        }
    }

    async fn process(&mut self, doc: &mut Document, summary: &mut BatchSummary) -> DocReport {
        let mut state = DocState::Pending;
        let mut report = DocReport {
            source_key: doc.source_key.clone(),
            state,
            source: None,
            output: None,
            error: None,
        };

        match self.convert(doc, &mut state, summary).await {
            Ok((result, output)) => {
                report.source = Some(result.source);
                report.output = Some(output);
            }
            Err(e) => {
                transition(&mut state, DocState::Failed, &doc.source_key);
                report.error = Some(e.to_string());
            }
        }
        report.state = state;
        report
    }

    async fn convert(
        &mut self,
        doc: &mut Document,
        state: &mut DocState,
        summary: &mut BatchSummary,
    ) -> Result<(ExtractionResult, PathBuf)> {
        transition(state, DocState::Extracting, &doc.source_key);
        let data = tokio::fs::read(&doc.path).await?;

        let mut page_count = None;
        let mut result = None;
        if doc.kind == DocumentKind::Pdf {
            if self.options.force_ocr {
                page_count = text_layer::page_count(&data);
            } else {
                match text_layer::extract_text_layer(&data) {
                    Ok(layer) => {
                        let usable = layer.is_usable();
                        doc.has_text_layer = Some(usable);
                        page_count = Some(layer.page_count());
                        if usable {
                            result = Some(ExtractionResult {
                                text: layer.joined(),
                                source: TextSource::TextLayer,
                                confidence: None,
                                pages: layer.page_count(),
                            });
                        } else {
                            debug!(
                                "{}: text layer too sparse ({:.1} chars/page)",
                                doc.source_key,
                                layer.avg_chars_per_page()
                            );
                        }
                    }
                    Err(e) => {
                        debug!("{}: {}, falling back to OCR", doc.source_key, e);
                        doc.has_text_layer = Some(false);
                    }
                }
            }
        }

        let result = match result {
            Some(result) => {
                transition(state, DocState::Done, &doc.source_key);
                summary.text_layer += 1;
                result
            }
            None => {
                transition(state, DocState::OcrPending, &doc.source_key);
                let result = self.recognize(doc, data, page_count, summary).await?;
                transition(state, DocState::OcrDone, &doc.source_key);
                summary.ocr += 1;
                result
            }
        };

        debug!(
            "{}: {} pages via {} (text layer: {:?}, confidence: {:?})",
            doc.source_key,
            result.pages,
            result.source,
            doc.has_text_layer,
            result.confidence
        );

        let stem = match self.options.naming {
            NamingPolicy::Smart => derive_name(&result.text, &doc.stem()),
            NamingPolicy::Stem => sanitize_filename(&doc.stem()),
        };
        let output = unique_output_path(
            &self.options.output_dir,
            &stem,
            self.options.format.extension(),
        );
        transition(state, DocState::Named, &doc.source_key);

        let content = render_output(self.options.format, &doc.source_key, &result.text);
        write_atomic(&output, &content)?;
        transition(state, DocState::Saved, &doc.source_key);
        Ok((result, output))
    }

    async fn recognize(
        &mut self,
        doc: &Document,
        data: Vec<u8>,
        page_count: Option<usize>,
        summary: &mut BatchSummary,
    ) -> Result<ExtractionResult> {
        let kind = select_backend(self.options.backend, &doc.file_name(), &self.available)?;
        let provider = self
            .providers
            .iter()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| ConvertError::Config(format!("backend {} not initialised", kind)))?;
        debug!("{}: using {}", doc.source_key, kind);

        let before = self.invoker.calls_made();
        let outcome = self
            .invoker
            .invoke(provider.as_ref(), doc, data, page_count)
            .await;
        // Failed documents still spent their calls
        *summary.ocr_calls.entry(kind).or_default() += self.invoker.calls_made() - before;

        let outcome = outcome?;
        summary.compressions += outcome.compressions;
        Ok(ExtractionResult {
            text: outcome.text(),
            source: TextSource::Ocr(kind),
            confidence: outcome.confidence,
            pages: outcome.pages.len(),
        })
    }
}

fn transition(state: &mut DocState, next: DocState, source_key: &str) {
    debug!("{}: {:?} -> {:?}", source_key, state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::discover;
    use crate::ocr::compress::tests::noisy_png;
    use crate::ocr::invoker::tests::{text_reply, FakeRasterizer, MockProvider};
    use crate::ocr::registry::ProviderLimits;
    use crate::ocr::OcrOutput;
    use crate::text_layer::tests::{build_pdf, LONG_LINE};
    use crate::text_layer::PAGE_BREAK;
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(output_dir: &Path) -> BatchOptions {
        BatchOptions {
            output_dir: output_dir.to_path_buf(),
            skip_existing: false,
            force_ocr: false,
            naming: NamingPolicy::Smart,
            format: OutputFormat::Md,
            backend: BackendChoice::Auto,
        }
    }

    fn boxed(provider: MockProvider) -> Vec<Box<dyn OcrProvider>> {
        let provider: Box<dyn OcrProvider> = Box::new(provider);
        vec![provider]
    }

    async fn run_batch(
        providers: &[Box<dyn OcrProvider>],
        raster: &FakeRasterizer,
        input: &Path,
        opts: BatchOptions,
    ) -> BatchSummary {
        let docs = discover(input, false, &opts.output_dir).unwrap();
        let invoker = OcrInvoker::new(raster, 200, Duration::ZERO);
        let mut driver = BatchDriver::new(providers, invoker, opts);
        driver.run(docs).await.unwrap()
    }

    fn outputs(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn body(path: &Path) -> String {
        let content = std::fs::read_to_string(path).unwrap();
        let (_, rest) = content.split_once("\n\n").unwrap();
        rest.trim_end().to_string()
    }

    #[tokio::test]
    async fn test_scanned_pdf_named_from_first_line() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("markdown_output");
        std::fs::write(input.path().join("scan.pdf"), build_pdf(&["", "", ""])).unwrap();

        let provider = MockProvider::new(BackendKind::Baidu, |n, _| {
            let text = if n == 0 {
                "Site Inspection Notes\nBuilding A, level 2".to_string()
            } else {
                format!("continued on page {}", n + 1)
            };
            Ok(OcrOutput {
                pages: vec![text],
                confidence: Some(0.95),
            })
        });
        let providers = boxed(provider);
        let raster = FakeRasterizer::new(3);
        let summary = run_batch(&providers, &raster, input.path(), options(&out)).await;

        assert_eq!(summary.saved, 1);
        assert_eq!(summary.ocr, 1);
        assert_eq!(summary.ocr_calls[&BackendKind::Baidu], 3);
        assert_eq!(outputs(&out), vec!["Site_Inspection_Notes.md"]);

        let text = body(&out.join("Site_Inspection_Notes.md"));
        assert_eq!(text.matches(PAGE_BREAK).count(), 2);
        assert!(text.ends_with("continued on page 3"));
    }

    #[tokio::test]
    async fn test_text_layer_passthrough_makes_no_calls() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        let pdf = build_pdf(&[LONG_LINE, LONG_LINE]);
        std::fs::write(input.path().join("plant.pdf"), &pdf).unwrap();

        let providers = boxed(MockProvider::new(BackendKind::OcrSpace, text_reply("never")));
        let raster = FakeRasterizer::new(2);
        let mut opts = options(&out);
        opts.naming = NamingPolicy::Stem;
        let summary = run_batch(&providers, &raster, input.path(), opts).await;

        assert_eq!(summary.text_layer, 1);
        assert_eq!(summary.total_ocr_calls(), 0);
        assert_eq!(summary.reports[0].source, Some(TextSource::TextLayer));

        let expected = text_layer::extract_text_layer(&pdf).unwrap().joined();
        assert_eq!(body(&out.join("plant.md")), expected.trim_end());
    }

    #[tokio::test]
    async fn test_unparseable_pdf_falls_back_to_ocr() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        std::fs::write(input.path().join("broken.pdf"), b"%PDF-1.4 garbage").unwrap();

        let providers = boxed(MockProvider::new(BackendKind::Baidu, text_reply("Recovered Title text")));
        let raster = FakeRasterizer::new(2);
        let summary = run_batch(&providers, &raster, input.path(), options(&out)).await;

        assert_eq!(summary.saved, 1);
        assert_eq!(summary.text_layer, 0);
        assert_eq!(summary.ocr, 1);
        assert_eq!(summary.ocr_calls[&BackendKind::Baidu], 2);
        assert_eq!(summary.reports[0].source, Some(TextSource::Ocr(BackendKind::Baidu)));
        assert_eq!(outputs(&out), vec!["Recovered_Title_text.md"]);
    }

    #[tokio::test]
    async fn test_force_ocr_ignores_text_layer() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        std::fs::write(input.path().join("plant.pdf"), build_pdf(&[LONG_LINE, LONG_LINE])).unwrap();

        let providers = boxed(MockProvider::new(BackendKind::Baidu, text_reply("recognized page text")));
        let raster = FakeRasterizer::new(2);
        let mut opts = options(&out);
        opts.force_ocr = true;
        let summary = run_batch(&providers, &raster, input.path(), opts).await;

        assert_eq!(summary.text_layer, 0);
        assert_eq!(summary.ocr, 1);
        assert_eq!(summary.total_ocr_calls(), 2);
    }

    #[tokio::test]
    async fn test_oversized_image_compressed_then_one_call() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        std::fs::write(input.path().join("photo.png"), noisy_png(640)).unwrap();

        let limit = 256 * 1024;
        let provider = MockProvider::new(BackendKind::OcrSpace, text_reply("Delivery receipt 0042"))
            .with_limits(ProviderLimits {
                max_bytes: limit,
                native_pdf_pages: None,
            });
        let providers = boxed(provider);
        let raster = FakeRasterizer::new(0);
        let summary = run_batch(&providers, &raster, input.path(), options(&out)).await;

        assert_eq!(summary.compressions, 1);
        assert_eq!(summary.total_ocr_calls(), 1);
        assert_eq!(outputs(&out), vec!["Delivery_receipt_0042.md"]);
    }

    #[tokio::test]
    async fn test_identical_names_get_suffix() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        std::fs::write(input.path().join("a.png"), b"img-a").unwrap();
        std::fs::write(input.path().join("b.png"), b"img-b").unwrap();

        let providers = boxed(MockProvider::new(BackendKind::OcrSpace, text_reply("Meeting Minutes\nagenda")));
        let raster = FakeRasterizer::new(0);
        let summary = run_batch(&providers, &raster, input.path(), options(&out)).await;

        assert_eq!(summary.saved, 2);
        assert_eq!(outputs(&out), vec!["Meeting_Minutes.md", "Meeting_Minutes_1.md"]);
    }

    #[tokio::test]
    async fn test_failure_is_counted_and_batch_continues() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        std::fs::write(input.path().join("a.png"), b"img-a").unwrap();
        std::fs::write(input.path().join("b.png"), b"img-b").unwrap();

        let provider = MockProvider::new(BackendKind::OcrSpace, |n, _| {
            if n == 0 {
                Err(ConvertError::Provider {
                    backend: BackendKind::OcrSpace,
                    code: "99".to_string(),
                    message: "quota exceeded".to_string(),
                })
            } else {
                Ok(OcrOutput {
                    pages: vec!["Second document title".to_string()],
                    confidence: None,
                })
            }
        });
        let providers = boxed(provider);
        let raster = FakeRasterizer::new(0);
        let summary = run_batch(&providers, &raster, input.path(), options(&out)).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.saved, 1);
        assert!(!summary.is_success());
        assert_eq!(summary.reports[0].state, DocState::Failed);
        assert!(summary.reports[0].error.as_deref().unwrap().contains("quota exceeded"));
        // no partial output for the failed document
        assert_eq!(outputs(&out), vec!["Second_document_title.md"]);
    }

    #[tokio::test]
    async fn test_skip_existing_is_idempotent() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        std::fs::write(input.path().join("scan.pdf"), build_pdf(&[""])).unwrap();
        std::fs::write(input.path().join("photo.jpg"), b"jpeg").unwrap();

        let raster = FakeRasterizer::new(1);
        let first = boxed(MockProvider::new(BackendKind::Baidu, text_reply("Warehouse stock list")));
        let summary = run_batch(&first, &raster, input.path(), options(&out)).await;
        assert_eq!(summary.saved, 2);

        let second = MockProvider::new(BackendKind::Baidu, text_reply("unexpected"));
        let providers = boxed(second);
        let mut opts = options(&out);
        opts.skip_existing = true;
        let rerun = run_batch(&providers, &raster, input.path(), opts).await;

        assert_eq!(rerun.skipped, 2);
        assert_eq!(rerun.saved, 0);
        assert_eq!(rerun.total_ocr_calls(), 0);
        assert!(rerun.reports.iter().all(|r| r.state == DocState::Skipped));
        assert_eq!(outputs(&out).len(), 2);
    }

    #[tokio::test]
    async fn test_txt_format_and_stem_naming() {
        let input = TempDir::new().unwrap();
        let out = input.path().join("out");
        std::fs::write(input.path().join("IMG 0042.png"), b"img").unwrap();

        let providers = boxed(MockProvider::new(BackendKind::OcrSpace, text_reply("Some heading here")));
        let raster = FakeRasterizer::new(0);
        let mut opts = options(&out);
        opts.format = OutputFormat::Txt;
        opts.naming = NamingPolicy::Stem;
        run_batch(&providers, &raster, input.path(), opts.clone()).await;

        assert_eq!(outputs(&out), vec!["IMG_0042.txt"]);
        let content = std::fs::read_to_string(out.join("IMG_0042.txt")).unwrap();
        assert!(content.starts_with("source: IMG 0042.png\n\n"));
        assert!(!content.contains("<!--"));

        opts.skip_existing = true;
        let rerun = run_batch(&providers, &raster, input.path(), opts).await;
        assert_eq!(rerun.skipped, 1);
        assert_eq!(rerun.total_ocr_calls(), 0);
    }

    #[test]
    fn test_scan_provenance_reads_header_only() {
        let dir = TempDir::new().unwrap();
        let md = render_output(OutputFormat::Md, "sub/scan.pdf", "text");
        let txt = render_output(OutputFormat::Txt, "photo.jpg", "text");
        std::fs::write(dir.path().join("a.md"), &md).unwrap();
        std::fs::write(dir.path().join("b.md"), "# hand written\n").unwrap();
        std::fs::write(dir.path().join("c.json"), &md).unwrap();
        std::fs::write(dir.path().join("d.txt"), &txt).unwrap();
        // plain header only counts in .txt files
        std::fs::write(dir.path().join("e.md"), &txt.replace("photo", "other")).unwrap();

        let sources = scan_provenance(dir.path());
        assert_eq!(sources.len(), 2);
        assert!(sources.contains("sub/scan.pdf"));
        assert!(sources.contains("photo.jpg"));
        assert!(scan_provenance(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_write_atomic_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.md");
        write_atomic(&target, "first").unwrap();
        assert!(write_atomic(&target, "second").is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "first");
        assert_eq!(outputs(dir.path()), vec!["a.md"]);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Md);
        assert_eq!(".TXT".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert!("docx".parse::<OutputFormat>().is_err());
    }
}
