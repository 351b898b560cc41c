//! Input documents and the text produced for them.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ocr::BackendKind;

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Detect the kind from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if PDF_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// A file discovered by the batch driver.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    /// Path relative to the input root with `/` separators. Recorded in the
    /// output's provenance header.
    pub source_key: String,
    pub kind: DocumentKind,
    pub size: u64,
    /// Set once the text-layer check has run.
    pub has_text_layer: Option<bool>,
}

impl Document {
    pub fn new(path: PathBuf, root: &Path) -> Option<Self> {
        let kind = DocumentKind::from_path(&path)?;
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let source_key = if relative.as_os_str().is_empty() {
            // root was the file itself
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        };
        Some(Self {
            path,
            source_key,
            kind,
            size,
            has_text_layer: None,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }
}

/// Where the final text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    TextLayer,
    Ocr(BackendKind),
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::TextLayer => f.write_str("text layer"),
            TextSource::Ocr(kind) => write!(f, "ocr:{}", kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub source: TextSource,
    pub confidence: Option<f64>,
    pub pages: usize,
}

/// Enumerate supported documents under `input`, sorted by path.
///
/// `input` may be a single file. Anything under `exclude` (the output
/// directory) is skipped.
pub fn discover(input: &Path, recursive: bool, exclude: &Path) -> std::io::Result<Vec<Document>> {
    if input.is_file() {
        let root = input.parent().unwrap_or(Path::new(""));
        return Ok(Document::new(input.to_path_buf(), root).into_iter().collect());
    }

    let mut paths = Vec::new();
    walk(input, recursive, exclude, &mut paths)?;
    paths.sort();

    let docs: Vec<Document> = paths
        .into_iter()
        .filter_map(|p| Document::new(p, input))
        .collect();
    debug!("discovered {} documents under {}", docs.len(), input.display());
    Ok(docs)
}

fn walk(dir: &Path, recursive: bool, exclude: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive && !same_dir(&path, exclude) {
                walk(&path, recursive, exclude, out)?;
            }
        } else if DocumentKind::from_path(&path).is_some() {
            out.push(path);
        }
    }
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
