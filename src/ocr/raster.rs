//! PDF page rasterization for providers without a multipage API.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConvertError, Result};

pub const PDFTOPPM_NOT_FOUND: &str =
    "pdftoppm not found in PATH (install poppler-utils to OCR scanned PDFs)";

/// Renders every page of a PDF to an image file inside `out_dir`.
#[async_trait::async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Returns page images in page order.
    async fn rasterize(&self, pdf_path: &Path, dpi: u32, out_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Rasterizer backed by poppler's `pdftoppm` binary.
pub struct Pdftoppm;

#[async_trait::async_trait]
impl PageRasterizer for Pdftoppm {
    async fn rasterize(&self, pdf_path: &Path, dpi: u32, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let dpi_str = dpi.to_string();
        let output = tokio::process::Command::new("pdftoppm")
            .args(["-png", "-r", &dpi_str])
            .arg(pdf_path)
            .arg(out_dir.join("page"))
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                return Err(ConvertError::Rasterize(format!(
                    "pdftoppm exited with {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::Rasterize(PDFTOPPM_NOT_FOUND.to_string()))
            }
            Err(e) => return Err(ConvertError::Io(e)),
        }

        let pages = collect_page_images(out_dir)?;
        if pages.is_empty() {
            return Err(ConvertError::Rasterize(format!(
                "pdftoppm produced no pages for {}",
                pdf_path.display()
            )));
        }
        debug!("rasterized {} pages at {} dpi", pages.len(), dpi);
        Ok(pages)
    }
}

/// Find `page-N.png` files and order them by page number.
///
/// pdftoppm zero-pads N to the width of the page count, so lexical order is
/// not reliable across documents.
pub fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let number = name
            .strip_prefix("page-")
            .and_then(|rest| rest.strip_suffix(".png"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(n) = number {
            pages.push((n, path));
        }
    }
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, p)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_orders_by_page_number() {
        let temp = TempDir::new().unwrap();
        for name in ["page-10.png", "page-02.png", "page-01.png", "notes.txt"] {
            std::fs::write(temp.path().join(name), b"fake png").unwrap();
        }

        let pages = collect_page_images(temp.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["page-01.png", "page-02.png", "page-10.png"]);
    }

    #[test]
    fn test_collect_empty_dir() {
        let temp = TempDir::new().unwrap();
        assert!(collect_page_images(temp.path()).unwrap().is_empty());
    }
}
