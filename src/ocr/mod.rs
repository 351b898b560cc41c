//! Modular OCR provider abstraction.
//!
//! Defines the [`OcrProvider`] trait and unified types so the cloud backends
//! (OCR.space, Baidu OCR) can be swapped via the `--backend` flag.

pub mod baidu;
pub mod compress;
pub mod invoker;
pub mod ocr_space;
pub mod raster;
pub mod registry;
pub mod select;

use std::fmt;
use std::str::FromStr;

use crate::config::Settings;
use crate::error::Result;
use registry::ProviderLimits;

/// Concrete OCR provider identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    OcrSpace,
    Baidu,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::OcrSpace, BackendKind::Baidu];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OcrSpace => "ocrspace",
            BackendKind::Baidu => "baidu",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend requested by the user, resolved per document by [`select::select_backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    OcrSpace,
    Baidu,
    #[default]
    Auto,
}

impl FromStr for BackendChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ocrspace" | "ocr.space" | "ocr_space" => Ok(Self::OcrSpace),
            "baidu" => Ok(Self::Baidu),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown backend '{}' (expected ocrspace, baidu or auto)",
                other
            )),
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendChoice::OcrSpace => f.write_str("ocrspace"),
            BackendChoice::Baidu => f.write_str("baidu"),
            BackendChoice::Auto => f.write_str("auto"),
        }
    }
}

/// Bytes handed to a provider for a single recognition call.
#[derive(Debug, Clone)]
pub enum OcrInput {
    Image { file_name: String, data: Vec<u8> },
    Pdf { file_name: String, data: Vec<u8> },
}

impl OcrInput {
    pub fn file_name(&self) -> &str {
        match self {
            OcrInput::Image { file_name, .. } | OcrInput::Pdf { file_name, .. } => file_name,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            OcrInput::Image { data, .. } | OcrInput::Pdf { data, .. } => data,
        }
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> &'static str {
        if let OcrInput::Pdf { .. } = self {
            return "application/pdf";
        }
        let ext = self
            .file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            "tif" | "tiff" => "image/tiff",
            _ => "image/jpeg",
        }
    }
}

/// Text recognized by one provider call. One entry per page the provider reported.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    pub pages: Vec<String>,
    pub confidence: Option<f64>,
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Size ceiling and native PDF support. Defaults to the registry entry.
    fn limits(&self) -> ProviderLimits {
        registry::spec(self.kind()).limits
    }

    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput>;
}

/// Build one provider per backend whose credentials are configured.
pub fn build_providers(settings: &Settings, client: reqwest::Client) -> Vec<Box<dyn OcrProvider>> {
    let configured = settings.configured_backends();
    let mut providers: Vec<Box<dyn OcrProvider>> = Vec::new();
    for kind in configured {
        match kind {
            BackendKind::OcrSpace => {
                let Some(creds) = &settings.ocr_space else { continue };
                let mut provider = ocr_space::OcrSpaceProvider::new(
                    client.clone(),
                    creds.api_key.clone(),
                    creds.language.clone(),
                );
                if let Some(endpoint) = &creds.endpoint {
                    provider = provider.with_endpoint(endpoint.clone());
                }
                providers.push(Box::new(provider));
            }
            BackendKind::Baidu => {
                let Some(creds) = &settings.baidu else { continue };
                providers.push(Box::new(baidu::BaiduProvider::new(
                    client.clone(),
                    creds.api_key.clone(),
                    creds.secret_key.clone(),
                    creds.high_precision,
                )));
            }
        }
    }
    providers
}
