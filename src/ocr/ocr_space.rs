//! OCR.space provider (multipart upload, `apikey` form field).

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use super::registry::spec;
use super::{BackendKind, OcrInput, OcrOutput, OcrProvider};
use crate::error::{ConvertError, Result};

pub struct OcrSpaceProvider {
    api_key: String,
    language: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OcrSpaceProvider {
    pub fn new(client: reqwest::Client, api_key: String, language: String) -> Self {
        Self {
            api_key,
            language,
            endpoint: spec(BackendKind::OcrSpace).endpoint.to_string(),
            client,
        }
    }

    /// Point at a different endpoint (self-hosted or PRO tier).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

// ── OCR.space response types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "OCRExitCode", default)]
    ocr_exit_code: Option<i64>,
    #[serde(default)]
    is_errored_on_processing: bool,
    /// String or array of strings depending on the failure.
    #[serde(default)]
    error_message: serde_json::Value,
    #[serde(default)]
    error_details: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl OcrProvider for OcrSpaceProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::OcrSpace
    }

    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput> {
        let backend = self.kind();
        let part = Part::bytes(input.data().to_vec())
            .file_name(input.file_name().to_string())
            .mime_str(input.mime_type())
            .map_err(|e| ConvertError::from_reqwest(backend, e))?;

        let form = Form::new()
            .text("apikey", self.api_key.clone())
            .text("language", self.language.clone())
            .text("isOverlayRequired", "false")
            .text("OCREngine", "2")
            .text("scale", "true")
            .text("isTable", "true")
            .part("file", part);

        info!(
            "OcrSpaceProvider: uploading {} ({} bytes)",
            input.file_name(),
            input.data().len()
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ConvertError::from_reqwest(backend, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ConvertError::from_reqwest(backend, e))?;

        if !status.is_success() {
            return Err(ConvertError::Provider {
                backend,
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        debug!(
            "OcrSpaceProvider: raw response ({} bytes): {}",
            body.len(),
            body.chars().take(500).collect::<String>()
        );
        parse_response(&body)
    }
}

/// Turn an OCR.space JSON body into per-page text.
fn parse_response(body: &str) -> Result<OcrOutput> {
    let backend = BackendKind::OcrSpace;
    // Quota and rate-limit rejections come back as a bare JSON string
    let parsed: ParseResponse = serde_json::from_str(body).map_err(|_| ConvertError::Provider {
        backend,
        code: "unparseable".to_string(),
        message: body.chars().take(300).collect(),
    })?;

    if parsed.is_errored_on_processing {
        let mut message = flatten_message(&parsed.error_message);
        let details = flatten_message(&parsed.error_details);
        if !details.is_empty() {
            message = format!("{} - {}", message, details);
        }
        return Err(ConvertError::Provider {
            backend,
            code: parsed
                .ocr_exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "processing".to_string()),
            message,
        });
    }

    Ok(OcrOutput {
        pages: parsed
            .parsed_results
            .into_iter()
            .map(|r| r.parsed_text.replace("\r\n", "\n").trim().to_string())
            .collect(),
        confidence: None,
    })
}

fn flatten_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
