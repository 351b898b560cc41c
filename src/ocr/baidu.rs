//! Baidu OCR provider.
//!
//! Exchanges the API key / secret for an OAuth2 access token (client
//! credentials grant), caches it until shortly before expiry, then posts the
//! base64-encoded image as a form-urlencoded body. Images only; PDFs are
//! rasterized by the invoker first.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tracing::{debug, info};

use super::registry::spec;
use super::{BackendKind, OcrInput, OcrOutput, OcrProvider};
use crate::error::{ConvertError, Result};

/// Refresh the token this long before Baidu says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Error codes meaning the cached access token is no longer valid.
const TOKEN_INVALID_CODES: &[i64] = &[110, 111];

pub struct BaiduProvider {
    api_key: String,
    secret_key: String,
    high_precision: bool,
    client: reqwest::Client,
    token_cache: Mutex<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl BaiduProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        secret_key: String,
        high_precision: bool,
    ) -> Self {
        Self {
            api_key,
            secret_key,
            high_precision,
            client,
            token_cache: Mutex::new(None),
        }
    }

    fn endpoint(&self) -> &'static str {
        let spec = spec(BackendKind::Baidu);
        match (self.high_precision, spec.accurate_endpoint) {
            (true, Some(accurate)) => accurate,
            _ => spec.endpoint,
        }
    }

    fn cached_token(&self) -> Option<String> {
        let cache = self.token_cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|t| Instant::now() < t.expires_at)
            .map(|t| t.access_token.clone())
    }

    fn invalidate_token(&self) {
        if let Ok(mut cache) = self.token_cache.lock() {
            *cache = None;
        }
    }

    /// Get a valid access token, refreshing if expired.
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let backend = BackendKind::Baidu;
        let token_url = spec(backend)
            .token_endpoint
            .ok_or_else(|| ConvertError::Config("baidu token endpoint missing".to_string()))?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
            #[serde(default)]
            expires_in: u64,
            error: Option<String>,
            error_description: Option<String>,
        }

        let resp = self
            .client
            .post(token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.secret_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ConvertError::from_reqwest(backend, e))?;

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ConvertError::from_reqwest(backend, e))?;

        let access_token = match (token.access_token, token.error) {
            (Some(t), None) => t,
            (_, error) => {
                return Err(ConvertError::Provider {
                    backend,
                    code: error.unwrap_or_else(|| "token".to_string()),
                    message: token
                        .error_description
                        .unwrap_or_else(|| "token exchange failed".to_string()),
                })
            }
        };

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        if let Ok(mut cache) = self.token_cache.lock() {
            *cache = Some(CachedToken {
                access_token: access_token.clone(),
                expires_at: Instant::now() + lifetime,
            });
        }
        debug!("BaiduProvider: access token refreshed ({}s)", token.expires_in);
        Ok(access_token)
    }
}

// ── Baidu API response types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    error_code: Option<i64>,
    error_msg: Option<String>,
    #[serde(default)]
    words_result: Vec<WordsResult>,
}

#[derive(Debug, Deserialize)]
struct WordsResult {
    words: String,
    probability: Option<Probability>,
}

#[derive(Debug, Deserialize)]
struct Probability {
    average: f64,
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl OcrProvider for BaiduProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Baidu
    }

    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput> {
        let backend = self.kind();
        let data = match input {
            OcrInput::Image { data, .. } => data,
            OcrInput::Pdf { file_name, .. } => {
                return Err(ConvertError::Parse(format!(
                    "{} does not accept PDF input ({})",
                    backend, file_name
                )))
            }
        };

        let token = self.access_token().await?;
        let image = BASE64.encode(data);

        info!(
            "BaiduProvider: recognizing {} ({} bytes, high_precision={})",
            input.file_name(),
            data.len(),
            self.high_precision
        );

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("access_token", token.as_str())])
            .form(&[
                ("image", image.as_str()),
                ("language_type", "CHN_ENG"),
                ("detect_direction", "true"),
                ("probability", "true"),
            ])
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

        let result = parse_response(&body);
        if let Err(ConvertError::Provider { code, .. }) = &result {
            if code
                .parse::<i64>()
                .map(|c| TOKEN_INVALID_CODES.contains(&c))
                .unwrap_or(false)
            {
                self.invalidate_token();
            }
        }
        result
    }
}

/// Turn a Baidu JSON body into a single page of text, one line per word group.
fn parse_response(body: &str) -> Result<OcrOutput> {
    let backend = BackendKind::Baidu;
    let parsed: RecognizeResponse =
        serde_json::from_str(body).map_err(|e| ConvertError::Provider {
            backend,
            code: "unparseable".to_string(),
            message: e.to_string(),
        })?;

    if let Some(code) = parsed.error_code {
        return Err(ConvertError::Provider {
            backend,
            code: code.to_string(),
            message: parsed.error_msg.unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    let probabilities: Vec<f64> = parsed
        .words_result
        .iter()
        .filter_map(|w| w.probability.as_ref().map(|p| p.average))
        .collect();
    let confidence = if probabilities.is_empty() {
        None
    } else {
        Some(probabilities.iter().sum::<f64>() / probabilities.len() as f64)
    };

    let text = parsed
        .words_result
        .into_iter()
        .map(|w| w.words)
        .collect::<Vec<_>>()
        .join("\n");

    Ok(OcrOutput {
        pages: vec![text],
        confidence,
    })
}
