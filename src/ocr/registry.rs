//! Static registry of provider endpoints and limits.
//!
//! Resolved once by kind; nothing here is probed or guessed at request time.

use super::BackendKind;

/// Per-request constraints a provider enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderLimits {
    /// Largest accepted upload in raw bytes.
    pub max_bytes: usize,
    /// Largest PDF page count accepted in a single call, `None` if PDFs are not accepted.
    pub native_pdf_pages: Option<usize>,
}

#[derive(Debug)]
pub struct ProviderSpec {
    pub kind: BackendKind,
    pub api_version: &'static str,
    pub display_name: &'static str,
    pub endpoint: &'static str,
    /// High-precision variant of `endpoint`, if the provider has one.
    pub accurate_endpoint: Option<&'static str>,
    pub token_endpoint: Option<&'static str>,
    pub limits: ProviderLimits,
    pub monthly_free_quota: u32,
    /// Recognizes CJK script noticeably better than the alternatives.
    pub strong_on_cjk: bool,
    pub credential_vars: &'static [&'static str],
}

pub static PROVIDERS: [ProviderSpec; 2] = [
    ProviderSpec {
        kind: BackendKind::OcrSpace,
        api_version: "parse/image v3",
        display_name: "OCR.space",
        endpoint: "https://api.ocr.space/parse/image",
        accurate_endpoint: None,
        token_endpoint: None,
        limits: ProviderLimits {
            max_bytes: 1024 * 1024,
            native_pdf_pages: Some(3),
        },
        monthly_free_quota: 25_000,
        strong_on_cjk: false,
        credential_vars: &["OCR_SPACE_API_KEY"],
    },
    ProviderSpec {
        kind: BackendKind::Baidu,
        api_version: "rest/2.0/ocr/v1",
        display_name: "Baidu OCR",
        endpoint: "https://aip.baidubce.com/rest/2.0/ocr/v1/general_basic",
        accurate_endpoint: Some("https://aip.baidubce.com/rest/2.0/ocr/v1/accurate_basic"),
        token_endpoint: Some("https://aip.baidubce.com/oauth/2.0/token"),
        // 4 MiB after base64 expansion
        limits: ProviderLimits {
            max_bytes: 3 * 1024 * 1024,
            native_pdf_pages: None,
        },
        monthly_free_quota: 1_000,
        strong_on_cjk: true,
        credential_vars: &["BAIDU_OCR_API_KEY", "BAIDU_OCR_SECRET_KEY"],
    },
];

pub fn spec(kind: BackendKind) -> &'static ProviderSpec {
    match kind {
        BackendKind::OcrSpace => &PROVIDERS[0],
        BackendKind::Baidu => &PROVIDERS[1],
    }
}
