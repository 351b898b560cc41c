//! Run configuration.
//!
//! Loaded once at startup from an optional JSON file, then overridden by
//! environment variables (`.env` is honoured via dotenvy) and CLI flags.
//! The resulting [`Settings`] is passed by reference and never mutated.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::ocr::BackendKind;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "scan2md.json";

pub const ENV_OCR_SPACE_API_KEY: &str = "OCR_SPACE_API_KEY";
pub const ENV_BAIDU_API_KEY: &str = "BAIDU_OCR_API_KEY";
pub const ENV_BAIDU_SECRET_KEY: &str = "BAIDU_OCR_SECRET_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ocr_space: Option<OcrSpaceCredentials>,
    #[serde(default)]
    pub baidu: Option<BaiduCredentials>,
    #[serde(default)]
    pub tuning: Tuning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSpaceCredentials {
    pub api_key: String,
    /// OCR.space language code. `chs` also covers Latin script.
    #[serde(default = "default_language")]
    pub language: String,
    /// Override for PRO-tier or self-hosted endpoints.
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaiduCredentials {
    pub api_key: String,
    pub secret_key: String,
    /// Use `accurate_basic` instead of `general_basic`.
    #[serde(default)]
    pub high_precision: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tuning {
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Courtesy delay between consecutive provider calls.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_language() -> String {
    "chs".to_string()
}

fn default_dpi() -> u32 {
    200
}

fn default_delay_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    60
}

impl Settings {
    /// Load from `path` (or [`DEFAULT_CONFIG_FILE`] if present), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()));
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(settings)
    }

    /// Environment values win over the file. Baidu needs both halves of
    /// its key pair; a lone key from the environment is ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = lookup(ENV_OCR_SPACE_API_KEY) {
            debug!("{} set, overriding OCR.space key", ENV_OCR_SPACE_API_KEY);
            match &mut self.ocr_space {
                Some(creds) => creds.api_key = api_key,
                None => {
                    self.ocr_space = Some(OcrSpaceCredentials {
                        api_key,
                        language: default_language(),
                        endpoint: None,
                    })
                }
            }
        }

        match (lookup(ENV_BAIDU_API_KEY), lookup(ENV_BAIDU_SECRET_KEY)) {
            (Some(api_key), Some(secret_key)) => {
                debug!("Baidu credentials taken from environment");
                let high_precision = self.baidu.as_ref().map(|b| b.high_precision).unwrap_or(false);
                self.baidu = Some(BaiduCredentials {
                    api_key,
                    secret_key,
                    high_precision,
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                debug!(
                    "only one of {} / {} set, ignoring",
                    ENV_BAIDU_API_KEY, ENV_BAIDU_SECRET_KEY
                );
            }
            (None, None) => {}
        }
    }

    /// Backends with usable credentials, in registry order.
    pub fn configured_backends(&self) -> Vec<BackendKind> {
        let mut kinds = Vec::new();
        if self
            .ocr_space
            .as_ref()
            .is_some_and(|c| !c.api_key.trim().is_empty())
        {
            kinds.push(BackendKind::OcrSpace);
        }
        if self
            .baidu
            .as_ref()
            .is_some_and(|c| !c.api_key.trim().is_empty() && !c.secret_key.trim().is_empty())
        {
            kinds.push(BackendKind::Baidu);
        }
        kinds
    }

    /// Fail fast when nothing could ever be recognized.
    pub fn validate(&self) -> Result<()> {
        if self.configured_backends().is_empty() {
            anyhow::bail!(
                "No OCR backend configured. Set {} and/or {} + {}, or provide a config file",
                ENV_OCR_SPACE_API_KEY,
                ENV_BAIDU_API_KEY,
                ENV_BAIDU_SECRET_KEY
            );
        }
        if !(72..=600).contains(&self.tuning.dpi) {
            anyhow::bail!("dpi must be between 72 and 600, got {}", self.tuning.dpi);
        }
        if self.tuning.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.tuning.dpi, 200);
        assert_eq!(settings.tuning.delay_ms, 500);
        assert!(settings.configured_backends().is_empty());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "ocr_space": {{"api_key": "K123"}},
                "baidu": {{"api_key": "ak", "secret_key": "sk", "high_precision": true}},
                "tuning": {{"dpi": 300}}
            }}"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.ocr_space.as_ref().unwrap().language, "chs");
        assert!(settings.baidu.as_ref().unwrap().high_precision);
        assert_eq!(settings.tuning.dpi, 300);
        assert_eq!(settings.tuning.timeout_secs, 60);
        assert_eq!(
            settings.configured_backends(),
            vec![BackendKind::OcrSpace, BackendKind::Baidu]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Settings::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut settings = Settings {
            ocr_space: Some(OcrSpaceCredentials {
                api_key: "from-file".to_string(),
                language: "eng".to_string(),
                endpoint: None,
            }),
            ..Settings::default()
        };
        settings.apply_env(env(&[(ENV_OCR_SPACE_API_KEY, "from-env")]));
        let creds = settings.ocr_space.unwrap();
        assert_eq!(creds.api_key, "from-env");
        assert_eq!(creds.language, "eng");
    }

    #[test]
    fn test_baidu_needs_both_keys() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[(ENV_BAIDU_API_KEY, "ak")]));
        assert!(settings.baidu.is_none());

        settings.apply_env(env(&[(ENV_BAIDU_API_KEY, "ak"), (ENV_BAIDU_SECRET_KEY, "sk")]));
        assert_eq!(settings.configured_backends(), vec![BackendKind::Baidu]);
    }

    #[test]
    fn test_blank_key_not_configured() {
        let settings = Settings {
            ocr_space: Some(OcrSpaceCredentials {
                api_key: "  ".to_string(),
                language: default_language(),
                endpoint: None,
            }),
            ..Settings::default()
        };
        assert!(settings.configured_backends().is_empty());
    }

    #[test]
    fn test_dpi_bounds() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[(ENV_OCR_SPACE_API_KEY, "k")]));
        settings.tuning.dpi = 1200;
        assert!(settings.validate().is_err());
        settings.tuning.dpi = 300;
        assert!(settings.validate().is_ok());
    }
}
