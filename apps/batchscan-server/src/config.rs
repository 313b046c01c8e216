//! Configuration management for Batchscan Server

use std::env;
use std::str::FromStr;

use crate::batch::{DEFAULT_PREFIX, DEFAULT_SUFFIX_LENGTH};
use crate::ocr::OcrProvider;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub batch: BatchConfig,
    pub ocr: OcrConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub prefix: String,
    pub suffix_length: usize,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Providers in the order they are tried
    pub providers: Vec<OcrProvider>,
    pub default_language: String,
    pub tesseract_bin: String,
    /// Tesseract page segmentation mode
    pub tesseract_psm: u8,
    pub timeout_secs: u64,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of OCR jobs allowed to run at once
    pub max_concurrent_jobs: usize,
    /// Cached OCR results keyed by image digest (0 disables)
    pub cache_capacity: usize,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown OCR provider: {0}")]
    UnknownProvider(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_upload_bytes: 10 * 1024 * 1024,
            },
            batch: BatchConfig {
                prefix: DEFAULT_PREFIX.to_string(),
                suffix_length: DEFAULT_SUFFIX_LENGTH,
            },
            ocr: OcrConfig {
                providers: vec![OcrProvider::Tesseract, OcrProvider::Ollama],
                default_language: "eng".to_string(),
                tesseract_bin: "tesseract".to_string(),
                tesseract_psm: 3,
                timeout_secs: 60,
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llava".to_string(),
            },
            scan: ScanConfig {
                max_concurrent_jobs: 1,
                cache_capacity: 64,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let providers = match lookup("OCR_PROVIDERS") {
            Some(raw) => parse_providers(&raw)?,
            None => defaults.ocr.providers,
        };

        let max_concurrent_jobs = parse_or(
            &lookup,
            "OCR_MAX_CONCURRENT_JOBS",
            defaults.scan.max_concurrent_jobs,
        )?;
        if max_concurrent_jobs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "OCR_MAX_CONCURRENT_JOBS",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parse_or(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.server.max_upload_bytes,
                )?,
            },
            batch: BatchConfig {
                prefix: lookup("BATCH_PREFIX").unwrap_or(defaults.batch.prefix),
                suffix_length: parse_or(
                    &lookup,
                    "BATCH_SUFFIX_LENGTH",
                    defaults.batch.suffix_length,
                )?,
            },
            ocr: OcrConfig {
                providers,
                default_language: lookup("OCR_LANGUAGE").unwrap_or(defaults.ocr.default_language),
                tesseract_bin: lookup("TESSERACT_BIN").unwrap_or(defaults.ocr.tesseract_bin),
                tesseract_psm: parse_or(&lookup, "TESSERACT_PSM", defaults.ocr.tesseract_psm)?,
                timeout_secs: parse_or(&lookup, "OCR_TIMEOUT_SECS", defaults.ocr.timeout_secs)?,
                ollama_url: lookup("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: lookup("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
            },
            scan: ScanConfig {
                max_concurrent_jobs,
                cache_capacity: parse_or(
                    &lookup,
                    "SCAN_CACHE_CAPACITY",
                    defaults.scan.cache_capacity,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

/// Parse a comma-separated provider list like "tesseract,ollama"
fn parse_providers(raw: &str) -> Result<Vec<OcrProvider>, ConfigError> {
    let mut providers = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let provider = match name.to_lowercase().as_str() {
            "tesseract" => OcrProvider::Tesseract,
            "ollama" => OcrProvider::Ollama,
            _ => return Err(ConfigError::UnknownProvider(name.to_string())),
        };
        if !providers.contains(&provider) {
            providers.push(provider);
        }
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.batch.prefix, "medplus");
        assert_eq!(config.batch.suffix_length, 12);
        assert_eq!(
            config.ocr.providers,
            vec![OcrProvider::Tesseract, OcrProvider::Ollama]
        );
        assert_eq!(config.scan.max_concurrent_jobs, 1);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "8080"),
            ("BATCH_PREFIX", "lot"),
            ("BATCH_SUFFIX_LENGTH", "8"),
            ("OCR_PROVIDERS", "ollama, tesseract, ollama"),
            ("SCAN_CACHE_CAPACITY", "0"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.batch.prefix, "lot");
        assert_eq!(config.batch.suffix_length, 8);
        assert_eq!(
            config.ocr.providers,
            vec![OcrProvider::Ollama, OcrProvider::Tesseract]
        );
        assert_eq!(config.scan.cache_capacity, 0);
    }

    #[test]
    fn test_invalid_number() {
        let result = Config::from_lookup(lookup_from(&[("SERVER_PORT", "eighty")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "SERVER_PORT", .. })
        ));
    }

    #[test]
    fn test_unknown_provider() {
        let result = Config::from_lookup(lookup_from(&[("OCR_PROVIDERS", "tesseract,openai")]));
        assert!(matches!(result, Err(ConfigError::UnknownProvider(name)) if name == "openai"));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let result = Config::from_lookup(lookup_from(&[("OCR_MAX_CONCURRENT_JOBS", "0")]));
        assert!(result.is_err());
    }
}
