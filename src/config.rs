use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarizer.
///
/// Every key is optional; unset keys fall back to the values in [`Config::default`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Maximum characters per chunk handed to the summarizer.
    pub chunk_size: usize,
    /// Characters-per-page threshold below which a document counts as scanned.
    pub scan_density_threshold: usize,
    /// Maximum number of pages recognized by the OCR fallback.
    pub ocr_page_budget: u32,
    /// Rasterization resolution for OCR.
    pub ocr_dpi: u32,
    /// Upper bound on the OCR stage, in seconds.
    pub ocr_timeout_secs: u64,
    /// Executable used to rasterize PDF pages.
    pub ocr_rasterizer_bin: String,
    /// Executable used to recognize rasterized pages.
    pub ocr_tesseract_bin: String,
    /// Backend used for structured summarization.
    pub summarization_provider: SummarizationProvider,
    /// Optional base URL of the Ollama runtime.
    pub ollama_url: Option<String>,
    /// Model identifier passed to the summarization backend.
    pub summarization_model: String,
    /// Upper bound on the summarization stage, in seconds.
    pub summarization_timeout_secs: u64,
    /// Token budget for the prompt sent to the summarization backend.
    pub summarization_context_tokens: usize,
    /// Maximum characters of original text included in formatted output.
    pub original_text_cap: usize,
    /// Maximum accepted document size in megabytes.
    pub max_document_mb: u64,
    /// Keep CJK punctuation (`。！？` and friends) during preprocessing.
    pub keep_cjk_punctuation: bool,
    /// Keep paragraph breaks instead of collapsing all whitespace to spaces.
    pub preserve_paragraphs: bool,
    /// Persist formatted output next to the source document.
    pub write_output: bool,
    /// Share extraction results between runs on the same document fingerprint.
    pub extraction_cache: bool,
}

/// Supported structured-summary backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Deterministic, offline extractive summaries.
    None,
    /// Local Ollama runtime.
    Ollama,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: None,
            chunk_size: 3000,
            scan_density_threshold: 100,
            ocr_page_budget: 5,
            ocr_dpi: 300,
            ocr_timeout_secs: 120,
            ocr_rasterizer_bin: "pdftoppm".into(),
            ocr_tesseract_bin: "tesseract".into(),
            summarization_provider: SummarizationProvider::None,
            ollama_url: None,
            summarization_model: "qwen2.5:7b".into(),
            summarization_timeout_secs: 60,
            summarization_context_tokens: 8192,
            original_text_cap: 5000,
            max_document_mb: 50,
            keep_cjk_punctuation: false,
            preserve_paragraphs: false,
            write_output: true,
            extraction_cache: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            server_port: parse_optional("SERVER_PORT")?,
            chunk_size: parse_optional("SUMMARIZER_CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
            scan_density_threshold: parse_optional("SCAN_DENSITY_THRESHOLD")?
                .unwrap_or(defaults.scan_density_threshold),
            ocr_page_budget: parse_optional("OCR_PAGE_BUDGET")?
                .unwrap_or(defaults.ocr_page_budget),
            ocr_dpi: parse_optional("OCR_DPI")?.unwrap_or(defaults.ocr_dpi),
            ocr_timeout_secs: parse_optional("OCR_TIMEOUT_SECS")?
                .unwrap_or(defaults.ocr_timeout_secs),
            ocr_rasterizer_bin: load_env_optional("OCR_RASTERIZER_BIN")
                .unwrap_or(defaults.ocr_rasterizer_bin),
            ocr_tesseract_bin: load_env_optional("OCR_TESSERACT_BIN")
                .unwrap_or(defaults.ocr_tesseract_bin),
            summarization_provider: load_env_optional("SUMMARIZATION_PROVIDER")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(defaults.summarization_provider),
            ollama_url: load_env_optional("OLLAMA_URL"),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or(defaults.summarization_model),
            summarization_timeout_secs: parse_optional("SUMMARIZATION_TIMEOUT_SECS")?
                .unwrap_or(defaults.summarization_timeout_secs),
            summarization_context_tokens: parse_optional("SUMMARIZATION_CONTEXT_TOKENS")?
                .unwrap_or(defaults.summarization_context_tokens),
            original_text_cap: parse_optional("ORIGINAL_TEXT_CAP")?
                .unwrap_or(defaults.original_text_cap),
            max_document_mb: parse_optional("MAX_DOCUMENT_MB")?
                .unwrap_or(defaults.max_document_mb),
            keep_cjk_punctuation: parse_flag("TEXT_KEEP_CJK_PUNCTUATION")?
                .unwrap_or(defaults.keep_cjk_punctuation),
            preserve_paragraphs: parse_flag("TEXT_PRESERVE_PARAGRAPHS")?
                .unwrap_or(defaults.preserve_paragraphs),
            write_output: parse_flag("WRITE_OUTPUT")?.unwrap_or(defaults.write_output),
            extraction_cache: parse_flag("EXTRACTION_CACHE")?
                .unwrap_or(defaults.extraction_cache),
        };

        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("SUMMARIZER_CHUNK_SIZE".into()));
        }
        if config.ocr_page_budget == 0 {
            return Err(ConfigError::InvalidValue("OCR_PAGE_BUDGET".into()));
        }
        Ok(config)
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "extractive" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        chunk_size = config.chunk_size,
        ocr_page_budget = config.ocr_page_budget,
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    let _ = CONFIG.set(config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_known_values() {
        assert_eq!("Ollama".parse(), Ok(SummarizationProvider::Ollama));
        assert_eq!("none".parse(), Ok(SummarizationProvider::None));
        assert!("openai".parse::<SummarizationProvider>().is_err());
    }

    #[test]
    fn defaults_match_documented_limits() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 3000);
        assert_eq!(config.scan_density_threshold, 100);
        assert_eq!(config.ocr_page_budget, 5);
        assert_eq!(config.original_text_cap, 5000);
        assert_eq!(config.max_document_mb, 50);
        assert!(config.write_output);
    }
}
