//! Service configuration.
//!
//! Everything comes from the process environment (optionally seeded from a
//! `.env` file). Missing vendor keys are not fatal: the provider stays
//! registered and each call to it is rejected, so the UI shows which models
//! are unavailable.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROMPT: &str = "Extract and format the text content from this document. \
Return only the extracted text content, without any prefixes or explanations.";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024; // 100MB
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Credentials and endpoint for one vendor.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    /// Name of the env var the key is read from (used in error messages).
    pub key_var: &'static str,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl VendorConfig {
    /// The API key, or an error naming the missing variable.
    pub fn require_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("{} not set", self.key_var))
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
    pub static_dir: PathBuf,
    pub models_config: Option<PathBuf>,
    pub prompt: String,
    pub mistral: VendorConfig,
    pub openai: VendorConfig,
    pub google: VendorConfig,
    pub anthropic: VendorConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Treat empty values like unset ones
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("Invalid MAX_UPLOAD_BYTES: {}", v))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let timeout_secs: u64 = match get("REQUEST_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("Invalid REQUEST_TIMEOUT_SECS: {}", v))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        let vendor = |key_var: &'static str, url_var: &str, default_url: &str| VendorConfig {
            key_var,
            api_key: get(key_var),
            base_url: get(url_var)
                .unwrap_or_else(|| default_url.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_upload_bytes,
            request_timeout: Duration::from_secs(timeout_secs),
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            models_config: get("MODELS_CONFIG").map(PathBuf::from),
            prompt: get("OCR_PROMPT").unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            mistral: vendor("MISTRAL_API_KEY", "MISTRAL_BASE_URL", "https://api.mistral.ai"),
            openai: vendor("OPENAI_API_KEY", "OPENAI_BASE_URL", "https://api.openai.com"),
            google: vendor(
                "GOOGLE_GENERATIVE_AI_API_KEY",
                "GOOGLE_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            anthropic: vendor(
                "ANTHROPIC_API_KEY",
                "ANTHROPIC_BASE_URL",
                "https://api.anthropic.com",
            ),
        })
    }

    /// Names of vendors that have a key configured.
    pub fn configured_vendors(&self) -> Vec<&'static str> {
        [
            ("mistral", &self.mistral),
            ("openai", &self.openai),
            ("google", &self.google),
            ("anthropic", &self.anthropic),
        ]
        .into_iter()
        .filter(|(_, v)| v.api_key.is_some())
        .map(|(name, _)| name)
        .collect()
    }
}
