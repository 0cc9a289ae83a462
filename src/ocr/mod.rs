//! Modular OCR provider abstraction.
//!
//! Defines the [`OcrProvider`] trait and unified types so each vendor backend
//! (Mistral OCR, OpenAI, Gemini, Claude) can be called the same way by the
//! dispatcher.

pub mod anthropic;
pub mod google;
pub mod mistral;
pub mod openai;

#[cfg(test)]
pub(crate) mod test_support;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ServerConfig;

/// Placeholder returned when a vendor answers with no text at all.
pub const EMPTY_RESULT: &str = "No text extracted";

/// The uploaded document.
#[derive(Debug, Clone)]
pub struct OcrInput {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl OcrInput {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }

    pub fn base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// `data:` URL carrying the whole document.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64())
    }
}

/// Unified result returned by every provider.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    /// Vendor model id actually called.
    pub resolved_model: String,
}

impl OcrOutput {
    pub fn new(text: String, resolved_model: impl Into<String>) -> Self {
        let text = if text.trim().is_empty() {
            EMPTY_RESULT.to_string()
        } else {
            text
        };
        Self {
            text,
            resolved_model: resolved_model.into(),
        }
    }
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;
    /// Extract text from `input` using the UI-facing `model` name.
    async fn process(&self, model: &str, input: &OcrInput) -> anyhow::Result<OcrOutput>;
}

/// Known provider identifiers used for registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Mistral,
    OpenAi,
    Google,
    Anthropic,
}

impl ProviderKind {
    /// Parse a provider name as sent by the UI ("Mistral", "openai", ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mistral" => Some(Self::Mistral),
            "openai" => Some(Self::OpenAi),
            "google" => Some(Self::Google),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }
}

/// Providers available to the dispatcher, keyed by kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn OcrProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register all four vendors sharing one HTTP client.
    pub fn from_config(config: &ServerConfig, client: reqwest::Client) -> Self {
        Self::new()
            .with(
                ProviderKind::Mistral,
                mistral::MistralOcrProvider::new(config.mistral.clone(), client.clone()),
            )
            .with(
                ProviderKind::OpenAi,
                openai::OpenAiProvider::new(
                    config.openai.clone(),
                    config.prompt.clone(),
                    client.clone(),
                ),
            )
            .with(
                ProviderKind::Google,
                google::GeminiProvider::new(
                    config.google.clone(),
                    config.prompt.clone(),
                    client.clone(),
                ),
            )
            .with(
                ProviderKind::Anthropic,
                anthropic::AnthropicProvider::new(
                    config.anthropic.clone(),
                    config.prompt.clone(),
                    client,
                ),
            )
    }

    pub fn with(mut self, kind: ProviderKind, provider: impl OcrProvider + 'static) -> Self {
        self.providers.insert(kind, Arc::new(provider));
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn OcrProvider>> {
        self.providers.get(&kind).cloned()
    }
}
