//! Model catalog offered to the playground UI.
//!
//! The built-in catalog can be replaced by a JSON file (`MODELS_CONFIG`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config::ServerConfig;

/// Fewest side-by-side panels the UI shows.
pub const MIN_PANELS: usize = 1;
/// Most side-by-side panels (and so models per request).
pub const MAX_PANELS: usize = 4;

/// One selectable model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context_window: String,
    #[serde(default)]
    pub website: Option<String>,
    /// Shown as a panel when the page first loads.
    #[serde(default)]
    pub default_selected: bool,
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        Self {
            models: vec![
                ModelInfo {
                    provider: "Mistral".to_string(),
                    model: "mistral-ocr-latest".to_string(),
                    label: "Mistral / mistral-ocr-latest".to_string(),
                    description: "Mistral OCR comprehends each element of documents (media, text, \
                        tables, equations) and extracts content in an ordered interleaved text \
                        and images format."
                        .to_string(),
                    context_window: "1000 pages".to_string(),
                    website: Some("https://mistral.ai".to_string()),
                    default_selected: true,
                },
                ModelInfo {
                    provider: "OpenAI".to_string(),
                    model: "gpt-4o".to_string(),
                    label: "OpenAI / gpt-4o".to_string(),
                    description: "GPT-4o is OpenAI's multimodal flagship model, covering \
                        language, vision and reasoning tasks."
                        .to_string(),
                    context_window: "128,000 tokens".to_string(),
                    website: Some("https://openai.com".to_string()),
                    default_selected: true,
                },
                ModelInfo {
                    provider: "Google".to_string(),
                    model: "gemini-2.0-flash-exp".to_string(),
                    label: "Google / gemini-2.0-flash-exp".to_string(),
                    description: "Gemini 2.0 Flash offers fast multimodal understanding with a \
                        1M token context window."
                        .to_string(),
                    context_window: "1,000,000 tokens".to_string(),
                    website: Some("https://ai.google.dev".to_string()),
                    default_selected: true,
                },
                ModelInfo {
                    provider: "Anthropic".to_string(),
                    model: "claude-3.7-sonnet".to_string(),
                    label: "Anthropic / claude-3.7-sonnet".to_string(),
                    description: "Claude 3.7 Sonnet handles language, vision and reasoning \
                        tasks and reads PDFs natively."
                        .to_string(),
                    context_window: "200,000 tokens".to_string(),
                    website: Some("https://anthropic.com".to_string()),
                    default_selected: false,
                },
            ],
        }
    }

    /// Load a catalog from a JSON array of [`ModelInfo`].
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model catalog: {:?}", path))?;
        let models: Vec<ModelInfo> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model catalog: {:?}", path))?;

        if models.is_empty() {
            anyhow::bail!("No models found in {:?}", path);
        }

        info!("Loaded {} models from {:?}", models.len(), path);
        Ok(Self { models })
    }

    /// Catalog file from config if set, otherwise the built-in list.
    pub fn load(config: &ServerConfig) -> Result<Self> {
        match &config.models_config {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Models shown when the page first loads, capped at [`MAX_PANELS`].
    pub fn defaults(&self) -> Vec<&ModelInfo> {
        let mut defaults: Vec<&ModelInfo> = self
            .models
            .iter()
            .filter(|m| m.default_selected)
            .take(MAX_PANELS)
            .collect();
        if defaults.len() < MIN_PANELS {
            defaults.extend(self.models.iter().take(MIN_PANELS));
        }
        defaults
    }
}
