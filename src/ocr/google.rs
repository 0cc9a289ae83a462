//! Google Gemini provider (`generateContent` with inline document data).

use super::{OcrInput, OcrOutput, OcrProvider};
use crate::config::VendorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";

pub struct GeminiProvider {
    config: VendorConfig,
    prompt: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: VendorConfig, prompt: String, client: reqwest::Client) -> Self {
        Self {
            config,
            prompt,
            client,
        }
    }
}

/// UI names for Gemini Flash all resolve to the pinned release.
fn resolve_model(model: &str) -> &str {
    match model {
        "" | "gemini-2.0-flash" | "gemini-2.0-flash-exp" => DEFAULT_MODEL,
        other => other,
    }
}

/// Model names land in the URL path, so only plain identifier characters pass.
fn validate_model_name(model: &str) -> anyhow::Result<()> {
    let valid = model
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        && model.chars().any(|c| c.is_ascii_alphanumeric());
    if !valid {
        anyhow::bail!("Invalid Gemini model name: {:?}", model);
    }
    Ok(())
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[async_trait::async_trait]
impl OcrProvider for GeminiProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn process(&self, model: &str, input: &OcrInput) -> anyhow::Result<OcrOutput> {
        let api_key = self.config.require_key()?;
        let model = resolve_model(model);
        validate_model_name(model)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: &self.prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &input.mime_type,
                            data: input.base64(),
                        },
                    },
                ],
            }],
        };

        debug!("Sending request to Gemini: model={}", model);

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.config.base_url, model
            ))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        if let Some(usage) = &response.usage_metadata {
            info!(
                "Gemini response: {} prompt tokens, {} candidate tokens",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        Ok(OcrOutput::new(text, model))
    }
}
