//! OpenAI provider (Responses API with inline file input).

use super::{OcrInput, OcrOutput, OcrProvider};
use crate::config::VendorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub struct OpenAiProvider {
    config: VendorConfig,
    prompt: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: VendorConfig, prompt: String, client: reqwest::Client) -> Self {
        Self {
            config,
            prompt,
            client,
        }
    }
}

/// Map a UI model identifier to the API model name.
fn resolve_model(model: &str) -> &str {
    match model {
        "gpt-4o" => "gpt-4o",
        "gpt-4.1" => "gpt-4.1",
        "gpt-4.1-mini" => "gpt-4.1-mini",
        other => other,
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: Vec<InputPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputPart<'a> {
    InputText { text: &'a str },
    InputImage { image_url: String },
    InputFile { filename: &'a str, file_data: String },
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait::async_trait]
impl OcrProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn process(&self, model: &str, input: &OcrInput) -> anyhow::Result<OcrOutput> {
        let api_key = self.config.require_key()?;
        let model = resolve_model(model);

        let file_part = if input.is_image() {
            InputPart::InputImage {
                image_url: input.data_url(),
            }
        } else {
            InputPart::InputFile {
                filename: &input.filename,
                file_data: input.data_url(),
            }
        };

        let request = ResponsesRequest {
            model,
            input: vec![InputMessage {
                role: "user",
                content: vec![InputPart::InputText { text: &self.prompt }, file_part],
            }],
        };

        debug!("Sending request to OpenAI: model={}", model);

        let response = self
            .client
            .post(format!("{}/v1/responses", self.config.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let response: ResponsesResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        if let Some(usage) = &response.usage {
            info!(
                "OpenAI response: {} input tokens, {} output tokens",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = response
            .output
            .into_iter()
            .flat_map(|item| item.content)
            .filter(|c| c.kind == "output_text")
            .filter_map(|c| c.text)
            .collect::<String>();

        Ok(OcrOutput::new(text, model))
    }
}
