//! Anthropic provider (Messages API with a document or image block).

use super::{OcrInput, OcrOutput, OcrProvider};
use crate::config::VendorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    config: VendorConfig,
    prompt: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: VendorConfig, prompt: String, client: reqwest::Client) -> Self {
        Self {
            config,
            prompt,
            client,
        }
    }
}

fn resolve_model(model: &str) -> &str {
    match model {
        "" | "claude-3.7-sonnet" | "claude-3-7-sonnet" => "claude-3-7-sonnet-20250219",
        other => other,
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: Source<'a> },
    Document { source: Source<'a> },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Source<'a> {
    Base64 { media_type: &'a str, data: String },
    Text { media_type: &'static str, data: String },
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

fn document_block(input: &OcrInput) -> ContentBlock<'_> {
    if input.is_image() {
        ContentBlock::Image {
            source: Source::Base64 {
                media_type: &input.mime_type,
                data: input.base64(),
            },
        }
    } else if input.is_text() {
        ContentBlock::Document {
            source: Source::Text {
                media_type: "text/plain",
                data: String::from_utf8_lossy(&input.data).into_owned(),
            },
        }
    } else {
        ContentBlock::Document {
            source: Source::Base64 {
                media_type: &input.mime_type,
                data: input.base64(),
            },
        }
    }
}

#[async_trait::async_trait]
impl OcrProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn process(&self, model: &str, input: &OcrInput) -> anyhow::Result<OcrOutput> {
        let api_key = self.config.require_key()?;
        let model = resolve_model(model);

        let request = MessagesRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: vec![document_block(input), ContentBlock::Text { text: &self.prompt }],
            }],
        };

        debug!("Sending request to Anthropic: model={}", model);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error ({}): {}", status, error_text);
        }

        let response: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        if let Some(usage) = &response.usage {
            info!(
                "Anthropic response: {} input tokens, {} output tokens",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<String>();

        Ok(OcrOutput::new(text, model))
    }
}
