//! Mistral OCR provider (uses Mistral's native OCR API).
//!
//! Three sequential calls: upload the file, ask for a signed download URL,
//! then run OCR against that URL.

use super::{OcrInput, OcrOutput, OcrProvider};
use crate::config::VendorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const OCR_MODEL: &str = "mistral-ocr-latest";
/// Lifetime of the signed URL, in hours.
const SIGNED_URL_EXPIRY_HOURS: u32 = 24;

pub struct MistralOcrProvider {
    config: VendorConfig,
    client: reqwest::Client,
}

impl MistralOcrProvider {
    pub fn new(config: VendorConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

// ── Mistral API request/response types ──────────────────────────────────────

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: DocumentSource,
    include_image_base64: bool,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum DocumentSource {
    #[serde(rename = "document_url")]
    Document { document_url: String },
    #[serde(rename = "image_url")]
    Image { image_url: String },
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<MistralPage>,
}

#[derive(Deserialize)]
struct MistralPage {
    markdown: String,
}

#[derive(Deserialize)]
struct FileUploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    url: String,
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl OcrProvider for MistralOcrProvider {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn process(&self, _model: &str, input: &OcrInput) -> anyhow::Result<OcrOutput> {
        let api_key = self.config.require_key()?;

        let file_id = self.upload_file(api_key, input).await?;
        let signed_url = self.signed_url(api_key, &file_id).await?;

        let document = if input.is_image() {
            DocumentSource::Image {
                image_url: signed_url,
            }
        } else {
            DocumentSource::Document {
                document_url: signed_url,
            }
        };

        let body = OcrRequest {
            model: OCR_MODEL,
            document,
            include_image_base64: false,
        };

        info!("MistralOcrProvider: calling OCR API");

        let resp = self
            .client
            .post(format!("{}/v1/ocr", self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Mistral OCR")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Mistral OCR processing failed ({}): {}", status, text);
        }

        let raw_text = resp.text().await?;
        debug!(
            "MistralOcrProvider: raw response ({} bytes): {}",
            raw_text.len(),
            preview(&raw_text, 500)
        );
        let ocr: OcrResponse =
            serde_json::from_str(&raw_text).context("Failed to parse Mistral OCR response")?;

        info!("MistralOcrProvider: {} pages", ocr.pages.len());

        let markdown = ocr
            .pages
            .iter()
            .map(|p| p.markdown.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(OcrOutput::new(markdown, OCR_MODEL))
    }
}

impl MistralOcrProvider {
    /// Upload raw bytes to Mistral Files API, return the file_id.
    async fn upload_file(&self, api_key: &str, input: &OcrInput) -> anyhow::Result<String> {
        use reqwest::multipart::{Form, Part};

        info!(
            "MistralOcrProvider: uploading {} ({} bytes) to Files API",
            input.filename,
            input.data.len()
        );

        let part = Part::bytes(input.data.clone())
            .file_name(input.filename.clone())
            .mime_str(&input.mime_type)?;

        let form = Form::new().text("purpose", "ocr").part("file", part);

        let resp = self
            .client
            .post(format!("{}/v1/files", self.config.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload to Mistral Files API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Mistral file upload failed ({}): {}", status, text);
        }

        let upload: FileUploadResponse = resp
            .json()
            .await
            .context("Failed to parse Mistral upload response")?;
        info!("MistralOcrProvider: uploaded file_id={}", upload.id);
        Ok(upload.id)
    }

    async fn signed_url(&self, api_key: &str, file_id: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .get(format!("{}/v1/files/{}/url", self.config.base_url, file_id))
            .query(&[("expiry", SIGNED_URL_EXPIRY_HOURS)])
            .bearer_auth(api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to request Mistral signed URL")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Failed to get signed URL ({}): {}", status, text);
        }

        let signed: SignedUrlResponse = resp
            .json()
            .await
            .context("Failed to parse Mistral signed URL response")?;
        debug!("MistralOcrProvider: signed URL issued for {}", file_id);
        Ok(signed.url)
    }
}

/// First `max` bytes of `s`, cut on a char boundary.
fn preview(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
