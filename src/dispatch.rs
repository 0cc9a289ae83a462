//! Concurrent fan-out of one document to several models.
//!
//! Every requested model is started at once and awaited together. Each one
//! settles independently, so a failing vendor only rejects its own entry.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::ocr::{OcrInput, ProviderKind, ProviderRegistry};

/// Characters of each result echoed to the debug log.
const LOG_PREVIEW_CHARS: usize = 100;

/// One model selected in the UI. Other panel fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    pub provider: String,
    pub model: String,
}

/// Successful extraction for one model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrValue {
    pub provider: String,
    pub model: String,
    pub result: String,
    /// Wall-clock milliseconds.
    #[serde(rename = "processingTime")]
    pub processing_time: u64,
}

/// Outcome for one model, shaped like a JavaScript `PromiseSettledResult`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SettledResult {
    Fulfilled { value: OcrValue },
    Rejected { reason: String },
}

impl SettledResult {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }
}

/// Key the browser page uses to match a result to its panel.
pub fn result_key(provider: &str, model: &str) -> String {
    format!("{}-{}", provider, model).to_lowercase()
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: ProviderRegistry,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Run every model against `input`; one entry per model, in request order.
    pub async fn dispatch(&self, input: &OcrInput, models: &[ModelRequest]) -> Vec<SettledResult> {
        info!(
            "Processing file: {} ({}) with models: {:?}",
            input.filename,
            input.mime_type,
            models
                .iter()
                .map(|m| format!("{}/{}", m.provider, m.model))
                .collect::<Vec<_>>()
        );

        let results = join_all(models.iter().map(|m| self.run_one(input, m))).await;

        let fulfilled = results.iter().filter(|r| r.is_fulfilled()).count();
        info!(
            "All processing completed: {} fulfilled, {} rejected",
            fulfilled,
            results.len() - fulfilled
        );
        results
    }

    async fn run_one(&self, input: &OcrInput, request: &ModelRequest) -> SettledResult {
        let start = Instant::now();
        info!("Starting {} processing...", request.provider);

        match self.extract(input, request).await {
            Ok(text) => {
                let elapsed = start.elapsed();
                info!(
                    "{} completed in {:.2}s",
                    request.provider,
                    elapsed.as_secs_f64()
                );
                debug!(
                    "{} result ({} chars): {}",
                    result_key(&request.provider, &request.model),
                    text.chars().count(),
                    text.chars().take(LOG_PREVIEW_CHARS).collect::<String>()
                );
                SettledResult::Fulfilled {
                    value: OcrValue {
                        provider: request.provider.clone(),
                        model: request.model.clone(),
                        result: text,
                        processing_time: elapsed.as_millis() as u64,
                    },
                }
            }
            Err(reason) => {
                error!("{} processing failed: {}", request.provider, reason);
                SettledResult::Rejected { reason }
            }
        }
    }

    async fn extract(&self, input: &OcrInput, request: &ModelRequest) -> Result<String, String> {
        let provider = ProviderKind::parse(&request.provider)
            .and_then(|kind| self.registry.get(kind))
            .ok_or_else(|| format!("Unsupported provider: {}", request.provider))?;

        match tokio::time::timeout(self.timeout, provider.process(&request.model, input)).await {
            Ok(Ok(output)) => {
                debug!(
                    "{} answered with model {}",
                    provider.name(),
                    output.resolved_model
                );
                Ok(output.text)
            }
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(_) => Err(format!(
                "{} timed out after {}s",
                request.provider,
                self.timeout.as_secs()
            )),
        }
    }
}
