//! OCR Playground - compare document text extraction across AI providers.

mod catalog;
mod config;
mod dispatch;
mod error;
mod ocr;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use catalog::{ModelCatalog, ModelInfo, MAX_PANELS, MIN_PANELS};
use config::ServerConfig;
use dispatch::{Dispatcher, ModelRequest, SettledResult};
use error::ApiError;
use ocr::{OcrInput, ProviderRegistry};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    catalog: Arc<ModelCatalog>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_playground=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        "Vendors with API keys: {:?} (timeout {}s)",
        config.configured_vendors(),
        config.request_timeout.as_secs()
    );

    let catalog = ModelCatalog::load(&config)?;
    info!("Model catalog: {} models", catalog.models().len());

    let client = reqwest::Client::new();
    let registry = ProviderRegistry::from_config(&config, client);

    let state = AppState {
        dispatcher: Dispatcher::new(registry, config.request_timeout),
        catalog: Arc::new(catalog),
    };

    let app = build_router(state, &config.static_dir, config.max_upload_bytes);

    // Run server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState, static_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/ocr", post(process_document))
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
    defaults: Vec<ModelInfo>,
    min_panels: usize,
    max_panels: usize,
}

/// List the models the UI can put in a panel.
async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.catalog.models().to_vec(),
        defaults: state.catalog.defaults().into_iter().cloned().collect(),
        min_panels: MIN_PANELS,
        max_panels: MAX_PANELS,
    })
}

#[derive(serde::Serialize)]
struct OcrResponse {
    results: Vec<SettledResult>,
}

/// Upload a document and run it through every selected model.
async fn process_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut input: Option<OcrInput> = None;
    let mut models_json: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let mime_type = field
                    .content_type()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_MIME_TYPE)
                    .to_string();
                let data = field.bytes().await?.to_vec();
                input = Some(OcrInput {
                    filename,
                    mime_type,
                    data,
                });
            }
            Some("models") => models_json = Some(field.text().await?),
            _ => {}
        }
    }

    let input = input
        .filter(|i| !i.data.is_empty())
        .ok_or(ApiError::MissingFile)?;
    let models: Vec<ModelRequest> =
        serde_json::from_str(&models_json.ok_or(ApiError::MissingModels)?)?;

    if models.len() < MIN_PANELS {
        return Err(ApiError::NoModelsSelected);
    }
    if models.len() > MAX_PANELS {
        return Err(ApiError::TooManyModels(models.len()));
    }

    info!(
        "Received file: {} ({} bytes, {})",
        input.filename,
        input.data.len(),
        input.mime_type
    );

    let request_id = Uuid::new_v4().simple().to_string();
    let results = state
        .dispatcher
        .dispatch(&input, &models)
        .instrument(info_span!("ocr_request", id = %request_id))
        .await;

    Ok(Json(OcrResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrOutput, OcrProvider, ProviderKind};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::time::Duration;
    use tower::util::ServiceExt; // for `oneshot`

    const BOUNDARY: &str = "playground-test-boundary";

    /// Reports the document it was given, or fails when the model is "broken".
    struct StubProvider;

    #[async_trait::async_trait]
    impl OcrProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn process(&self, model: &str, input: &OcrInput) -> anyhow::Result<OcrOutput> {
            if model == "broken" {
                anyhow::bail!("Stub API error (500 Internal Server Error): overloaded");
            }
            Ok(OcrOutput::new(
                format!("{} {} {}", input.filename, input.mime_type, input.data.len()),
                model,
            ))
        }
    }

    fn setup_app() -> Router {
        let registry = ProviderRegistry::new()
            .with(ProviderKind::Mistral, StubProvider)
            .with(ProviderKind::OpenAi, StubProvider);
        let state = AppState {
            dispatcher: Dispatcher::new(registry, Duration::from_secs(5)),
            catalog: Arc::new(ModelCatalog::builtin()),
        };
        build_router(state, Path::new("static"), 1024 * 1024)
    }

    /// Build a multipart body with an optional file part and optional models part.
    fn multipart_request(
        file: Option<(&str, &str, &[u8])>,
        models: Option<&str>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        if let Some((name, mime, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                     Content-Type: {mime}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(models) = models {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"models\"\r\n\r\n{models}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/ocr")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn extract_json(body: Body) -> Value {
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("Should read body");
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_list_models() {
        let request = Request::builder().uri("/api/models").body(Body::empty()).unwrap();
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["models"].as_array().unwrap().len(), 4);
        assert_eq!(body["defaults"].as_array().unwrap().len(), 3);
        assert_eq!(body["max_panels"], 4);
        assert_eq!(body["min_panels"], 1);
    }

    #[tokio::test]
    async fn test_ocr_mixed_results() {
        let models = r#"[
            {"id": 1, "provider": "Mistral", "model": "mistral-ocr-latest"},
            {"id": 2, "provider": "OpenAI", "model": "broken"},
            {"id": 3, "provider": "Google", "model": "gemini-2.0-flash-exp"}
        ]"#;
        let request = multipart_request(
            Some(("scan.pdf", "application/pdf", &b"%PDF-1.7"[..])),
            Some(models),
        );
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);

        assert_eq!(results[0]["status"], "fulfilled");
        assert_eq!(results[0]["value"]["provider"], "Mistral");
        assert_eq!(results[0]["value"]["result"], "scan.pdf application/pdf 8");
        assert!(results[0]["value"]["processingTime"].is_u64());

        assert_eq!(results[1]["status"], "rejected");
        assert_eq!(
            results[1]["reason"],
            "Stub API error (500 Internal Server Error): overloaded"
        );

        // Google is not registered in the test app
        assert_eq!(results[2]["status"], "rejected");
        assert_eq!(results[2]["reason"], "Unsupported provider: Google");
    }

    #[tokio::test]
    async fn test_ocr_missing_file() {
        let request = multipart_request(None, Some(r#"[{"provider": "Mistral", "model": "m"}]"#));
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_ocr_empty_file() {
        let request = multipart_request(
            Some(("empty.pdf", "application/pdf", &b""[..])),
            Some(r#"[{"provider": "Mistral", "model": "m"}]"#),
        );
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ocr_invalid_models() {
        let request = multipart_request(
            Some(("a.pdf", "application/pdf", &b"x"[..])),
            Some("not json"),
        );
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid models field"));
    }

    #[tokio::test]
    async fn test_ocr_model_count_bounds() {
        let file = Some(("a.pdf", "application/pdf", &b"x"[..]));

        let response = setup_app()
            .oneshot(multipart_request(file, Some("[]")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let five = serde_json::to_string(&vec![
            serde_json::json!({"provider": "Mistral", "model": "m"});
            5
        ])
        .unwrap();
        let response = setup_app()
            .oneshot(multipart_request(file, Some(&five)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Too many models selected: 5 (max 4)");

        let response = setup_app()
            .oneshot(multipart_request(file, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ocr_defaults_mime_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/ocr")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"blob\"\r\n\r\n\
                 abc\r\n\
                 --{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"models\"\r\n\r\n\
                 [{{\"provider\": \"openai\", \"model\": \"gpt-4o\"}}]\r\n\
                 --{BOUNDARY}--\r\n"
            )))
            .unwrap();
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(
            body["results"][0]["value"]["result"],
            "blob application/octet-stream 3"
        );
    }

    #[tokio::test]
    async fn test_ocr_non_multipart_body_gets_json_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/ocr")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = setup_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body = extract_json(response.into_body()).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
    }
}
