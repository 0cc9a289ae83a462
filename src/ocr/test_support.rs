//! In-process mock vendor servers for adapter tests.

use axum::Router;

use crate::config::VendorConfig;
use crate::ocr::OcrInput;

/// Serve `app` on an ephemeral localhost port, returning its base URL.
pub async fn spawn_mock(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn vendor(base_url: &str, api_key: Option<&str>) -> VendorConfig {
    VendorConfig {
        key_var: "TEST_API_KEY",
        api_key: api_key.map(str::to_string),
        base_url: base_url.to_string(),
    }
}

pub fn pdf_input() -> OcrInput {
    OcrInput {
        filename: "invoice.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        data: b"%PDF-1.4 test".to_vec(),
    }
}

pub fn png_input() -> OcrInput {
    OcrInput {
        filename: "scan.png".to_string(),
        mime_type: "image/png".to_string(),
        data: vec![0x89, b'P', b'N', b'G'],
    }
}
