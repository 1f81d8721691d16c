//! Shared test utilities
//!
//! Throwaway HTTP servers for exercising the real reqwest clients against a
//! local socket instead of live APIs. Available to dependents via the
//! `test-utils` feature.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// A one-response HTTP server on a random local port. Shuts down on drop.
pub struct MockHttpServer {
    pub url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockHttpServer {
    /// Serve the given status and JSON body for every request, any path.
    pub async fn json(status: StatusCode, body: Value) -> Self {
        let app = Router::new()
            .fallback(respond)
            .with_state((status, body));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .expect("mock server");
        });

        MockHttpServer {
            url: format!("http://{}", addr),
            shutdown: Some(tx),
        }
    }
}

async fn respond(State((status, body)): State<(StatusCode, Value)>) -> impl IntoResponse {
    (status, Json(body))
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Wrap model output text in the generateContent response envelope.
pub fn gemini_text_response(text: &str) -> Value {
    json!({
        "candidates": [
            {"content": {"parts": [{"text": text}]}}
        ]
    })
}
