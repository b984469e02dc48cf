use crate::pipeline::ResearchPipeline;
use crate::progress::LogProgress;
use crate::types::ResearchRequest;
use crate::ResearchError;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// CORS headers attached to every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", "Content-Type"),
    ("access-control-allow-methods", "POST, OPTIONS"),
];

/// A fully shaped handler response.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HandlerResponse {
    fn json(status: StatusCode, body: &impl serde::Serialize) -> Self {
        let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
        Self { status, body }
    }

    pub(crate) fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(status, &json!({ "error": message.into() }))
    }

    /// The `error` field of an error body, if any.
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()?
            .get("error")?
            .as_str()
            .map(str::to_string)
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();
        for (name, value) in CORS_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// The `ResearchHandler` struct maps one HTTP exchange onto the research pipeline.
#[derive(Clone)]
pub struct ResearchHandler {
    pipeline: Arc<ResearchPipeline>,
}

impl ResearchHandler {
    pub fn new(pipeline: Arc<ResearchPipeline>) -> Self {
        Self { pipeline }
    }

    /// Handles one request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method. OPTIONS is answered as a preflight, anything other
    ///   than POST is rejected before the body is looked at.
    /// * `body` - The raw request body.
    ///
    /// # Returns
    ///
    /// The status and JSON body to send back.
    pub async fn handle(&self, method: &Method, body: &[u8]) -> HandlerResponse {
        if *method == Method::OPTIONS {
            return HandlerResponse {
                status: StatusCode::OK,
                body: String::new(),
            };
        }
        if *method != Method::POST {
            return HandlerResponse::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        }

        let request: ResearchRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                error!("JSON parse error: {}", e);
                return HandlerResponse::error(
                    StatusCode::BAD_REQUEST,
                    "Invalid JSON in request body",
                );
            }
        };

        match self.pipeline.run(&request, &LogProgress).await {
            Ok(profile) => HandlerResponse::json(StatusCode::OK, &profile),
            Err(e) => {
                error!("Research failed: {}", e);
                HandlerResponse::error(e.status_code(), error_message(&e))
            }
        }
    }
}

/// The message sent back to the caller for a failed run.
fn error_message(error: &ResearchError) -> String {
    match error {
        ResearchError::InvalidRequest(_)
        | ResearchError::MissingApiKey(_)
        | ResearchError::FetchError(_)
        | ResearchError::UpstreamStatus(_)
        | ResearchError::ContentTooLarge => error.to_string(),
        ResearchError::SynthesisError(_) => format!("AI analysis failed: {}", error),
        other => format!("Research failed: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKeys, ResearchConfig};
    use crate::http::testing::ScriptedTransport;

    fn handler(transport: Arc<ScriptedTransport>, keys: ApiKeys) -> ResearchHandler {
        let pipeline = ResearchPipeline::new(&ResearchConfig::default(), transport, keys);
        ResearchHandler::new(Arc::new(pipeline))
    }

    fn keys() -> ApiKeys {
        ApiKeys::new(Some("gm".into()), None)
    }

    #[tokio::test]
    async fn test_preflight() {
        let response = handler(Arc::new(ScriptedTransport::new()), keys())
            .handle(&Method::OPTIONS, b"")
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_other_methods_rejected_without_reading_body() {
        let transport = Arc::new(ScriptedTransport::new());
        let handler = handler(transport.clone(), keys());

        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let response = handler.handle(&method, b"not json at all").await;
            assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.error_message().as_deref(), Some("Method not allowed"));
        }
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_bodies_are_400() {
        let transport = Arc::new(ScriptedTransport::new());
        let handler = handler(transport.clone(), keys());

        let response = handler.handle(&Method::POST, b"{oops").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.error_message().as_deref(),
            Some("Invalid JSON in request body")
        );

        let response = handler.handle(&Method::POST, br#"{"includeExternal": false}"#).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error_message().as_deref(), Some("Website URL is required"));

        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_loosely_typed_fields_are_accepted() {
        let handler = handler(Arc::new(ScriptedTransport::new()), ApiKeys::default());

        for body in [
            r#"{"websiteUrl": "https://acme.io", "maxPages": null}"#,
            r#"{"websiteUrl": "https://acme.io", "maxPages": -1}"#,
            r#"{"websiteUrl": "https://acme.io", "maxPages": "5"}"#,
            r#"{"websiteUrl": "https://acme.io", "includeExternal": null}"#,
            r#"{"websiteUrl": "https://acme.io", "includeExternal": "yes"}"#,
        ] {
            let response = handler.handle(&Method::POST, body.as_bytes()).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", body);
            assert!(
                response.error_message().unwrap().contains("GEMINI_API_KEY"),
                "{}",
                body
            );
        }
    }

    #[tokio::test]
    async fn test_null_include_external_skips_research() {
        let transport = Arc::new(
            ScriptedTransport::new().reply(200, "<title>Acme</title>").reply(
                200,
                json!({"candidates": [{"content": {"parts": [{"text": "{}"}]}}]}).to_string(),
            ),
        );

        let response = handler(transport.clone(), ApiKeys::new(Some("gm".into()), Some("tv".into())))
            .handle(
                &Method::POST,
                br#"{"websiteUrl": "https://acme.io", "maxPages": "ten", "includeExternal": null}"#,
            )
            .await;

        assert_eq!(response.status, StatusCode::OK);
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].method, "POST");
        assert!(calls[1].url.contains(":generateContent"));
    }

    #[tokio::test]
    async fn test_missing_model_key_is_400() {
        let response = handler(Arc::new(ScriptedTransport::new()), ApiKeys::default())
            .handle(&Method::POST, br#"{"websiteUrl": "https://acme.io"}"#)
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.error_message().unwrap().contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn test_bad_model_output_is_500() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, "<title>Acme</title>")
                .reply(
                    200,
                    json!({"candidates": [{"content": {"parts": [{"text": "no json here"}]}}]})
                        .to_string(),
                ),
        );

        let response = handler(transport, keys())
            .handle(&Method::POST, br#"{"websiteUrl": "https://acme.io"}"#)
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = response.error_message().unwrap();
        assert!(message.starts_with("AI analysis failed: AI synthesis failed:"));
    }

    #[tokio::test]
    async fn test_success_returns_profile() {
        let transport = Arc::new(
            ScriptedTransport::new().reply(200, "<title>Acme</title>").reply(
                200,
                json!({"candidates": [{"content": {"parts": [{"text": "{\"company_name\": \"Acme\", \"confidence_score\": \"High\"}"}]}}]})
                    .to_string(),
            ),
        );

        let response = handler(transport, keys())
            .handle(
                &Method::POST,
                br#"{"websiteUrl": "https://acme.io", "includeExternal": false}"#,
            )
            .await;

        assert_eq!(response.status, StatusCode::OK);
        let profile: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(profile["website_url"], "https://acme.io");
        assert_eq!(profile["confidence_score"], "High");
    }

    #[test]
    fn test_into_response_sets_cors() {
        let response = HandlerResponse::error(StatusCode::BAD_REQUEST, "x").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.headers()["access-control-allow-methods"], "POST, OPTIONS");
    }
}
