use crate::handler::{HandlerResponse, ResearchHandler};
use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Path the research handler is mounted on.
pub const RESEARCH_PATH: &str = "/api/research-agent";

/// Largest request body read on [`RESEARCH_PATH`].
pub const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Builds the HTTP router.
///
/// Every method on [`RESEARCH_PATH`] reaches the handler, which answers preflights
/// and rejects anything but POST itself. Only POST bodies are read off the wire.
pub fn router(handler: ResearchHandler) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(RESEARCH_PATH, any(research))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// Serves the router on `listener` until the process is stopped.
pub async fn serve(listener: TcpListener, handler: ResearchHandler) -> std::io::Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(handler)).await
}

async fn health() -> &'static str {
    "ok"
}

async fn research(State(handler): State<ResearchHandler>, request: Request) -> Response {
    let method = request.method().clone();
    if method != Method::POST {
        return handler.handle(&method, &[]).await.into_response();
    }

    match to_bytes(request.into_body(), MAX_REQUEST_BODY).await {
        Ok(body) => handler.handle(&method, &body).await.into_response(),
        Err(e) => {
            warn!("Rejected request body: {}", e);
            HandlerResponse::error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
                .into_response()
        }
    }
}
