//! HTTP Router
//!
//! Sets up the axum router with the document, resource and WebSocket routes.

use axum::{
    Json, Router,
    extract::{Path, State, WebSocketUpgrade},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handler::handle_websocket;
use super::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // The view's document
        .route("/", get(document))
        // Scripts and other static files referenced by the document
        .route("/resources/*path", get(resource))
        // WebSocket endpoint - one bridge session per connection
        .route("/ws", get(ws_upgrade))
        // Health check for monitoring/load balancers
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        // CORS for development
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Document handler
async fn document(State(state): State<AppState>) -> Html<String> {
    Html(state.view().html())
}

/// Static resource handler
async fn resource(Path(path): Path<String>, State(state): State<AppState>) -> Response {
    match state.resources().load(&path).await {
        Some(resource) => (
            [(header::CONTENT_TYPE, resource.content_type)],
            resource.body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// WebSocket upgrade handler
async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.session_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::FileLoader;
    use crate::view::View;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(resources: FileLoader) -> Router {
        let view = View::new().with_body_html("<p id=\"demo\"></p>");
        create_router(AppState::new(view, resources))
    }

    async fn body_bytes(resp: Response) -> Vec<u8> {
        axum::body::to_bytes(resp.into_body(), 100_000)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let resp = app(FileLoader::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["sessions"], 0);
    }

    #[tokio::test]
    async fn test_document_endpoint() {
        let resp = app(FileLoader::default())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(html.contains("<p id=\"demo\"></p>"));
        assert!(html.contains("/resources/js/jigna.js"));
    }

    #[tokio::test]
    async fn test_resource_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.css"), "body {}").unwrap();
        let router = app(FileLoader::new(dir.path()));

        let resp = router
            .clone()
            .oneshot(Request::builder().uri("/resources/app.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/css");
        assert_eq!(body_bytes(resp).await, b"body {}");

        let resp = router
            .oneshot(Request::builder().uri("/resources/missing.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
