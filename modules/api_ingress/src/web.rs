use axum::{
    http::{StatusCode, Uri},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// JSON 404 for paths no module registered
pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    tracing::debug!("No route for {}", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Route {} not found", uri.path()) })),
    )
}

/// Serve the merged OpenAPI document as static JSON (built once, no per-request work)
pub fn openapi_router(doc: utoipa::openapi::OpenApi) -> Router {
    let body = serde_json::to_value(&doc).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize OpenAPI document");
        json!({})
    });
    Router::new().route(
        "/openapi.json",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    )
}
