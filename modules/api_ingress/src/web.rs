use axum::{http::Uri, response::Json};
use modkit::api::problem::ProblemResponse;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Fallback for paths no module registered.
pub async fn not_found(uri: Uri) -> ProblemResponse {
    let ProblemResponse(problem) =
        modkit::not_found(format!("no route for {}", uri.path()));
    ProblemResponse(problem.with_instance(uri.path()))
}
