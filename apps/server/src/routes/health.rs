use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

use crate::state::AppState;

macros_utils::routes! {
    route liveness,
    route readiness,
}

/// Liveness route
/// This route returns no content, the response status is enough.
#[get("/health")]
pub async fn liveness() -> impl Responder {
    HttpResponse::Ok()
}

/// Readiness route, answers 503 while the device store cannot be queried
#[get("/health/ready")]
pub async fn readiness(state: web::Data<AppState>) -> impl Responder {
    match state.repository.get("").await {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => {
            tracing::warn!("Readiness check failed: {e}");
            HttpResponse::ServiceUnavailable().json(json!({ "error": e.to_string() }))
        }
    }
}
