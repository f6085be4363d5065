pub mod dashboard;
pub mod resource_handlers;

use actix_web::{HttpResponse, web};

use crate::auth;

/// GET /api/health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Route table. Everything but the health check requires a session.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health)).service(
        web::scope("/api")
            .wrap(actix_web::middleware::from_fn(auth::middleware::require_auth))
            .route("/dashboard", web::get().to(dashboard::index))
            // /tickets/category/{category} BEFORE /resources/{resource}
            .route("/tickets/category/{category}", web::get().to(resource_handlers::by_category))
            .route("/resources/{resource}", web::get().to(resource_handlers::list)),
    );
}
