use actix_cors::Cors;
use actix_web::middleware::{Compress, Logger};
use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;

use super::{document_handler, handlers, middleware, share_handler};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health checks
        .route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check))
        .route("/metrics", web::get().to(metrics_endpoint))
        // Public share routes: the token is the authorization
        .service(
            web::scope("/invoice/share")
                .route("/{token}", web::get().to(share_handler::public_share_page))
                .route(
                    "/{token}/pdf",
                    web::get().to(share_handler::public_share_pdf),
                ),
        )
        // API v1
        .service(
            web::scope("/api/v1")
                .wrap(HttpAuthentication::bearer(middleware::auth::validator))
                .wrap(Compress::default())
                .wrap(Logger::default())
                .wrap(
                    Cors::default()
                        .allowed_origin_fn(|origin, _req_head| {
                            origin.as_bytes().starts_with(b"http://localhost")
                                || origin.as_bytes().starts_with(b"https://")
                        })
                        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                        .allowed_headers(vec!["Content-Type", "Authorization"])
                        .max_age(3600),
                )
                .route("/dashboard", web::get().to(handlers::dashboard))
                .service(
                    web::scope("/companies")
                        .route("", web::get().to(handlers::list_companies))
                        .route("", web::post().to(handlers::create_company))
                        .route("/{id}", web::get().to(handlers::get_company))
                        .route("/{id}", web::put().to(handlers::update_company))
                        .route("/{id}", web::delete().to(handlers::delete_company)),
                )
                .service(
                    web::scope("/customers")
                        .route("", web::get().to(handlers::list_customers))
                        .route("", web::post().to(handlers::create_customer))
                        .route("/{id}", web::get().to(handlers::get_customer))
                        .route("/{id}", web::put().to(handlers::update_customer))
                        .route("/{id}", web::delete().to(handlers::delete_customer)),
                )
                .service(
                    web::scope("/invoices")
                        .route("", web::get().to(handlers::list_invoices))
                        .route("", web::post().to(handlers::create_invoice))
                        .route("/{id}", web::get().to(handlers::get_invoice))
                        .route("/{id}", web::delete().to(handlers::delete_invoice))
                        .route("/{id}/status", web::post().to(handlers::set_invoice_status))
                        .route("/{id}/payments", web::get().to(handlers::list_payments))
                        .route("/{id}/payments", web::post().to(handlers::add_payment))
                        .route("/{id}/share", web::post().to(share_handler::create_share))
                        .route(
                            "/{id}/share-message",
                            web::get().to(document_handler::get_share_message),
                        )
                        .route("/{id}/pdf", web::get().to(document_handler::get_invoice_pdf))
                        .route(
                            "/{id}/preview",
                            web::get().to(document_handler::get_invoice_preview),
                        )
                        .route(
                            "/{id}/capture",
                            web::post().to(document_handler::capture_invoice_pdf),
                        ),
                ),
        );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

async fn readiness_check(state: web::Data<crate::api::ApiState>) -> HttpResponse {
    let store_healthy = state.store.ping().await.is_ok();

    if store_healthy {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "checks": { "store": "ok" }
        }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "not_ready",
            "checks": { "store": "failed" }
        }))
    }
}

async fn metrics_endpoint() -> HttpResponse {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}
