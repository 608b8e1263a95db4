use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use crate::models::ApiResponse;
use crate::services::QuoteService;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    is_updating: bool,
    tracked: usize,
}

pub async fn health_check(service: web::Data<QuoteService>) -> Result<HttpResponse> {
    let health = Health {
        status: "healthy",
        is_updating: service.is_updating(),
        tracked: service.quotes().quotes.len(),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(health)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
