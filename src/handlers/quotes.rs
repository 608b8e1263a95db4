use std::time::Duration;

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use crate::models::ApiResponse;
use crate::services::QuoteService;

/// 长轮询最长等待时间（秒）
const MAX_WAIT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    /// 等待秒数，默认 30
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
}

fn default_wait_secs() -> u64 { 30 }

/// 当前行情列表，顺序与自选股一致
pub async fn list_quotes(service: web::Data<QuoteService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(service.quotes())))
}

/// 等待行情变化后返回列表，超时则返回当前列表
pub async fn watch_quotes(
    service: web::Data<QuoteService>,
    query: web::Query<ChangesQuery>,
) -> Result<HttpResponse> {
    let wait = Duration::from_secs(query.wait_secs.min(MAX_WAIT_SECS));
    let list = service.wait_for_change(wait).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}

/// 菜单栏标签
pub async fn menu_bar_label(service: web::Data<QuoteService>) -> Result<HttpResponse> {
    let label = service.menu_bar_label().await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(label)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/quotes")
            .route("", web::get().to(list_quotes))
            .route("/label", web::get().to(menu_bar_label))
            .route("/changes", web::get().to(watch_quotes))
    );
}
