use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use crate::error::ServiceError;
use crate::models::{ApiResponse, DisplayMode};
use crate::services::QuoteService;

/// 自选股设置请求
#[derive(Debug, Deserialize)]
pub struct SymbolsRequest {
    /// 逗号分隔的股票代码
    pub symbols: String,
}

/// 刷新间隔设置请求
#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    /// 刷新间隔（秒）
    pub interval: u64,
}

/// 显示选项设置请求
#[derive(Debug, Deserialize)]
pub struct DisplayModeRequest {
    pub display_mode: DisplayMode,
}

fn error_response(e: ServiceError) -> HttpResponse {
    let response = ApiResponse::<()>::error(e.to_string());
    match e {
        ServiceError::NoSymbols => HttpResponse::BadRequest().json(response),
        ServiceError::Running => HttpResponse::Conflict().json(response),
        ServiceError::BoardClosed | ServiceError::Config(_) => {
            log::error!("{}", e);
            HttpResponse::InternalServerError().json(response)
        }
    }
}

pub async fn set_symbols(
    service: web::Data<QuoteService>,
    body: web::Json<SymbolsRequest>,
) -> Result<HttpResponse> {
    match service.set_symbols(&body.symbols).await {
        Ok(_) => Ok(HttpResponse::Ok().json(ApiResponse::success(service.quotes()))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn set_interval(
    service: web::Data<QuoteService>,
    body: web::Json<IntervalRequest>,
) -> Result<HttpResponse> {
    match service.set_interval(body.interval).await {
        Ok(_) => Ok(HttpResponse::Ok().json(ApiResponse::success(service.status().await))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn set_display_mode(
    service: web::Data<QuoteService>,
    body: web::Json<DisplayModeRequest>,
) -> Result<HttpResponse> {
    match service.set_display_mode(body.display_mode).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(service.menu_bar_label().await))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn start_polling(service: web::Data<QuoteService>) -> Result<HttpResponse> {
    match service.start().await {
        Ok(_) => Ok(HttpResponse::Ok().json(ApiResponse::success(service.status().await))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn stop_polling(service: web::Data<QuoteService>) -> Result<HttpResponse> {
    service.stop();
    Ok(HttpResponse::Ok().json(ApiResponse::success(service.status().await)))
}

pub async fn polling_status(service: web::Data<QuoteService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(service.status().await)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/watchlist")
            .route("/symbols", web::put().to(set_symbols))
            .route("/interval", web::put().to(set_interval))
            .route("/display-mode", web::put().to(set_display_mode))
    )
    .service(
        web::scope("/polling")
            .route("/start", web::post().to(start_polling))
            .route("/stop", web::post().to(stop_polling))
            .route("/status", web::get().to(polling_status))
    );
}
