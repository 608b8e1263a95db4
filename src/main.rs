//! 股票行情监控服务
//!
//! 定时轮询腾讯行情接口，解析自选股的最新价格和涨跌幅，
//! 通过 RESTful API 提供给菜单栏等界面使用

mod config;     // 配置加载与保存
mod error;      // 错误类型
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use crate::config::ConfigStore;
use crate::middleware::ApiKeyMiddleware;
use crate::services::QuoteService;

/// 应用程序入口
///
/// 加载配置，启动行情服务和 HTTP 服务器
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let store = ConfigStore::load();
    let config = store.config().clone();

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    store.log_source();

    if config.api.api_key.is_empty() {
        log::warn!("未设置 API Key，接口不做认证");
    }

    let service = web::Data::new(QuoteService::new(store)?);
    if config.watchlist.auto_start {
        if let Err(e) = service.start().await {
            log::warn!("自动开始监控失败: {}", e);
        }
    }

    let bind_addr = config.bind_addr();
    log::info!("启动行情监控服务: {}", bind_addr);

    let api_key = config.api.api_key.clone();
    let mut server = HttpServer::new({
        let service = service.clone();
        move || {
            App::new()
                .wrap(ApiKeyMiddleware::new(api_key.clone()))  // API Key 认证
                .wrap(Logger::default())  // 添加请求日志中间件
                .app_data(service.clone())
                .configure(handlers::config)  // 配置路由
        }
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(&bind_addr)?.run().await?;

    service.stop();
    Ok(())
}
