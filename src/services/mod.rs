//! 业务逻辑服务模块
//! 
//! 封装行情抓取、解析、合并和轮询调度

pub mod board;          // 单写者行情记录表
pub mod quote;          // 腾讯行情抓取与解析
pub mod quote_service;  // 行情监控服务
pub mod scheduler;      // 轮询调度器

pub use quote_service::QuoteService;
