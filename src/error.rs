//! 错误类型
//!
//! 抓取周期内的失败统一由 [`FetchError`] 表示，只在本地记录日志，
//! 不会中断调度器；单只股票的字段缺失或价格无法解析不是错误，只是从解析结果中省略。

use reqwest::StatusCode;
use thiserror::Error;

/// 单次行情抓取失败的原因
#[derive(Error, Debug)]
pub enum FetchError {
    /// 传输层失败（连接、超时、读取响应体）
    #[error("请求行情失败: {0}")]
    Network(#[from] reqwest::Error),

    /// 服务端返回非 2xx 状态码
    #[error("行情接口返回异常状态: {0}")]
    Status(StatusCode),

    /// 响应体为空
    #[error("未收到行情数据")]
    EmptyResponse,

    /// 所有候选编码都无法解码响应体
    #[error("无法解码行情数据，已尝试: {tried}")]
    Decode { tried: String },
}

/// 行情服务控制面的错误
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 没有可轮询的股票代码
    #[error("请输入至少一个股票代码")]
    NoSymbols,

    /// 轮询进行中，不允许修改轮询参数
    #[error("监控进行中，请先停止监控再修改设置")]
    Running,

    /// 记录表任务已退出
    #[error("行情记录表已关闭")]
    BoardClosed,

    /// 配置读写失败
    #[error("配置保存失败: {0}")]
    Config(#[from] anyhow::Error),
}
