//! 公共常量和辅助函数

use chrono::Utc;
use chrono_tz::Asia::Shanghai;

// ==================== 腾讯行情 API 常量 ====================

/// 腾讯实时行情 API，批量请求格式为 `{host}/q=sh600000,sz000001`
pub const TENCENT_QUOTE_API: &str = "https://qt.gtimg.cn";
/// 请求来源页
pub const TENCENT_REFERER: &str = "https://gu.qq.com/";
/// 浏览器 User-Agent
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ==================== 响应字段 ====================

/// 单只股票至少需要的 `~` 字段数
pub const MIN_FIELD_COUNT: usize = 32;
/// 股票名称字段下标
pub const FIELD_NAME: usize = 1;
/// 当前价字段下标
pub const FIELD_PRICE: usize = 3;
/// 昨收价字段下标
pub const FIELD_PREV_CLOSE: usize = 4;

/// 获取北京时间字符串（ISO 8601 格式，带+08:00时区）
pub fn get_beijing_time() -> String {
    Utc::now().with_timezone(&Shanghai).to_rfc3339()
}

/// 拼接批量请求 URL
pub fn build_quote_url(endpoint: &str, symbols: &[String]) -> String {
    format!("{}/q={}", endpoint.trim_end_matches('/'), symbols.join(","))
}
