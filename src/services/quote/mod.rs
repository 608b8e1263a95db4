//! 腾讯行情服务
//!
//! 抓取 → 解码 → 解析 → 合并，各步骤相互独立：
//! - `fetcher`：批量请求并按候选编码解码
//! - `parser`：纯函数，文本 → 代码到行情的映射
//! - `reconcile`：纯函数，把解析结果合并进现有记录

mod charset;
mod common;
pub mod fetcher;
mod parser;
mod reconcile;

pub use charset::{Charset, DEFAULT_CHARSETS};
pub use common::{get_beijing_time, TENCENT_QUOTE_API};
pub use fetcher::QuoteFetcher;
pub use reconcile::merge;
