//! 腾讯行情响应解析
//!
//! 响应由若干条 `v_<代码>="字段0~字段1~...~字段N"` 语句组成，语句之间用 `;` 或换行分隔。
//! 优先用正则提取；正则一条都没有匹配到时，再按 `;` 切分做一次宽松解析。
//! 单条语句格式不对只会被跳过，不影响同一批中的其它股票。

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::common::{FIELD_NAME, FIELD_PREV_CLOSE, FIELD_PRICE, MIN_FIELD_COUNT};
use crate::models::Quote;

/// 引号内的值不允许跨越语句分隔符，避免一条未闭合的语句吞掉下一条
static STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"v_([A-Za-z0-9_.]+)\s*=\s*"([^";\r\n]*)""#).expect("行情语句正则无效")
});

/// 解析行情响应文本，返回 代码 -> 行情
pub fn parse_quotes(text: &str) -> HashMap<String, Quote> {
    let parsed = parse_primary(text);
    if !parsed.is_empty() {
        return parsed;
    }

    log::debug!("正则未匹配到行情，使用备用方法解析");
    parse_fallback(text)
}

fn parse_primary(text: &str) -> HashMap<String, Quote> {
    let mut quotes = HashMap::new();

    for cap in STATEMENT_RE.captures_iter(text) {
        let symbol = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        let value = cap.get(2).map(|m| m.as_str()).unwrap_or("");

        if let Some(quote) = parse_fields(symbol, value) {
            quotes.insert(symbol.to_string(), quote);
        }
    }

    quotes
}

fn parse_fallback(text: &str) -> HashMap<String, Quote> {
    let mut quotes = HashMap::new();

    for fragment in text.split(';') {
        if !(fragment.contains("v_") && fragment.contains("=\"")) {
            continue;
        }

        let Some((key, value)) = fragment.split_once('=') else {
            continue;
        };
        let Some(marker) = key.find("v_") else {
            continue;
        };

        let symbol = key[marker + 2..].trim();
        let value = value.trim().trim_matches('"');
        if symbol.is_empty() {
            continue;
        }

        if let Some(quote) = parse_fields(symbol, value) {
            quotes.insert(symbol.to_string(), quote);
        }
    }

    quotes
}

/// 解析单只股票的 `~` 字段列表，字段不足或价格无效时返回 `None`
fn parse_fields(symbol: &str, value: &str) -> Option<Quote> {
    let fields: Vec<&str> = value.split('~').collect();
    if fields.len() < MIN_FIELD_COUNT {
        log::debug!("{} 字段不足: {} < {}", symbol, fields.len(), MIN_FIELD_COUNT);
        return None;
    }

    let name = fields[FIELD_NAME].trim();
    let price_text = fields[FIELD_PRICE].trim();
    let price = parse_price(price_text)?;
    let prev_close = parse_price(fields[FIELD_PREV_CLOSE])?;

    if prev_close == 0.0 {
        log::debug!("{} 昨收价为 0，无法计算涨跌幅", symbol);
        return None;
    }

    let change_percent = (price - prev_close) / prev_close * 100.0;

    Some(Quote {
        name: name.to_string(),
        price,
        price_text: price_text.to_string(),
        prev_close,
        change_percent,
    })
}

/// `f64::from_str` 接受 `inf`/`NaN`，这里只保留有限值
fn parse_price(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
