//! 行情合并
//!
//! 把本轮解析结果合并进现有记录：顺序和长度不变，本轮没有解析到的记录原样保留。

use std::collections::HashMap;

use crate::models::{Quote, QuoteRecord};

pub fn merge(current: &[QuoteRecord], parsed: &HashMap<String, Quote>) -> Vec<QuoteRecord> {
    current
        .iter()
        .map(|record| match parsed.get(&record.symbol) {
            Some(quote) => QuoteRecord {
                id: record.id,
                symbol: record.symbol.clone(),
                quote: Some(quote.clone()),
            },
            None => record.clone(),
        })
        .collect()
}
