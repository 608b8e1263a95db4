//! 腾讯行情抓取
//!
//! 对接 https://qt.gtimg.cn/q=<代码1>,<代码2>,...，一次请求取回全部自选股

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;

use super::charset::{decode_with_fallback, Charset};
use super::common::{build_quote_url, TENCENT_REFERER, USER_AGENT};
use super::parser::parse_quotes;
use crate::config::{ApiConfig, QuotesConfig};
use crate::error::FetchError;
use crate::models::Quote;

/// 行情抓取器
///
/// 持有一个复用的 HTTP 客户端，只负责请求和解码，合并由记录表完成。
#[derive(Debug, Clone)]
pub struct QuoteFetcher {
    /// HTTP 客户端
    client: Client,
    /// 行情接口地址
    endpoint: String,
    /// 候选编码
    charsets: Vec<Charset>,
}

impl QuoteFetcher {
    pub fn new(api: &ApiConfig, quotes: &QuotesConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: quotes.endpoint.clone(),
            charsets: quotes.charsets.clone(),
        })
    }

    /// 批量请求行情，返回解码后的响应文本
    pub async fn fetch(&self, symbols: &[String]) -> Result<String, FetchError> {
        let url = build_quote_url(&self.endpoint, symbols);
        log::debug!("📡 请求行情数据 URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Referer", TENCENT_REFERER)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyResponse);
        }

        match decode_with_fallback(&bytes, &self.charsets) {
            Some((text, charset)) => {
                log::trace!("使用 {} 编码解析成功", charset.name());
                Ok(text)
            }
            None => Err(FetchError::Decode {
                tried: self
                    .charsets
                    .iter()
                    .map(|c| c.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// 请求并解析行情
    pub async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>, FetchError> {
        let text = self.fetch(symbols).await?;
        let quotes = parse_quotes(&text);
        log::debug!("📊 解析到 {}/{} 只股票行情", quotes.len(), symbols.len());
        Ok(quotes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::quote::common::MIN_FIELD_COUNT;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 生成一条字段数足够的行情语句
    pub(crate) fn quote_statement(symbol: &str, name: &str, price: &str, prev_close: &str) -> String {
        let mut fields: Vec<String> = (0..MIN_FIELD_COUNT + 4).map(|i| i.to_string()).collect();
        fields[1] = name.to_string();
        fields[3] = price.to_string();
        fields[4] = prev_close.to_string();
        format!("v_{}=\"{}\";\n", symbol, fields.join("~"))
    }

    /// 启动一个只会返回固定响应的本地 HTTP 服务，返回其地址
    pub(crate) async fn serve_fixed(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let head = format!(
                        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    pub(crate) fn fetcher_for(endpoint: &str, charsets: Vec<Charset>) -> QuoteFetcher {
        let quotes = QuotesConfig {
            endpoint: endpoint.to_string(),
            charsets,
        };
        QuoteFetcher::new(&ApiConfig::default(), &quotes).unwrap()
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fetch_gbk_response() {
        println!("\n========== 测试抓取 GBK 编码行情 ==========");
        let text = quote_statement("sh600000", "浦发银行", "10.50", "10.00")
            + &quote_statement("sz000001", "平安银行", "9.50", "10.00");
        let (bytes, _, _) = encoding_rs::GBK.encode(&text);
        let endpoint = serve_fixed("200 OK", bytes.into_owned()).await;

        let fetcher = fetcher_for(&endpoint, crate::services::quote::DEFAULT_CHARSETS.to_vec());
        let quotes = fetcher
            .fetch_quotes(&symbols(&["sh600000", "sz000001"]))
            .await
            .unwrap();

        for (symbol, quote) in &quotes {
            println!("  {} {} {} {}", symbol, quote.name, quote.price_text, quote.change_percent_text());
        }
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["sh600000"].name, "浦发银行");
        assert_eq!(quotes["sz000001"].change_percent_text(), "-5.00%");
        println!("✅ GBK 行情抓取测试通过！");
    }

    #[tokio::test]
    async fn test_empty_body() {
        let endpoint = serve_fixed("200 OK", Vec::new()).await;
        let fetcher = fetcher_for(&endpoint, crate::services::quote::DEFAULT_CHARSETS.to_vec());

        let err = fetcher.fetch(&symbols(&["sh600000"])).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyResponse), "{err}");
    }

    #[tokio::test]
    async fn test_bad_status() {
        let endpoint = serve_fixed("503 Service Unavailable", b"busy".to_vec()).await;
        let fetcher = fetcher_for(&endpoint, crate::services::quote::DEFAULT_CHARSETS.to_vec());

        let err = fetcher.fetch(&symbols(&["sh600000"])).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503), "{err}");
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let endpoint = serve_fixed("200 OK", vec![0xFF, 0xFE, 0xFF]).await;
        let fetcher = fetcher_for(&endpoint, vec![Charset::Gb18030, Charset::Utf8, Charset::Ascii]);

        let err = fetcher.fetch(&symbols(&["sh600000"])).await.unwrap_err();
        match err {
            FetchError::Decode { tried } => assert_eq!(tried, "gb18030, utf-8, ascii"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        println!("\n========== 测试网络错误 ==========");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = fetcher_for(&format!("http://{}", addr), crate::services::quote::DEFAULT_CHARSETS.to_vec());
        let err = fetcher.fetch(&symbols(&["sh600000"])).await.unwrap_err();

        println!("  错误: {}", err);
        assert!(matches!(err, FetchError::Network(_)));
        println!("✅ 网络错误测试通过！");
    }
}
