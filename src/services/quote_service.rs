//! 行情监控服务
//!
//! 对外提供设置自选股、刷新间隔、显示选项以及开始/停止监控的入口，
//! 每次修改设置后立即写回配置文件。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::ConfigStore;
use crate::error::ServiceError;
use crate::models::{parse_symbol_list, DisplayMode, MenuBarLabel, QuoteView};
use crate::services::board::{spawn_board, BoardHandle, BoardSnapshot};
use crate::services::quote::QuoteFetcher;
use crate::services::scheduler::{Poller, MIN_INTERVAL_SECS};

/// 行情列表
#[derive(Debug, Serialize)]
pub struct QuoteList {
    pub quotes: Vec<QuoteView>,
    pub is_updating: bool,
    pub updated_at: Option<String>,
}

/// 监控状态
#[derive(Debug, Serialize)]
pub struct PollingStatus {
    pub is_updating: bool,
    pub interval: u64,
    pub symbols: Vec<String>,
    pub display_mode: DisplayMode,
}

pub struct QuoteService {
    store: Mutex<ConfigStore>,
    board: BoardHandle,
    poller: Poller,
}

impl QuoteService {
    /// 按配置创建服务，需在 tokio 运行时内调用
    pub fn new(store: ConfigStore) -> anyhow::Result<Self> {
        let config = store.config();
        let fetcher = Arc::new(QuoteFetcher::new(&config.api, &config.quotes)?);
        let board = spawn_board(&parse_symbol_list(&config.watchlist.symbols));
        let poller = Poller::new(fetcher, board.clone());

        Ok(Self {
            store: Mutex::new(store),
            board,
            poller,
        })
    }

    /// 替换自选股列表并保存
    ///
    /// 监控中也可以替换，下一次刷新使用新列表，旧列表尚未返回的结果会被丢弃。
    pub async fn set_symbols(&self, raw: &str) -> Result<Arc<BoardSnapshot>, ServiceError> {
        let symbols = parse_symbol_list(raw);
        let joined = symbols.join(",");
        let snapshot = self.board.rebuild(symbols).await?;

        self.store
            .lock()
            .await
            .update(|c| c.watchlist.symbols = joined)?;
        log::info!("自选股已更新: {} 只", snapshot.records.len());
        Ok(snapshot)
    }

    /// 修改刷新间隔，监控中不允许修改
    pub async fn set_interval(&self, interval_secs: u64) -> Result<u64, ServiceError> {
        if self.poller.is_running() {
            return Err(ServiceError::Running);
        }

        let interval = interval_secs.max(MIN_INTERVAL_SECS);
        self.store
            .lock()
            .await
            .update(|c| c.watchlist.interval = interval)?;
        Ok(interval)
    }

    pub async fn set_display_mode(&self, mode: DisplayMode) -> Result<(), ServiceError> {
        self.store
            .lock()
            .await
            .update(|c| c.watchlist.display_mode = mode)?;
        Ok(())
    }

    /// 开始监控，返回是否由本次调用启动
    pub async fn start(&self) -> Result<bool, ServiceError> {
        let interval = self.store.lock().await.config().watchlist.interval;
        self.poller.start(interval)
    }

    /// 停止监控，返回是否由本次调用停止
    pub fn stop(&self) -> bool {
        self.poller.stop()
    }

    pub fn is_updating(&self) -> bool {
        self.poller.is_running()
    }

    pub fn quotes(&self) -> QuoteList {
        let snapshot = self.board.snapshot();
        QuoteList {
            quotes: snapshot.records.iter().map(|r| r.view()).collect(),
            is_updating: self.is_updating(),
            updated_at: snapshot.updated_at.clone(),
        }
    }

    /// 等待下一次行情变化，超时则返回当前列表
    pub async fn wait_for_change(&self, timeout: Duration) -> QuoteList {
        let mut changes = self.board.subscribe();
        changes.borrow_and_update();
        if tokio::time::timeout(timeout, changes.changed()).await.is_err() {
            log::debug!("等待行情变化超时");
        }
        self.quotes()
    }

    pub async fn menu_bar_label(&self) -> MenuBarLabel {
        let mode = self.store.lock().await.config().watchlist.display_mode;
        MenuBarLabel::project(&self.board.snapshot().records, mode)
    }

    /// 监控状态；运行中报告实际生效的间隔
    pub async fn status(&self) -> PollingStatus {
        let store = self.store.lock().await;
        let interval = self
            .poller
            .interval()
            .map(|d| d.as_secs())
            .unwrap_or(store.config().watchlist.interval);
        PollingStatus {
            is_updating: self.is_updating(),
            interval,
            symbols: self.board.snapshot().symbols(),
            display_mode: store.config().watchlist.display_mode,
        }
    }
}
