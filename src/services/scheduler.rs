//! 行情轮询调度
//!
//! 启动后立即抓取一次，之后按固定间隔抓取。每次抓取在独立任务中进行，
//! 定时器不会被网络请求阻塞；停止只取消之后的定时，已发出的请求照常完成。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::ServiceError;
use crate::services::board::{BoardHandle, FetchCompletion};
use crate::services::quote::QuoteFetcher;

/// 最小刷新间隔（秒）
pub const MIN_INTERVAL_SECS: u64 = 1;

struct PollTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    interval: Duration,
}

/// 行情轮询器
pub struct Poller {
    fetcher: Arc<QuoteFetcher>,
    board: BoardHandle,
    /// 抓取序号，跨多次启动保持递增
    seq: Arc<AtomicU64>,
    task: Mutex<Option<PollTask>>,
}

impl Poller {
    pub fn new(fetcher: Arc<QuoteFetcher>, board: BoardHandle) -> Self {
        Self {
            fetcher,
            board,
            seq: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<PollTask>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 开始轮询，返回是否由本次调用启动
    ///
    /// 已在运行时不做任何事；间隔小于 1 秒按 1 秒处理。
    pub fn start(&self, interval_secs: u64) -> Result<bool, ServiceError> {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            log::debug!("行情轮询已在运行");
            return Ok(false);
        }

        if self.board.snapshot().records.is_empty() {
            return Err(ServiceError::NoSymbols);
        }

        let interval = Duration::from_secs(interval_secs.max(MIN_INTERVAL_SECS));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_poll_loop(
            self.fetcher.clone(),
            self.board.clone(),
            self.seq.clone(),
            interval,
            shutdown_rx,
        ));

        log::info!("开始监控行情，刷新间隔 {} 秒", interval.as_secs());
        *task = Some(PollTask {
            shutdown: shutdown_tx,
            handle,
            interval,
        });
        Ok(true)
    }

    /// 停止轮询，返回是否由本次调用停止
    pub fn stop(&self) -> bool {
        match self.lock_task().take() {
            Some(task) => {
                let _ = task.shutdown.send(true);
                log::info!("停止监控行情");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// 运行中的刷新间隔
    pub fn interval(&self) -> Option<Duration> {
        self.lock_task().as_ref().map(|t| t.interval)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll_loop(
    fetcher: Arc<QuoteFetcher>,
    board: BoardHandle,
    seq: Arc<AtomicU64>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                break;
            }
            _ = ticker.tick() => {
                let snapshot = board.snapshot();
                if snapshot.records.is_empty() {
                    log::debug!("没有需要刷新的股票");
                    continue;
                }

                let completion_seq = seq.fetch_add(1, Ordering::Relaxed) + 1;
                let generation = snapshot.generation;
                let symbols = snapshot.symbols();
                let fetcher = fetcher.clone();
                let board = board.clone();

                tokio::spawn(async move {
                    match fetcher.fetch_quotes(&symbols).await {
                        Ok(quotes) => {
                            let completion = FetchCompletion {
                                seq: completion_seq,
                                generation,
                                quotes,
                            };
                            if let Err(e) = board.apply(completion) {
                                log::warn!("提交行情结果失败: {}", e);
                            }
                        }
                        Err(e) => {
                            log::warn!("行情刷新失败: {}", e);
                        }
                    }
                });
            }
        }
    }

    log::debug!("行情轮询定时器已退出");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::board::spawn_board;
    use crate::services::quote::fetcher::tests::{fetcher_for, quote_statement, serve_fixed};
    use crate::services::quote::DEFAULT_CHARSETS;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn poller_with_body(list: &[&str], status: &'static str, body: Vec<u8>) -> (Poller, BoardHandle) {
        let endpoint = serve_fixed(status, body).await;
        let fetcher = Arc::new(fetcher_for(&endpoint, DEFAULT_CHARSETS.to_vec()));
        let board = spawn_board(&symbols(list));
        (Poller::new(fetcher, board.clone()), board)
    }

    #[tokio::test]
    async fn test_start_requires_symbols() {
        let (poller, _board) = poller_with_body(&[], "200 OK", Vec::new()).await;

        assert!(matches!(poller.start(5), Err(ServiceError::NoSymbols)));
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        println!("\n========== 测试启动/停止幂等 ==========");
        let (poller, _board) = poller_with_body(&["sh600000"], "200 OK", Vec::new()).await;

        assert!(poller.start(60).unwrap());
        assert!(!poller.start(60).unwrap());
        assert!(poller.is_running());

        assert!(poller.stop());
        assert!(!poller.stop());
        assert!(!poller.is_running());

        assert!(poller.start(60).unwrap());
        assert!(poller.stop());
        println!("✅ 启动/停止幂等测试通过！");
    }

    #[tokio::test]
    async fn test_interval_is_clamped() {
        let (poller, _board) = poller_with_body(&["sh600000"], "200 OK", Vec::new()).await;

        poller.start(0).unwrap();
        assert_eq!(poller.interval(), Some(Duration::from_secs(1)));
        poller.stop();
        assert_eq!(poller.interval(), None);
    }

    #[tokio::test]
    async fn test_first_tick_fetches_immediately() {
        println!("\n========== 测试启动后立即刷新 ==========");
        let body = quote_statement("sh600000", "浦发银行", "10.50", "10.00").into_bytes();
        let (poller, board) = poller_with_body(&["sh600000", "sz000001"], "200 OK", body).await;
        let mut rx = board.subscribe();
        rx.borrow_and_update();

        poller.start(60).unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("60 秒间隔内应先完成首次刷新")
            .unwrap();

        let snapshot = board.snapshot();
        let views: Vec<_> = snapshot.records.iter().map(|r| r.view()).collect();
        println!("  {:?}", views);
        assert_eq!(views[0].last_price, "10.50");
        assert_eq!(views[0].change_percent, "5.00%");
        assert_eq!(views[1].last_price, "--");
        poller.stop();
        println!("✅ 启动后立即刷新测试通过！");
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_state_and_keeps_running() {
        let (poller, board) = poller_with_body(&["sh600000"], "200 OK", Vec::new()).await;
        let before = board.snapshot();

        poller.start(1).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(poller.is_running());
        let after = board.snapshot();
        assert_eq!(after.records, before.records);
        assert!(after.updated_at.is_none());
        poller.stop();
    }
}
