//! 行情记录表
//!
//! 记录列表只由一个后台任务持有和修改：重建列表、合并抓取结果都通过消息发给它，
//! 每次变化后把新的快照发布到 `watch` 通道，读者只读快照，不与写者争锁。
//!
//! 抓取结果带有序号和列表代数：比已应用结果更旧的、或属于已被替换的列表的结果直接丢弃，
//! 因此慢请求不会覆盖较新的行情。

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::ServiceError;
use crate::models::{Quote, QuoteRecord};
use crate::services::quote::{get_beijing_time, merge};

/// 一次完成的抓取
#[derive(Debug, Clone)]
pub struct FetchCompletion {
    /// 发起时分配的单调递增序号
    pub seq: u64,
    /// 发起时记录列表的代数
    pub generation: u64,
    pub quotes: HashMap<String, Quote>,
}

/// 记录列表快照
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardSnapshot {
    pub generation: u64,
    pub records: Vec<QuoteRecord>,
    /// 最近一次成功合并的时间（北京时间）
    pub updated_at: Option<String>,
}

impl BoardSnapshot {
    pub fn symbols(&self) -> Vec<String> {
        self.records.iter().map(|r| r.symbol.clone()).collect()
    }
}

/// 记录列表状态
#[derive(Debug, Default)]
pub struct QuoteBoard {
    records: Vec<QuoteRecord>,
    generation: u64,
    last_applied_seq: u64,
    updated_at: Option<String>,
}

impl QuoteBoard {
    pub fn new(symbols: &[String]) -> Self {
        let mut board = Self::default();
        board.rebuild(symbols);
        board
    }

    /// 用新的代码列表重建记录，全部回到无数据状态
    pub fn rebuild(&mut self, symbols: &[String]) {
        self.records = symbols.iter().map(|s| QuoteRecord::new(s.as_str())).collect();
        self.generation += 1;
        self.updated_at = None;
    }

    /// 合并抓取结果，返回是否被采用
    pub fn apply(&mut self, completion: FetchCompletion) -> bool {
        if completion.generation != self.generation {
            log::debug!(
                "丢弃旧列表的行情结果: 代数 {} != {}",
                completion.generation,
                self.generation
            );
            return false;
        }
        if completion.seq <= self.last_applied_seq {
            log::debug!(
                "丢弃过期的行情结果: 序号 {} <= {}",
                completion.seq,
                self.last_applied_seq
            );
            return false;
        }

        self.records = merge(&self.records, &completion.quotes);
        self.last_applied_seq = completion.seq;
        self.updated_at = Some(get_beijing_time());
        true
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            generation: self.generation,
            records: self.records.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

enum BoardCommand {
    Rebuild(Vec<String>, oneshot::Sender<Arc<BoardSnapshot>>),
    Apply(FetchCompletion),
}

/// 记录表任务的句柄，可随意克隆
#[derive(Clone)]
pub struct BoardHandle {
    commands: mpsc::UnboundedSender<BoardCommand>,
    snapshots: watch::Receiver<Arc<BoardSnapshot>>,
}

/// 启动记录表任务，需在 tokio 运行时内调用
pub fn spawn_board(symbols: &[String]) -> BoardHandle {
    let board = QuoteBoard::new(symbols);
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(board.snapshot()));
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_board(board, command_rx, snapshot_tx));

    BoardHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
    }
}

async fn run_board(
    mut board: QuoteBoard,
    mut commands: mpsc::UnboundedReceiver<BoardCommand>,
    snapshots: watch::Sender<Arc<BoardSnapshot>>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            BoardCommand::Rebuild(symbols, reply) => {
                board.rebuild(&symbols);
                let snapshot = Arc::new(board.snapshot());
                snapshots.send_replace(snapshot.clone());
                let _ = reply.send(snapshot);
            }
            BoardCommand::Apply(completion) => {
                if board.apply(completion) {
                    snapshots.send_replace(Arc::new(board.snapshot()));
                }
            }
        }
    }
    log::info!("行情记录表任务退出");
}

impl BoardHandle {
    /// 替换代码列表，返回重建后的快照
    pub async fn rebuild(&self, symbols: Vec<String>) -> Result<Arc<BoardSnapshot>, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(BoardCommand::Rebuild(symbols, reply_tx))
            .map_err(|_| ServiceError::BoardClosed)?;
        reply_rx.await.map_err(|_| ServiceError::BoardClosed)
    }

    /// 提交抓取结果，由记录表任务按顺序合并
    pub fn apply(&self, completion: FetchCompletion) -> Result<(), ServiceError> {
        self.commands
            .send(BoardCommand::Apply(completion))
            .map_err(|_| ServiceError::BoardClosed)
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// 订阅快照变化
    pub fn subscribe(&self) -> watch::Receiver<Arc<BoardSnapshot>> {
        self.snapshots.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn quote(name: &str, price: f64) -> Quote {
        Quote {
            name: name.to_string(),
            price,
            price_text: format!("{:.2}", price),
            prev_close: 10.0,
            change_percent: (price - 10.0) / 10.0 * 100.0,
        }
    }

    fn completion(seq: u64, generation: u64, symbol: &str, price: f64) -> FetchCompletion {
        FetchCompletion {
            seq,
            generation,
            quotes: HashMap::from([(symbol.to_string(), quote("测试", price))]),
        }
    }

    #[test]
    fn test_new_board_has_sentinel_records_in_order() {
        let board = QuoteBoard::new(&symbols(&["sz000001", "sh600000", "hk00700"]));
        let snapshot = board.snapshot();

        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.symbols(), symbols(&["sz000001", "sh600000", "hk00700"]));
        assert!(snapshot.records.iter().all(|r| r.quote.is_none()));
        assert!(snapshot.updated_at.is_none());
    }

    #[test]
    fn test_apply_updates_and_stamps_time() {
        let mut board = QuoteBoard::new(&symbols(&["sh600000", "sz000001"]));

        assert!(board.apply(completion(1, 1, "sh600000", 10.5)));
        let snapshot = board.snapshot();

        assert_eq!(snapshot.records[0].quote.as_ref().unwrap().price, 10.5);
        assert!(snapshot.records[1].quote.is_none());
        assert!(snapshot.updated_at.is_some());
    }

    #[test]
    fn test_out_of_order_completion_is_discarded() {
        println!("\n========== 测试乱序结果丢弃 ==========");
        let mut board = QuoteBoard::new(&symbols(&["sh600000"]));

        assert!(board.apply(completion(2, 1, "sh600000", 11.0)));
        assert!(!board.apply(completion(1, 1, "sh600000", 9.0)));
        assert!(!board.apply(completion(2, 1, "sh600000", 9.0)));

        let price = board.snapshot().records[0].quote.as_ref().unwrap().price;
        println!("  最终价格: {}", price);
        assert_eq!(price, 11.0);
        println!("✅ 乱序结果丢弃测试通过！");
    }

    #[test]
    fn test_completion_for_replaced_list_is_discarded() {
        let mut board = QuoteBoard::new(&symbols(&["sh600000"]));
        board.rebuild(&symbols(&["sh600000", "sz000001"]));

        assert!(!board.apply(completion(1, 1, "sh600000", 10.5)));
        assert!(board.snapshot().records.iter().all(|r| r.quote.is_none()));
        assert!(board.apply(completion(2, 2, "sh600000", 10.5)));
    }

    #[test]
    fn test_rebuild_creates_fresh_records() {
        let mut board = QuoteBoard::new(&symbols(&["sh600000"]));
        board.apply(completion(1, 1, "sh600000", 10.5));
        let old_id = board.snapshot().records[0].id;

        board.rebuild(&symbols(&["sh600000"]));
        let snapshot = board.snapshot();

        assert_ne!(snapshot.records[0].id, old_id);
        assert!(snapshot.records[0].quote.is_none());
        assert!(snapshot.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_board_task_publishes_snapshots() {
        println!("\n========== 测试记录表任务发布快照 ==========");
        let board = spawn_board(&symbols(&["sh600000"]));
        let mut rx = board.subscribe();

        let rebuilt = board.rebuild(symbols(&["sh600000", "sz000001"])).await.unwrap();
        assert_eq!(rebuilt.generation, 2);
        assert_eq!(board.snapshot().records.len(), 2);

        rx.borrow_and_update();
        board.apply(completion(1, 2, "sz000001", 9.0)).unwrap();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();

        let snapshot = board.snapshot();
        assert!(snapshot.records[0].quote.is_none());
        assert_eq!(snapshot.records[1].quote.as_ref().unwrap().price, 9.0);
        println!("✅ 记录表任务测试通过！");
    }
}
