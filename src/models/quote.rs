//! 行情数据模型
//!
//! 记录只保存原始数值（名称、价格、昨收、涨跌幅），
//! 展示用的字符串、占位符和颜色都由 [`QuoteView`] 按需投影得到。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 尚无数据时展示的占位符
pub const SENTINEL: &str = "--";

/// 没有任何股票时菜单栏显示的标题
pub const APP_TITLE: &str = "多股票监控";

/// 涨跌方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Flat,
}

impl Direction {
    /// 由涨跌幅推导方向，恰好为 0 时为平
    pub fn from_percent(percent: f64) -> Self {
        if percent > 0.0 {
            Direction::Up
        } else if percent < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    /// 展示颜色（红涨绿跌）
    pub fn color(self) -> &'static str {
        match self {
            Direction::Up => "red",
            Direction::Down => "green",
            Direction::Flat => "default",
        }
    }
}

/// 一次成功解析得到的行情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// 股票名称
    pub name: String,
    /// 当前价格
    pub price: f64,
    /// 接口返回的价格原文，展示时原样使用
    pub price_text: String,
    /// 昨收价
    pub prev_close: f64,
    /// 涨跌幅（百分比）
    pub change_percent: f64,
}

impl Quote {
    pub fn direction(&self) -> Direction {
        Direction::from_percent(self.change_percent)
    }

    /// 两位小数加百分号，如 `5.00%`
    pub fn change_percent_text(&self) -> String {
        format!("{:.2}%", self.change_percent)
    }
}

/// 单只股票的行情记录
///
/// `id` 在创建时分配，之后不会改变，也不由代码推导；
/// `quote` 为 `None` 表示尚未成功解析过。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRecord {
    pub id: Uuid,
    pub symbol: String,
    pub quote: Option<Quote>,
}

impl QuoteRecord {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            quote: None,
        }
    }

    /// 投影为展示用视图
    pub fn view(&self) -> QuoteView {
        match &self.quote {
            Some(quote) => QuoteView {
                id: self.id,
                symbol: self.symbol.clone(),
                display_name: quote.name.clone(),
                last_price: quote.price_text.clone(),
                change_percent: quote.change_percent_text(),
                direction: quote.direction(),
                color: quote.direction().color(),
            },
            None => QuoteView {
                id: self.id,
                symbol: self.symbol.clone(),
                display_name: String::new(),
                last_price: SENTINEL.to_string(),
                change_percent: SENTINEL.to_string(),
                direction: Direction::Flat,
                color: Direction::Flat.color(),
            },
        }
    }
}

/// 行情卡片视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteView {
    pub id: Uuid,
    pub symbol: String,
    pub display_name: String,
    pub last_price: String,
    pub change_percent: String,
    pub direction: Direction,
    pub color: &'static str,
}

/// 菜单栏显示选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// 价格
    #[default]
    Price,
    /// 涨跌幅
    ChangePercent,
    /// 价格+涨跌幅
    Both,
    /// 敲木鱼动画
    DecorativeAnimation,
}

/// 菜单栏标签
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuBarLabel {
    pub text: String,
    pub color: &'static str,
    /// 为 true 时由界面播放装饰动画，不显示文字
    pub animated: bool,
}

impl MenuBarLabel {
    /// 按显示选项投影第一只股票；列表为空时显示标题
    pub fn project(records: &[QuoteRecord], mode: DisplayMode) -> Self {
        let Some(first) = records.first() else {
            return Self {
                text: APP_TITLE.to_string(),
                color: Direction::Flat.color(),
                animated: false,
            };
        };

        let view = first.view();
        match mode {
            DisplayMode::Price => Self {
                text: view.last_price,
                color: view.color,
                animated: false,
            },
            DisplayMode::ChangePercent => Self {
                text: view.change_percent,
                color: view.color,
                animated: false,
            },
            DisplayMode::Both => Self {
                text: format!("{} {}", view.last_price, view.change_percent),
                color: Direction::Flat.color(),
                animated: false,
            },
            DisplayMode::DecorativeAnimation => Self {
                text: String::new(),
                color: Direction::Flat.color(),
                animated: true,
            },
        }
    }
}

/// 解析用户输入的股票代码列表
///
/// 以逗号分隔（全角逗号视为半角），去掉首尾空白并丢弃空项，保持顺序，不去重。
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.replace('，', ",")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
