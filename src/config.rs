//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，修改自选股、刷新间隔或显示选项后显式保存回文件

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::DisplayMode;
use crate::services::quote::{Charset, DEFAULT_CHARSETS, TENCENT_QUOTE_API};
use crate::services::scheduler::MIN_INTERVAL_SECS;

/// 默认配置文件查找顺序
pub const CONFIG_PATHS: [&str; 2] = ["config.json", "config/config.json"];

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API Key（为空则不启用认证）
    #[serde(default)]
    pub api_key: String,
    /// 行情请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 行情源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesConfig {
    /// 行情接口地址
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// 响应体候选编码，按顺序尝试
    #[serde(default = "default_charsets")]
    pub charsets: Vec<Charset>,
}

/// 自选股配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistConfig {
    /// 股票代码，逗号分隔
    #[serde(default = "default_symbols")]
    pub symbols: String,
    /// 刷新间隔（秒），兼容字符串和整数
    #[serde(default = "default_interval", deserialize_with = "deserialize_interval")]
    pub interval: u64,
    /// 菜单栏显示选项
    #[serde(default)]
    pub display_mode: DisplayMode,
    /// 启动后是否立即开始监控
    #[serde(default)]
    pub auto_start: bool,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// API 配置
    #[serde(default)]
    pub api: ApiConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
    /// 行情源配置
    #[serde(default)]
    pub quotes: QuotesConfig,
    /// 自选股配置
    #[serde(default)]
    pub watchlist: WatchlistConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 10 }
fn default_connect_timeout() -> u64 { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_endpoint() -> String { TENCENT_QUOTE_API.to_string() }
fn default_charsets() -> Vec<Charset> { DEFAULT_CHARSETS.to_vec() }
fn default_symbols() -> String { "sh600000,sh600001".to_string() }
fn default_interval() -> u64 { 5 }

/// 刷新间隔既可能是 `5` 也可能是 `"5"`
///
/// 不是整数时使用默认值；小于 1 秒的数值按 1 秒处理。
fn deserialize_interval<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let interval = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_u64().map(|_| i64::MAX)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(interval
        .map(|secs| secs.max(MIN_INTERVAL_SECS as i64) as u64)
        .unwrap_or_else(default_interval))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            charsets: default_charsets(),
        }
    }
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            interval: default_interval(),
            display_mode: DisplayMode::default(),
            auto_start: false,
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 保存为格式化的 JSON 文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("写入 {} 失败", path.display()))?;
        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 配置的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// 从配置文件读取
    File,
    /// 没有可用的配置文件，使用默认值
    Default,
}

/// 配置及其所在文件
///
/// 取代全局的键值存储：服务持有一份配置，每次修改后调用 [`ConfigStore::update`] 写回。
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: AppConfig,
    source: ConfigSource,
    /// 加载时跳过的配置文件及原因
    rejected: Vec<(PathBuf, String)>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self {
            path: path.into(),
            config,
            source: ConfigSource::File,
            rejected: Vec::new(),
        }
    }

    /// 加载配置，优先从文件，失败则使用默认值
    pub fn load() -> Self {
        Self::load_from(&CONFIG_PATHS)
    }

    /// 依次尝试给定路径；都不可用时使用默认值，之后保存到第一个路径
    ///
    /// 此时日志系统尚未初始化，加载结果由 [`ConfigStore::log_source`] 补记。
    pub fn load_from<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut rejected = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.exists() {
                match AppConfig::from_file(path) {
                    Ok(config) => {
                        return Self {
                            rejected,
                            ..Self::new(path, config)
                        };
                    }
                    Err(e) => rejected.push((path.to_path_buf(), e.to_string())),
                }
            }
        }

        let path = paths
            .first()
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(CONFIG_PATHS[0]));
        Self {
            source: ConfigSource::Default,
            rejected,
            ..Self::new(path, AppConfig::default())
        }
    }

    /// 记录配置来源及加载时跳过的文件
    pub fn log_source(&self) {
        for (path, reason) in &self.rejected {
            log::warn!("加载配置文件 {} 失败: {}", path.display(), reason);
        }
        match self.source {
            ConfigSource::File => log::info!("从 {} 加载配置成功", self.path.display()),
            ConfigSource::Default => {
                log::info!("使用默认配置，修改后保存到 {}", self.path.display())
            }
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 修改配置并立即保存，保存失败时内存中的配置保持不变
    pub fn update<F>(&mut self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut next = self.config.clone();
        f(&mut next);
        next.save(&self.path)?;
        self.config = next;
        self.source = ConfigSource::File;
        Ok(())
    }
}
