use crate::store::{BackoffStrategy, RetryPolicy, StoreBackend, StoreConfig};
use std::path::PathBuf;
use std::time::Duration;

/// 账本配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/stock-ledger | 工作目录 |
/// | STORE_BACKEND | memory | 远程存储后端: memory \| http |
/// | STORE_URL | http://localhost:8080 | HTTP 文档存储地址 |
/// | STORE_TIMEOUT_MS | 5000 | 单次存储调用超时(毫秒) |
/// | STORE_MAX_RETRIES | 2 | 瞬时故障重试次数 |
/// | STORE_RETRY_BASE_MS | 100 | 指数退避基数(毫秒) |
/// | STORE_RETRY_MAX_MS | 2000 | 指数退避上限(毫秒) |
/// | LOCAL_CACHE_FILE | {WORK_DIR}/cache.redb | 本地缓存文件 |
/// | SEED_FILE | - | 远程为空时的种子商品 JSON |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// STORE_BACKEND=http STORE_URL=https://docs.example.com cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放本地缓存和日志
    pub work_dir: String,
    pub store_backend: String,
    pub store_url: String,
    pub store_timeout_ms: u64,
    pub store_max_retries: u32,
    pub store_retry_base_ms: u64,
    pub store_retry_max_ms: u64,
    /// 覆盖默认的本地缓存路径
    pub local_cache_file: Option<String>,
    pub seed_file: Option<String>,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/stock-ledger".into()),
            store_backend: std::env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".into()),
            store_url: std::env::var("STORE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", 5000),
            store_max_retries: env_or("STORE_MAX_RETRIES", 2),
            store_retry_base_ms: env_or("STORE_RETRY_BASE_MS", 100),
            store_retry_max_ms: env_or("STORE_RETRY_MAX_MS", 2000),
            local_cache_file: std::env::var("LOCAL_CACHE_FILE").ok(),
            seed_file: std::env::var("SEED_FILE").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, store_backend: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.store_backend = store_backend.into();
        config
    }

    /// Remote store settings derived from the env values
    pub fn store_config(&self) -> StoreConfig {
        let backend = match self.store_backend.as_str() {
            "http" => StoreBackend::Http {
                base_url: self.store_url.clone(),
            },
            "memory" => StoreBackend::Memory,
            other => {
                tracing::warn!(backend = other, "Unknown STORE_BACKEND, using memory");
                StoreBackend::Memory
            }
        };

        StoreConfig {
            backend,
            timeout: Duration::from_millis(self.store_timeout_ms),
            retry: RetryPolicy::new(self.store_max_retries).with_backoff(
                BackoffStrategy::Exponential {
                    base: Duration::from_millis(self.store_retry_base_ms),
                    max: Duration::from_millis(self.store_retry_max_ms),
                },
            ),
        }
    }

    pub fn local_cache_path(&self) -> PathBuf {
        match &self.local_cache_file {
            Some(file) => PathBuf::from(file),
            None => PathBuf::from(&self.work_dir).join("cache.redb"),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
