//! 核心模块 - 配置和错误定义
//!
//! - [`Config`] - 账本配置
//! - [`StockError`] - 库存账本错误

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{StockError, StockResult};
