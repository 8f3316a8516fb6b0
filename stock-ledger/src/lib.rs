//! Stock Ledger - 多位置库存账本与调拨对账
//!
//! # 架构概述
//!
//! - **文档存储** (`store`): 远程文档存储客户端 + redb 本地缓存
//! - **库存** (`stock`): 库存映射编解码、商品校验与总量重算
//! - **位置** (`location`): 仓库/门店注册表
//! - **商品存取** (`inventory`): 加载、保存、删除，按商品加锁
//! - **调拨** (`transfer`): 调拨单状态机与收货对账
//! - **权限** (`auth`): 基于角色和位置分配的权限判定
//!
//! # 模块结构
//!
//! ```text
//! stock-ledger/src/
//! ├── core/          # 配置、错误
//! ├── store/         # DocumentStore、StoreClient、LocalCache
//! ├── stock/         # codec、aggregate
//! ├── location/      # LocationRegistry
//! ├── inventory/     # InventoryStore、ProductLocks
//! ├── transfer/      # TransferLedger、ReconciliationEngine
//! ├── auth/          # authorize
//! └── utils/         # 日志
//! ```

pub mod auth;
pub mod core;
pub mod inventory;
pub mod location;
pub mod stock;
pub mod store;
pub mod transfer;
pub mod utils;

// Re-export 公共类型
pub use auth::{Action, Resource, authorize};
pub use core::{Config, StockError, StockResult};
pub use inventory::{InventoryStore, ProductLocks};
pub use location::LocationRegistry;
pub use store::{DocumentStore, LocalCache, MemoryStore, StoreClient, StoreConfig};
pub use transfer::{ReceiptOutcome, ReconciliationEngine, TransferLedger};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 准备运行环境: 工作目录、日志目录、日志
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(())
}
