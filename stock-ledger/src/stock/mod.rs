//! 库存模块 - 库存映射编解码与商品聚合
//!
//! - [`codec`] - 规范化键 ↔ 库存条目
//! - [`aggregate`] - 商品校验、总量重算、库存调整
//! - [`coerce`] - 原始 JSON 数值/文本强制转换

pub mod aggregate;
pub mod codec;
pub mod coerce;

pub use aggregate::{
    adjust_stock, move_between, quantity_at, recompute_total, set_quantity, stock_entries_mut,
    validate, validate_with,
};
pub use codec::{
    LegacyStockRecord, RawKeyNames, ResolveLocationName, StockSource, canonical_key,
    from_persisted_map, same_location, to_persisted_map,
};
