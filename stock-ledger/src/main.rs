use anyhow::Context;
use serde_json::Value;
use shared::models::TransferStatus;
use stock_ledger::inventory::location_totals;
use stock_ledger::{
    Config, InventoryStore, LocalCache, LocationRegistry, StoreClient, TransferLedger,
    setup_environment,
};

/// Seed products: a JSON array of raw product documents
fn load_seed(path: Option<&str>) -> anyhow::Result<Vec<Value>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading seed file {path}"))?;
    let seed: Vec<Value> =
        serde_json::from_str(&text).with_context(|| format!("parsing seed file {path}"))?;
    Ok(seed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config).context("preparing work directory")?;

    tracing::info!(environment = %config.environment, "Stock ledger starting...");

    // 2. 连接存储
    let client = StoreClient::connect(&config.store_config()).await?;
    let local = LocalCache::open(config.local_cache_path())
        .with_context(|| format!("opening local cache {}", config.local_cache_path().display()))?;

    // 3. 位置与商品
    let registry = LocationRegistry::new(client.clone());
    if let Err(e) = registry.refresh().await {
        tracing::warn!(error = %e, "Location registry unavailable, names fall back to ids");
    }

    let inventory = InventoryStore::new(client.clone(), registry.clone())
        .with_local_cache(local)
        .with_seed(load_seed(config.seed_file.as_deref())?);
    let products = inventory.load().await?;

    tracing::info!(products = products.len(), "Inventory loaded");
    for (location, quantity) in location_totals(&products) {
        tracing::info!(
            location = %registry.resolve_name(&location),
            quantity,
            "Stock on hand"
        );
    }

    // 4. 在途调拨
    match TransferLedger::new(client.clone())
        .list(Some(TransferStatus::InTransit))
        .await
    {
        Ok(open) => tracing::info!(in_transit = open.len(), "Open transfers"),
        Err(e) => tracing::warn!(error = %e, "Could not list transfers"),
    }

    client.close();
    Ok(())
}
