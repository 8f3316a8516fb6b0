/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a random resource ID (UUID v4, hyphenated).
///
/// Used for products, variations, transfers and transfer line items when the
/// caller does not supply one.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Default SKU derived from a resource ID: `SKU-` + first 8 alphanumerics, uppercased.
pub fn default_sku(id: &str) -> String {
    let short: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("SKU-{}", short.to_ascii_uppercase())
}
