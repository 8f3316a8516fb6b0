//! 权限模块
//!
//! - [`authorize`] - 集中的权限判定
//! - [`load_profile`] - 读取 `profiles` 集合中的用户角色

pub mod permissions;

pub use permissions::{Action, Resource, authorize};

use crate::core::StockResult;
use crate::store::{PROFILES, StoreClient};
use shared::models::UserProfile;

/// Profile for a user id, `None` when the user has no profile document
pub async fn load_profile(client: &StoreClient, user_id: &str) -> StockResult<Option<UserProfile>> {
    let Some(doc) = client.get_optional(PROFILES, user_id).await? else {
        return Ok(None);
    };
    let mut profile: UserProfile = serde_json::from_value(doc)?;
    if profile.id.is_empty() {
        profile.id = user_id.to_string();
    }
    Ok(Some(profile))
}
