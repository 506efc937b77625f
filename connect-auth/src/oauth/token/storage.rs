//! Token storage trait for persisting OAuth tokens.

use async_trait::async_trait;

use super::TokenBundle;
use crate::error::Error;

/// Trait for storing the tokens of a creator connection.
///
/// Implementations must treat `upsert` as idempotent per creator key: when
/// two callbacks for the same creator race, the last write wins.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create or replace the stored connection for a creator and mark it connected.
    ///
    /// # Arguments
    ///
    /// * `creator_key` - External creator identifier the tokens belong to
    /// * `tokens` - The tokens to store
    async fn upsert(&self, creator_key: &str, tokens: TokenBundle) -> Result<(), Error>;
}
