//! Seams between services and storage.

use crate::{models::User, Result};
use async_trait::async_trait;
use uuid::Uuid;

/// User-existence lookup consumed by the relationship state machine.
///
/// Kept as a trait so the state machine does not care where accounts live;
/// the Postgres repository implements it, tests can substitute their own.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a live (non-soft-deleted) user.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}
