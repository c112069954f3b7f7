/// Storage port trait
///
/// Defines the interface for persisting results of authenticated users.
/// Implementation: SQLite adapter
use crate::domain::models::StoredResult;
use crate::error::Result;
use async_trait::async_trait;

/// Port trait for storage operations
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Insert or update the result stored for `(owner_uid, session_id)`
    ///
    /// An update keeps the original `created_at`.
    async fn save_result(&self, result: &StoredResult) -> Result<()>;

    /// Get one stored result
    async fn get_result(&self, owner_uid: &str, session_id: &str) -> Result<Option<StoredResult>>;

    /// List a user's results, most recently updated first
    async fn list_results(&self, owner_uid: &str, limit: Option<i32>) -> Result<Vec<StoredResult>>;

    /// Delete one stored result; `false` when there was nothing to delete
    async fn delete_result(&self, owner_uid: &str, session_id: &str) -> Result<bool>;

    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> Result<()>;
}
