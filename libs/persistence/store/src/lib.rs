use async_trait::async_trait;
use directory_models::{
    ConflictField, SortKey, User, UserDraft, UserPage,
};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;

pub use memory::{MemoryStore, StoreMetrics};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{field} already taken: {value}")]
    UniqueViolation { field: ConflictField, value: String },
    #[error("record not found: {id}")]
    NotFound { id: Uuid },
}

/// The durable store behind the directory. Implementations must be safe
/// for concurrent use and must enforce the handle/address unique
/// constraints themselves; the service-level pre-check is best-effort
/// only and the store is the final arbiter.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new record. The store assigns the identity.
    async fn save(&self, draft: UserDraft) -> Result<User, StoreError>;

    /// Replace the fields of an existing record. Identity and creation
    /// time are taken from the record and never change.
    async fn update(&self, user: &User) -> Result<User, StoreError>;

    async fn find_by_id(
        &self, id: Uuid,
    ) -> Result<Option<User>, StoreError>;

    /// Look up a record colliding with either unique attribute. When
    /// both attributes match (possibly different records), the handle
    /// match is returned, so collision reporting stays deterministic.
    async fn find_by_handle_or_address(
        &self, handle: &str, address: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_by_handle(
        &self, handle: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Full scan in insertion order.
    async fn find_all(&self) -> Result<Vec<User>, StoreError>;

    /// Sorted, paged scan. `page_index` is a zero-based page index; the
    /// row offset is `page_index * page_size`.
    async fn find_all_sorted(
        &self, page_index: u64, page_size: u64, sort_key: SortKey,
        descending: bool,
    ) -> Result<UserPage, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError>;
}
