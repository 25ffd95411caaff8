use std::sync::Arc;

use directory_models::ConflictField;
use directory_store::{StoreError, UserStore};
use tracing::instrument;
use uuid::Uuid;

/// A uniqueness violation found by the pre-check: which attribute
/// collided and with which existing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub field: ConflictField,
    pub value: String,
}

/// Read-only pre-check of the handle/address unique constraints.
///
/// Best-effort only: a concurrent writer can still take either value
/// between this check and the write, in which case the store's own
/// constraint rejects the write and the violation surfaces through the
/// same conflict taxonomy.
#[derive(Clone)]
pub struct UniquenessGuard {
    store: Arc<dyn UserStore>,
}

impl UniquenessGuard {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Check whether `handle` and `address` are free. `exclude` names
    /// a record whose own values do not count as collisions, so an
    /// update is checked against all *other* records. When both
    /// attributes collide, the handle collision is reported.
    #[instrument(skip(self))]
    pub async fn check_available(
        &self, handle: &str, address: &str, exclude: Option<Uuid>,
    ) -> Result<Option<Conflict>, StoreError> {
        let existing = self
            .store
            .find_by_handle_or_address(handle, address)
            .await?;

        match existing {
            Some(user) if exclude != Some(user.id) => {
                let conflict = if user.handle == handle {
                    Conflict {
                        field: ConflictField::Handle,
                        value: handle.to_string(),
                    }
                }
                else {
                    Conflict {
                        field: ConflictField::Address,
                        value: address.to_string(),
                    }
                };
                Ok(Some(conflict))
            }
            _ => Ok(None),
        }
    }
}
