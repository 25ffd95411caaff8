use std::sync::Arc;

use directory_cache::CacheManager;
use directory_commands::{
    CreateUserCommand, DeleteUserCommand, UpdateUserCommand,
};
use directory_errors::DirectoryError;
use directory_models::{User, UserDraft};
use directory_store::UserStore;
use tracing::instrument;

pub mod guard;
pub mod validate;

pub use guard::{Conflict, UniquenessGuard};

#[derive(Clone)]
pub struct CreateUserHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
    guard: UniquenessGuard,
}

impl CreateUserHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self {
            guard: UniquenessGuard::new(store.clone()),
            store,
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self, command: CreateUserCommand,
    ) -> Result<User, DirectoryError> {
        let draft = UserDraft {
            handle: command.handle,
            name: command.name,
            address: command.address,
        };
        validate::validate_draft(&draft)?;

        if let Some(conflict) = self
            .guard
            .check_available(&draft.handle, &draft.address, None)
            .await?
        {
            return Err(DirectoryError::Conflict {
                field: conflict.field,
                value: conflict.value,
            });
        }

        // A racing writer can still slip past the pre-check; the
        // store's constraint reports it as the same conflict kind.
        let user = self.store.save(draft).await?;
        self.cache.invalidate_all().await;

        tracing::info!("user created: {}", user.id);
        Ok(user)
    }
}

#[derive(Clone)]
pub struct UpdateUserHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
    guard: UniquenessGuard,
}

impl UpdateUserHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self {
            guard: UniquenessGuard::new(store.clone()),
            store,
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self, command: UpdateUserCommand,
    ) -> Result<User, DirectoryError> {
        let draft = UserDraft {
            handle: command.handle,
            name: command.name,
            address: command.address,
        };
        validate::validate_draft(&draft)?;

        // Conflicts are checked before existence, so a conflicting
        // update of a missing id reports the conflict.
        if let Some(conflict) = self
            .guard
            .check_available(
                &draft.handle,
                &draft.address,
                Some(command.user_id),
            )
            .await?
        {
            return Err(DirectoryError::Conflict {
                field: conflict.field,
                value: conflict.value,
            });
        }

        let existing = self
            .store
            .find_by_id(command.user_id)
            .await?
            .ok_or(DirectoryError::NotFound {
                user_id: command.user_id,
            })?;

        let changed = User {
            id: existing.id,
            handle: draft.handle,
            name: draft.name,
            address: draft.address,
            created_at: existing.created_at,
        };
        let updated = self.store.update(&changed).await?;
        self.cache.invalidate_all().await;

        tracing::info!("user updated: {}", updated.id);
        Ok(updated)
    }
}

#[derive(Clone)]
pub struct DeleteUserHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
}

impl DeleteUserHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    /// Returns the pre-deletion snapshot, so callers can show what
    /// was removed.
    #[instrument(skip(self))]
    pub async fn execute(
        &self, command: DeleteUserCommand,
    ) -> Result<User, DirectoryError> {
        let existing = self
            .store
            .find_by_id(command.user_id)
            .await?
            .ok_or(DirectoryError::NotFound {
                user_id: command.user_id,
            })?;

        self.store.delete_by_id(command.user_id).await?;
        self.cache.invalidate_all().await;

        tracing::info!("user deleted: {}", command.user_id);
        Ok(existing)
    }
}
