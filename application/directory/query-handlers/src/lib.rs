use std::sync::Arc;

use directory_cache::{CacheManager, PageKey};
use directory_errors::DirectoryError;
use directory_models::{SortKey, User, UserPage};
use directory_queries::{
    GetUserByHandleQuery, GetUserQuery, ListPageQuery,
};
use directory_store::UserStore;
use tracing::instrument;

#[derive(Clone)]
pub struct GetUserQueryHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
}

impl GetUserQueryHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    /// The read session stays open across the store round trip, so a
    /// concurrent invalidation runs either before this lookup or after
    /// the populate, never in between.
    #[instrument(skip(self))]
    pub async fn execute(
        &self, query: GetUserQuery,
    ) -> Result<User, DirectoryError> {
        let cache = self.cache.read().await;
        if let Some(user) = cache.get_by_id(query.user_id) {
            tracing::debug!("cache hit for user {}", query.user_id);
            return Ok(user);
        }

        tracing::debug!(
            "cache miss for user {}, fetching from store",
            query.user_id
        );

        let user = self
            .store
            .find_by_id(query.user_id)
            .await?
            .ok_or(DirectoryError::NotFound {
                user_id: query.user_id,
            })?;

        cache.put_by_id(&user);
        Ok(user)
    }
}

#[derive(Clone)]
pub struct GetUserByHandleQueryHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
}

impl GetUserByHandleQueryHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self, query: GetUserByHandleQuery,
    ) -> Result<User, DirectoryError> {
        let cache = self.cache.read().await;
        if let Some(user) = cache.get_by_handle(&query.handle) {
            tracing::debug!("cache hit for handle {}", query.handle);
            return Ok(user);
        }

        tracing::debug!(
            "cache miss for handle {}, fetching from store",
            query.handle
        );

        let user = self
            .store
            .find_by_handle(&query.handle)
            .await?
            .ok_or(DirectoryError::HandleNotFound {
                handle: query.handle,
            })?;

        cache.put_by_handle(&user);
        Ok(user)
    }
}

#[derive(Clone)]
pub struct ListUsersQueryHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
}

impl ListUsersQueryHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    /// Full listing in the order the store returns it (insertion
    /// order); no re-sorting.
    #[instrument(skip(self))]
    pub async fn execute(&self) -> Result<Vec<User>, DirectoryError> {
        let cache = self.cache.read().await;
        if let Some(users) = cache.get_list().await {
            tracing::debug!("cache hit for user list");
            return Ok(users);
        }

        tracing::debug!("cache miss for user list, scanning store");

        let users = self.store.find_all().await?;
        cache.put_list(users.clone()).await;
        Ok(users)
    }
}

#[derive(Clone)]
pub struct ListPageQueryHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
}

impl ListPageQueryHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    /// One page of the record set, sorted descending by the requested
    /// key. `page_index` is zero-based.
    #[instrument(skip(self))]
    pub async fn execute(
        &self, query: ListPageQuery,
    ) -> Result<UserPage, DirectoryError> {
        if query.page_size <= 0 {
            return Err(DirectoryError::InvalidArgument {
                reason: format!(
                    "page size must be positive, got {}",
                    query.page_size
                ),
            });
        }
        let sort_key: SortKey =
            query.sort_key.parse().map_err(|_| {
                DirectoryError::InvalidArgument {
                    reason: format!(
                        "unknown sort key: {}",
                        query.sort_key
                    ),
                }
            })?;

        let key = PageKey {
            page_index: query.page_index,
            page_size: query.page_size as u64,
            sort_key,
        };
        let cache = self.cache.read().await;
        if let Some(page) = cache.get_page(key) {
            tracing::debug!("cache hit for page {key:?}");
            return Ok(page);
        }

        tracing::debug!("cache miss for page {key:?}, scanning store");

        let page = self
            .store
            .find_all_sorted(
                key.page_index,
                key.page_size,
                sort_key,
                true,
            )
            .await?;
        cache.put_page(key, page.clone());
        Ok(page)
    }
}

#[derive(Clone)]
pub struct CountUsersQueryHandler {
    store: Arc<dyn UserStore>,
    cache: CacheManager,
}

impl CountUsersQueryHandler {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self) -> Result<u64, DirectoryError> {
        let cache = self.cache.read().await;
        if let Some(count) = cache.get_count().await {
            tracing::debug!("cache hit for user count");
            return Ok(count);
        }

        tracing::debug!("cache miss for user count, asking store");

        let count = self.store.count().await?;
        cache.put_count(count).await;
        Ok(count)
    }
}
