use std::sync::Arc;

use directory_models::{SortKey, User, UserPage};
use moka::sync::Cache;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::debug;
use uuid::Uuid;

pub mod config;

pub use config::CacheConfig;

/// Key of the paginated-list region: the ordered tuple of parameters
/// that produced a page. Two requests share an entry only when all
/// three match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page_index: u64,
    pub page_size: u64,
    pub sort_key: SortKey,
}

struct Regions {
    by_id: Cache<Uuid, User>,
    by_handle: Cache<String, User>,
    list: Mutex<Option<Vec<User>>>,
    pages: Cache<PageKey, UserPage>,
    count: Mutex<Option<u64>>,
}

/// Owner of the derived cache regions: by-id, by-handle, full-list,
/// paginated-list and count.
///
/// Every region lives behind one readers-writer lock. A read operation
/// holds the read half for its whole lookup-fetch-populate sequence
/// (see [`CacheManager::read`]); [`CacheManager::invalidate_all`]
/// holds the write half while it clears all regions. A concurrent read
/// therefore completes entirely before or entirely after an
/// invalidation and can never re-populate a region with data from
/// before a mutation that has already been acknowledged. List, page
/// and count values are derived from the whole record set, so any
/// committed mutation invalidates everything; absence of an entry
/// never changes a result, only its cost.
#[derive(Clone)]
pub struct CacheManager {
    regions: Arc<RwLock<Regions>>,
}

/// Shared access to all regions for the duration of one read
/// operation. Invalidation waits until every outstanding guard is
/// dropped.
pub struct CacheReadGuard<'a> {
    regions: RwLockReadGuard<'a, Regions>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        let regions = Regions {
            by_id: Cache::new(config.record_capacity),
            by_handle: Cache::new(config.record_capacity),
            list: Mutex::new(None),
            pages: Cache::new(config.page_capacity),
            count: Mutex::new(None),
        };
        Self {
            regions: Arc::new(RwLock::new(regions)),
        }
    }

    /// Open a read session. Hold the guard across the store round trip
    /// when populating on a miss, so the populate cannot race a
    /// concurrent invalidation.
    pub async fn read(&self) -> CacheReadGuard<'_> {
        CacheReadGuard {
            regions: self.regions.read().await,
        }
    }

    /// Clear every region. Called synchronously inside each mutating
    /// operation, after the store write and before the mutation is
    /// acknowledged to its caller.
    pub async fn invalidate_all(&self) {
        let regions = self.regions.write().await;
        regions.by_id.invalidate_all();
        regions.by_handle.invalidate_all();
        *regions.list.lock().await = None;
        regions.pages.invalidate_all();
        *regions.count.lock().await = None;
        debug!("invalidated all cache regions");
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CacheReadGuard<'_> {
    pub fn get_by_id(&self, id: Uuid) -> Option<User> {
        self.regions.by_id.get(&id)
    }

    pub fn put_by_id(&self, user: &User) {
        self.regions.by_id.insert(user.id, user.clone());
    }

    pub fn get_by_handle(&self, handle: &str) -> Option<User> {
        self.regions.by_handle.get(handle)
    }

    pub fn put_by_handle(&self, user: &User) {
        self.regions
            .by_handle
            .insert(user.handle.clone(), user.clone());
    }

    pub async fn get_list(&self) -> Option<Vec<User>> {
        self.regions.list.lock().await.clone()
    }

    pub async fn put_list(&self, users: Vec<User>) {
        *self.regions.list.lock().await = Some(users);
    }

    pub fn get_page(&self, key: PageKey) -> Option<UserPage> {
        self.regions.pages.get(&key)
    }

    pub fn put_page(&self, key: PageKey, page: UserPage) {
        self.regions.pages.insert(key, page);
    }

    pub async fn get_count(&self) -> Option<u64> {
        *self.regions.count.lock().await
    }

    pub async fn put_count(&self, count: u64) {
        *self.regions.count.lock().await = Some(count);
    }
}
