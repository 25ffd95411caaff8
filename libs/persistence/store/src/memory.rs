use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use directory_models::{
    ConflictField, SortKey, User, UserDraft, UserPage,
};
use tokio::sync::RwLock;
use uuid::{ContextV7, Timestamp, Uuid};

use crate::{StoreError, UserStore};

/// Per-method call counters, readable from tests to observe whether an
/// operation was served from cache or hit the store.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    pub saves: AtomicU64,
    pub updates: AtomicU64,
    pub point_reads: AtomicU64,
    pub collision_reads: AtomicU64,
    pub scans: AtomicU64,
    pub sorted_scans: AtomicU64,
    pub counts: AtomicU64,
    pub deletes: AtomicU64,
}

impl StoreMetrics {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

/// In-process reference implementation of [`UserStore`].
///
/// Records live in a `BTreeMap` keyed by UUIDv7; the shared
/// [`ContextV7`] keeps assigned ids monotonic even within one
/// millisecond, so iteration order is id order, which is insertion
/// order. Unique constraints on handle and address are checked under
/// the write lock, making this store the authoritative arbiter for
/// races the best-effort pre-check misses.
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<Uuid, User>>>,
    metrics: Arc<StoreMetrics>,
    offline: Arc<AtomicBool>,
    clock: Arc<Mutex<ContextV7>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            metrics: Arc::default(),
            offline: Arc::default(),
            clock: Arc::new(Mutex::new(ContextV7::new())),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// While offline, every call fails with [`StoreError::Unavailable`]
    /// without touching the record set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".to_string()))
        }
        else {
            Ok(())
        }
    }

    /// Collision check under the caller's lock. Handle collisions win
    /// when both attributes are taken.
    fn find_collision(
        records: &BTreeMap<Uuid, User>, handle: &str, address: &str,
        exclude: Option<Uuid>,
    ) -> Option<(ConflictField, String)> {
        let other = |user: &&User| Some(user.id) != exclude;

        if records.values().filter(other).any(|u| u.handle == handle) {
            return Some((ConflictField::Handle, handle.to_string()));
        }
        if records
            .values()
            .filter(other)
            .any(|u| u.address == address)
        {
            return Some((
                ConflictField::Address,
                address.to_string(),
            ));
        }
        None
    }

    fn compare(a: &User, b: &User, sort_key: SortKey) -> Ordering {
        let by_field = match sort_key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Handle => a.handle.cmp(&b.handle),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Address => a.address.cmp(&b.address),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        // Id as tie-breaker keeps page boundaries stable.
        by_field.then_with(|| a.id.cmp(&b.id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn save(&self, draft: UserDraft) -> Result<User, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.saves);

        let mut records = self.records.write().await;
        if let Some((field, value)) = Self::find_collision(
            &records,
            &draft.handle,
            &draft.address,
            None,
        ) {
            return Err(StoreError::UniqueViolation { field, value });
        }

        let user = User {
            id: Uuid::new_v7(Timestamp::now(
                &*self.clock.lock().unwrap(),
            )),
            handle: draft.handle,
            name: draft.name,
            address: draft.address,
            created_at: Utc::now(),
        };
        records.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.updates);

        let mut records = self.records.write().await;
        if !records.contains_key(&user.id) {
            return Err(StoreError::NotFound { id: user.id });
        }
        if let Some((field, value)) = Self::find_collision(
            &records,
            &user.handle,
            &user.address,
            Some(user.id),
        ) {
            return Err(StoreError::UniqueViolation { field, value });
        }

        records.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(
        &self, id: Uuid,
    ) -> Result<Option<User>, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.point_reads);

        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn find_by_handle_or_address(
        &self, handle: &str, address: &str,
    ) -> Result<Option<User>, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.collision_reads);

        let records = self.records.read().await;
        let by_handle =
            records.values().find(|user| user.handle == handle);
        let hit = by_handle.or_else(|| {
            records.values().find(|user| user.address == address)
        });
        Ok(hit.cloned())
    }

    async fn find_by_handle(
        &self, handle: &str,
    ) -> Result<Option<User>, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.point_reads);

        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|user| user.handle == handle)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.scans);

        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn find_all_sorted(
        &self, page_index: u64, page_size: u64, sort_key: SortKey,
        descending: bool,
    ) -> Result<UserPage, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.sorted_scans);

        let records = self.records.read().await;
        let mut users: Vec<User> = records.values().cloned().collect();
        users.sort_by(|a, b| Self::compare(a, b, sort_key));
        if descending {
            users.reverse();
        }

        let total = users.len() as u64;
        let start = (page_index * page_size) as usize;
        let users: Vec<User> = users
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Ok(UserPage {
            users,
            page_index,
            page_size,
            sort_key,
            total,
        })
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.counts);

        let records = self.records.read().await;
        Ok(records.len() as u64)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
        self.ensure_online()?;
        StoreMetrics::bump(&self.metrics.deletes);

        let mut records = self.records.write().await;
        match records.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering as AtomicOrdering;

    use directory_models::{ConflictField, SortKey, UserDraft};
    use uuid::Uuid;

    use super::MemoryStore;
    use crate::{StoreError, UserStore};

    fn draft(handle: &str, address: &str) -> UserDraft {
        UserDraft {
            handle: handle.to_string(),
            name: format!("{handle} test"),
            address: address.to_string(),
        }
    }

    #[tokio::test]
    async fn save_assigns_identity_and_round_trips() {
        let store = MemoryStore::new();

        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();
        assert!(!created.id.is_nil());

        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn save_rejects_taken_handle() {
        let store = MemoryStore::new();
        store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        let err = store
            .save(draft("ada", "other@example.com"))
            .await
            .unwrap_err();
        match err {
            StoreError::UniqueViolation { field, value } => {
                assert_eq!(field, ConflictField::Handle);
                assert_eq!(value, "ada");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_rejects_taken_address() {
        let store = MemoryStore::new();
        store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        let err = store
            .save(draft("grace", "ada@example.com"))
            .await
            .unwrap_err();
        match err {
            StoreError::UniqueViolation { field, .. } => {
                assert_eq!(field, ConflictField::Address);
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_reports_handle_when_both_attributes_collide() {
        let store = MemoryStore::new();
        store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        let err = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap_err();
        match err {
            StoreError::UniqueViolation { field, .. } => {
                assert_eq!(field, ConflictField::Handle);
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_replaces_fields_in_place() {
        let store = MemoryStore::new();
        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        let mut changed = created.clone();
        changed.name = "Ada Lovelace".to_string();
        changed.address = "lovelace@example.com".to_string();
        let updated = store.update(&changed).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(
            store.find_by_id(created.id).await.unwrap(),
            Some(updated)
        );
    }

    #[tokio::test]
    async fn update_rejects_unknown_id() {
        let store = MemoryStore::new();
        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        let mut ghost = created.clone();
        ghost.id = Uuid::now_v7();
        let err = store.update(&ghost).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_allows_keeping_own_unique_attributes() {
        let store = MemoryStore::new();
        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        let mut changed = created.clone();
        changed.name = "renamed".to_string();
        assert!(store.update(&changed).await.is_ok());
    }

    #[tokio::test]
    async fn update_rejects_stealing_another_records_address() {
        let store = MemoryStore::new();
        store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();
        let grace = store
            .save(draft("grace", "grace@example.com"))
            .await
            .unwrap();

        let mut changed = grace.clone();
        changed.address = "ada@example.com".to_string();
        let err = store.update(&changed).await.unwrap_err();
        match err {
            StoreError::UniqueViolation { field, .. } => {
                assert_eq!(field, ConflictField::Address);
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_by_handle_or_address_prefers_handle_match() {
        let store = MemoryStore::new();
        let ada = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();
        let grace = store
            .save(draft("grace", "grace@example.com"))
            .await
            .unwrap();

        // Handle of one record, address of another: the handle match
        // comes back.
        let hit = store
            .find_by_handle_or_address("ada", "grace@example.com")
            .await
            .unwrap();
        assert_eq!(hit.map(|u| u.id), Some(ada.id));

        let hit = store
            .find_by_handle_or_address("nobody", "grace@example.com")
            .await
            .unwrap();
        assert_eq!(hit.map(|u| u.id), Some(grace.id));

        let hit = store
            .find_by_handle_or_address("nobody", "nobody@example.com")
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn find_all_returns_insertion_order() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..4 {
            let user = store
                .save(draft(
                    &format!("user_{i}"),
                    &format!("user_{i}@example.com"),
                ))
                .await
                .unwrap();
            ids.push(user.id);
        }

        let all = store.find_all().await.unwrap();
        let scanned: Vec<_> = all.iter().map(|u| u.id).collect();
        assert_eq!(scanned, ids);
    }

    #[tokio::test]
    async fn sorted_scan_pages_descending() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let user = store
                .save(draft(
                    &format!("user_{i}"),
                    &format!("user_{i}@example.com"),
                ))
                .await
                .unwrap();
            ids.push(user.id);
        }

        let page = store
            .find_all_sorted(0, 2, SortKey::Id, true)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.users[0].id, ids[4]);
        assert_eq!(page.users[1].id, ids[3]);

        let last = store
            .find_all_sorted(2, 2, SortKey::Id, true)
            .await
            .unwrap();
        assert_eq!(last.users.len(), 1);
        assert_eq!(last.users[0].id, ids[0]);

        let beyond = store
            .find_all_sorted(3, 2, SortKey::Id, true)
            .await
            .unwrap();
        assert!(beyond.users.is_empty());
        assert_eq!(beyond.total, 5);
    }

    #[tokio::test]
    async fn sorted_scan_by_handle() {
        let store = MemoryStore::new();
        for handle in ["mira", "ada", "zoe"] {
            store
                .save(draft(handle, &format!("{handle}@example.com")))
                .await
                .unwrap();
        }

        let page = store
            .find_all_sorted(0, 10, SortKey::Handle, true)
            .await
            .unwrap();
        let handles: Vec<_> =
            page.users.iter().map(|u| u.handle.as_str()).collect();
        assert_eq!(handles, vec!["zoe", "mira", "ada"]);
    }

    #[tokio::test]
    async fn delete_removes_and_reports_missing() {
        let store = MemoryStore::new();
        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        store.delete_by_id(created.id).await.unwrap();
        assert_eq!(store.find_by_id(created.id).await.unwrap(), None);

        let err = store.delete_by_id(created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn count_tracks_live_records() {
        let store = MemoryStore::new();
        assert_eq!(store.count().await.unwrap(), 0);

        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();
        store
            .save(draft("grace", "grace@example.com"))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        store.delete_by_id(created.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn offline_store_fails_without_mutating() {
        let store = MemoryStore::new();
        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        store.set_offline(true);
        let err = store
            .save(draft("grace", "grace@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        let err = store.delete_by_id(created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_offline(false);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn metrics_count_store_calls() {
        let store = MemoryStore::new();
        let created = store
            .save(draft("ada", "ada@example.com"))
            .await
            .unwrap();

        store.find_by_id(created.id).await.unwrap();
        store.find_by_id(created.id).await.unwrap();
        store.find_all().await.unwrap();

        let metrics = store.metrics();
        assert_eq!(metrics.saves.load(AtomicOrdering::Relaxed), 1);
        assert_eq!(
            metrics.point_reads.load(AtomicOrdering::Relaxed),
            2
        );
        assert_eq!(metrics.scans.load(AtomicOrdering::Relaxed), 1);
    }
}
