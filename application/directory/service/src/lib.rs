use std::sync::Arc;

use directory_cache::{CacheConfig, CacheManager};
use directory_command_handlers::{
    CreateUserHandler, DeleteUserHandler, UpdateUserHandler,
};
use directory_query_handlers::{
    CountUsersQueryHandler, GetUserByHandleQueryHandler,
    GetUserQueryHandler, ListPageQueryHandler, ListUsersQueryHandler,
};
use directory_store::UserStore;

/// The directory's produced interface: all handlers composed over one
/// store handle and one cache, constructed once at startup.
#[derive(Clone)]
pub struct DirectoryService {
    pub create_user: CreateUserHandler,
    pub update_user: UpdateUserHandler,
    pub delete_user: DeleteUserHandler,

    pub get_user: GetUserQueryHandler,
    pub get_user_by_handle: GetUserByHandleQueryHandler,
    pub list_users: ListUsersQueryHandler,
    pub list_page: ListPageQueryHandler,
    pub count_users: CountUsersQueryHandler,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self::with_cache(
            store,
            CacheManager::new(CacheConfig::default()),
        )
    }

    /// All handlers share `cache`, so any mutation invalidates the
    /// regions every reader consults.
    pub fn with_cache(
        store: Arc<dyn UserStore>, cache: CacheManager,
    ) -> Self {
        Self {
            create_user: CreateUserHandler::new(
                store.clone(),
                cache.clone(),
            ),
            update_user: UpdateUserHandler::new(
                store.clone(),
                cache.clone(),
            ),
            delete_user: DeleteUserHandler::new(
                store.clone(),
                cache.clone(),
            ),
            get_user: GetUserQueryHandler::new(
                store.clone(),
                cache.clone(),
            ),
            get_user_by_handle: GetUserByHandleQueryHandler::new(
                store.clone(),
                cache.clone(),
            ),
            list_users: ListUsersQueryHandler::new(
                store.clone(),
                cache.clone(),
            ),
            list_page: ListPageQueryHandler::new(
                store.clone(),
                cache.clone(),
            ),
            count_users: CountUsersQueryHandler::new(store, cache),
        }
    }
}
