use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct GetUserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetUserByHandleQuery {
    pub handle: String,
}

/// Paginated listing parameters as supplied by the caller. The sort
/// key arrives as a plain string and the page size as a signed value;
/// both are validated by the handler before any cache or store access.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPageQuery {
    pub page_index: u64,
    pub page_size: i64,
    pub sort_key: String,
}
