use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A live directory record. The id is assigned by the store on creation
/// and never changes or gets reused afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub handle: String,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// The caller-supplied field set, used for both create and update.
/// Handle and address are unique across all live records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDraft {
    pub handle: String,
    pub name: String,
    pub address: String,
}

/// Which unique attribute a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictField {
    Handle,
    Address,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle => write!(f, "handle"),
            Self::Address => write!(f, "address"),
        }
    }
}

/// Sortable record attribute for paginated scans. Parsed from the
/// caller-supplied string; unknown keys are rejected before any store
/// or cache access.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum SortKey {
    Id,
    Handle,
    Name,
    Address,
    CreatedAt,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "handle" => Ok(Self::Handle),
            "name" => Ok(Self::Name),
            "address" => Ok(Self::Address),
            "created_at" => Ok(Self::CreatedAt),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Handle => "handle",
            Self::Name => "name",
            Self::Address => "address",
            Self::CreatedAt => "created_at",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of a sorted scan, together with the parameters that
/// produced it and the total live-record count at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub page_index: u64,
    pub page_size: u64,
    pub sort_key: SortKey,
    pub total: u64,
}
