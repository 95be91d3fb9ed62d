//! Fragments are the stores that each own a subset of the song director fields.

mod directory;
mod in_memory;
mod partial_record;
mod sqlite_schedule;

pub use directory::{
    DirectoryFragment, DirectoryFragmentConfig, DEFAULT_JOB_TITLE, DEFAULT_ROLES_ATTRIBUTE,
    DEFAULT_TIMEOUT_SEC,
};
pub use in_memory::{FragmentCall, InMemoryFragment};
pub use partial_record::{MergeError, PartialRecord};
pub use sqlite_schedule::SqliteScheduleFragment;

use crate::song_director::{Property, PropertyValue};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// The operations a fragment takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    FindPropertyById,
    GetAll,
    GetById,
    RemoveById,
    Update,
    RollbackRemove,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::FindPropertyById => "find_property_by_id",
            Operation::GetAll => "get_all",
            Operation::GetById => "get_by_id",
            Operation::RemoveById => "remove_by_id",
            Operation::Update => "update",
            Operation::RollbackRemove => "rollback_remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Song director not found: {0}")]
    NotFound(String),

    /// The fragment does not own the requested property. The coordinator skips
    /// these instead of counting them as failures.
    #[error("Fragment {fragment} does not store property {property}")]
    PropertyNotStored { fragment: String, property: Property },

    #[error("Fragment {0} needs an id to store a song director")]
    MissingId(String),

    #[error("Invalid song director id: {0:?}")]
    InvalidId(String),

    #[error("Song director already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid value for {property}: {value}")]
    InvalidValue { property: Property, value: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type FragmentResult<T> = Result<T, FragmentError>;

/// A store holding some of the fields of every song director.
///
/// Methods return the fragment's own projection of the record: fields the fragment
/// does not own are left as `None`.
#[async_trait]
pub trait Fragment: Send + Sync {
    fn name(&self) -> &str;

    /// Weight used to order this fragment among the others for `operation`.
    /// Lower weights run first.
    fn operation_execution_order(&self, _operation: Operation) -> i32 {
        0
    }

    /// Stores the fragment's fields of `record` and returns the id it was stored under.
    /// A fragment that generates ids may return one when `record.id` is `None`.
    async fn try_add(&self, record: &PartialRecord) -> FragmentResult<Option<String>>;

    /// Value of one property. `Ok(None)` means the fragment owns the property but
    /// holds no value for it; properties it does not own fail with `PropertyNotStored`.
    async fn try_find_property_by_id(
        &self,
        id: &str,
        property: Property,
    ) -> FragmentResult<Option<PropertyValue>>;

    async fn try_get_all(&self) -> FragmentResult<Vec<PartialRecord>>;

    async fn try_get_by_id(&self, id: &str) -> FragmentResult<PartialRecord>;

    async fn try_remove_by_id(&self, id: &str) -> FragmentResult<()>;

    async fn try_update(&self, record: &PartialRecord) -> FragmentResult<()>;

    /// Restores a record removed by `try_remove_by_id`.
    async fn try_rollback_remove(&self, record: &PartialRecord) -> FragmentResult<()>;
}
