//! The repository interface application code sees, whatever the number of stores
//! behind it.

mod error;

pub use error::RepositoryError;

use crate::song_director::{Property, PropertyValue, SongDirector};
use async_trait::async_trait;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Song directors that could be read, plus the errors for the ones that could not.
#[derive(Debug, Default)]
pub struct GetAllOutcome {
    pub directors: Vec<SongDirector>,
    pub errors: Vec<RepositoryError>,
}

impl GetAllOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// Stores a new song director and returns it with its assigned id.
    async fn try_add(&self, song_director: SongDirector) -> RepositoryResult<SongDirector>;

    async fn try_find_property_by_id(
        &self,
        id: &str,
        property: Property,
    ) -> RepositoryResult<Option<PropertyValue>>;

    async fn try_get_all(&self) -> RepositoryResult<GetAllOutcome>;

    async fn try_get_by_id(&self, id: &str) -> RepositoryResult<SongDirector>;

    async fn try_remove_by_id(&self, id: &str) -> RepositoryResult<()>;

    async fn try_update(&self, song_director: &SongDirector) -> RepositoryResult<()>;
}
