//! Stores and song directors shared by the end-to-end tests

use super::directory_server::FakeDirectory;
use song_director_store::fragment::{DirectoryFragment, Fragment, SqliteScheduleFragment};
use song_director_store::{AggregateRepository, SongDirector};
use std::sync::Arc;
use tempfile::TempDir;

/// A repository over the fake directory and a SQLite schedule database, plus
/// direct handles on both stores for assertions.
pub struct TestStores {
    pub repository: AggregateRepository,
    pub directory: FakeDirectory,
    pub schedule: Arc<SqliteScheduleFragment>,
    _temp_dir: TempDir,
}

impl TestStores {
    pub async fn spawn() -> Self {
        let directory = FakeDirectory::spawn().await;
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let schedule = Arc::new(
            SqliteScheduleFragment::open(temp_dir.path().join("schedule.db"))
                .expect("Failed to open schedule database"),
        );
        let identity: Arc<dyn Fragment> = Arc::new(
            DirectoryFragment::new(directory.fragment_config())
                .expect("Failed to create directory fragment"),
        );
        let schedule_fragment: Arc<dyn Fragment> = schedule.clone();

        Self {
            repository: AggregateRepository::new(vec![identity, schedule_fragment]),
            directory,
            schedule,
            _temp_dir: temp_dir,
        }
    }
}

pub fn ana() -> SongDirector {
    SongDirector::try_create(
        Some("Ana Lopez"),
        Some("ana@example.com"),
        Some("5551234567"),
        Some("Journeyer"),
        true,
    )
    .unwrap()
}

pub fn bruno() -> SongDirector {
    SongDirector::try_create(Some("Bruno Diaz"), Some("bruno@example.com"), None, None, false)
        .unwrap()
}
