//! Schedule fragment backed by SQLite. It owns the active flag only.

use super::{Fragment, FragmentError, FragmentResult, Operation, PartialRecord};
use crate::song_director::{Property, PropertyValue};
use crate::sqlite_column;
use crate::sqlite_persistence::{open_versioned, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};
use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const FRAGMENT_NAME: &str = "schedule";

const SONG_DIRECTOR_TABLE_V_0: Table = Table {
    name: "song_director",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("is_active", &SqlType::Integer),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

const SONG_DIRECTOR_TABLE_V_1: Table = Table {
    name: "song_director",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("is_active", &SqlType::Integer),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_song_director_is_active", "is_active")],
};

const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[SONG_DIRECTOR_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[SONG_DIRECTOR_TABLE_V_1],
        migration: Some(|conn: &Connection| {
            SONG_DIRECTOR_TABLE_V_1.create_index(conn, "idx_song_director_is_active", "is_active")
        }),
    },
];

#[derive(Clone)]
pub struct SqliteScheduleFragment {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteScheduleFragment {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> FragmentResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> FragmentResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| FragmentError::Store("Schedule database lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| FragmentError::Store(format!("Schedule database task failed: {}", e)))?
    }
}

fn required_id(record: &PartialRecord) -> FragmentResult<String> {
    record
        .id
        .clone()
        .ok_or_else(|| FragmentError::MissingId(FRAGMENT_NAME.to_string()))
}

fn schedule_record(id: String, is_active: Option<bool>) -> PartialRecord {
    PartialRecord {
        is_active,
        ..PartialRecord::with_id(id)
    }
}

fn insert_row(conn: &Connection, id: &str, is_active: Option<bool>) -> FragmentResult<()> {
    match conn.execute(
        "INSERT INTO song_director (id, is_active) VALUES (?1, ?2)",
        params![id, is_active],
    ) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(FragmentError::AlreadyExists(id.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

fn select_row(conn: &Connection, id: &str) -> FragmentResult<PartialRecord> {
    conn.query_row(
        "SELECT id, is_active FROM song_director WHERE id = ?1",
        params![id],
        |row| Ok(schedule_record(row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or_else(|| FragmentError::NotFound(id.to_string()))
}

#[async_trait]
impl Fragment for SqliteScheduleFragment {
    fn name(&self) -> &str {
        FRAGMENT_NAME
    }

    fn operation_execution_order(&self, operation: Operation) -> i32 {
        match operation {
            Operation::Add => 2,
            Operation::RemoveById => 1,
            _ => 0,
        }
    }

    async fn try_add(&self, record: &PartialRecord) -> FragmentResult<Option<String>> {
        let id = required_id(record)?;
        let is_active = record.is_active;
        debug!("Adding schedule row for song director {}", id);
        self.with_conn(move |conn| {
            insert_row(conn, &id, is_active)?;
            Ok(Some(id))
        })
        .await
    }

    async fn try_find_property_by_id(
        &self,
        id: &str,
        property: Property,
    ) -> FragmentResult<Option<PropertyValue>> {
        if property != Property::IsActive {
            return Err(FragmentError::PropertyNotStored {
                fragment: FRAGMENT_NAME.to_string(),
                property,
            });
        }
        let id = id.to_string();
        let record = self.with_conn(move |conn| select_row(conn, &id)).await?;
        Ok(record.is_active.map(PropertyValue::Flag))
    }

    async fn try_get_all(&self) -> FragmentResult<Vec<PartialRecord>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, is_active FROM song_director ORDER BY created, id")?;
            let records = stmt
                .query_map([], |row| Ok(schedule_record(row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, rusqlite::Error>>()?;
            Ok(records)
        })
        .await
    }

    async fn try_get_by_id(&self, id: &str) -> FragmentResult<PartialRecord> {
        let id = id.to_string();
        self.with_conn(move |conn| select_row(conn, &id)).await
    }

    async fn try_remove_by_id(&self, id: &str) -> FragmentResult<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM song_director WHERE id = ?1", params![id])?;
            if removed == 0 {
                return Err(FragmentError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn try_update(&self, record: &PartialRecord) -> FragmentResult<()> {
        let id = required_id(record)?;
        let is_active = record.is_active;
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE song_director SET is_active = ?2 WHERE id = ?1",
                params![id, is_active],
            )?;
            if updated == 0 {
                return Err(FragmentError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn try_rollback_remove(&self, record: &PartialRecord) -> FragmentResult<()> {
        let id = required_id(record)?;
        let is_active = record.is_active;
        self.with_conn(move |conn| insert_row(conn, &id, is_active))
            .await
    }
}
