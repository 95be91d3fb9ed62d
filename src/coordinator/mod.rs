//! Repository composed of several fragments.
//!
//! Reads fan out to every fragment concurrently and merge the partial records.
//! Writes run one fragment at a time in the order the fragments declare for the
//! operation, and undo the fragments that already succeeded when a later one
//! fails. There is no transaction: a failed rollback leaves the stores diverged
//! and is reported as such.

mod mutation;

use crate::fragment::{Fragment, FragmentError, Operation, PartialRecord};
use crate::repository::{GetAllOutcome, Repository, RepositoryError, RepositoryResult};
use crate::song_director::{Property, PropertyValue, SongDirector};
use async_trait::async_trait;
use futures::future::join_all;
use mutation::Mutation;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct AggregateRepository {
    fragments: Vec<Arc<dyn Fragment>>,
}

impl AggregateRepository {
    pub fn new(fragments: Vec<Arc<dyn Fragment>>) -> Self {
        Self { fragments }
    }

    /// Fragments sorted by their weight for `operation`. Equal weights keep the
    /// configured order.
    fn ordered_for(&self, operation: Operation) -> Vec<&Arc<dyn Fragment>> {
        let mut ordered: Vec<_> = self.fragments.iter().collect();
        ordered.sort_by_key(|fragment| fragment.operation_execution_order(operation));
        ordered
    }

    /// Reads `id` from every fragment and merges the records. Any fragment failing
    /// fails the read.
    async fn merged_record(&self, id: &str) -> RepositoryResult<PartialRecord> {
        let results = join_all(self.fragments.iter().map(|fragment| async move {
            (fragment.name(), fragment.try_get_by_id(id).await)
        }))
        .await;

        let mut records = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(mut record) => {
                    record.id.get_or_insert_with(|| id.to_string());
                    records.push(record);
                }
                Err(e) => {
                    failures.push(RepositoryError::fragment_failure(name, Operation::GetById, e))
                }
            }
        }
        if !failures.is_empty() {
            return Err(RepositoryError::Incomplete {
                id: id.to_string(),
                failures,
            });
        }

        PartialRecord::merge_all(records).map_err(|e| RepositoryError::from_merge(id, e))
    }

    async fn roll_back_add(
        &self,
        completed: Vec<(&Arc<dyn Fragment>, Option<String>)>,
        cause: RepositoryError,
        id: Option<String>,
    ) -> RepositoryError {
        if completed.is_empty() {
            return cause;
        }
        warn!(
            "Adding song director failed, rolling back {} fragment(s): {}",
            completed.len(),
            cause
        );

        let mut rolled_back = Vec::new();
        let mut failures = Vec::new();
        for (fragment, stored_id) in completed.into_iter().rev() {
            let result = match &stored_id {
                Some(stored_id) => fragment.try_remove_by_id(stored_id).await,
                None => Err(FragmentError::MissingId(fragment.name().to_string())),
            };
            match result {
                Ok(()) => rolled_back.push(fragment.name().to_string()),
                Err(e) => failures.push(RepositoryError::fragment_failure(
                    fragment.name(),
                    Operation::RemoveById,
                    e,
                )),
            }
        }

        if failures.is_empty() {
            warn!("Rolled back add on {}", rolled_back.join(", "));
            RepositoryError::RolledBack {
                operation: Operation::Add,
                id,
                cause: Box::new(cause),
                fragments: rolled_back,
            }
        } else {
            let error = RepositoryError::CompensationFailure {
                operation: Operation::Add,
                id,
                cause: Box::new(cause),
                failures,
            };
            error!("{}", error);
            error
        }
    }

    /// Applies `mutation` to every fragment in order. When a fragment fails, the
    /// fragments already mutated get the pre-operation state written back.
    async fn run_with_compensation(
        &self,
        id: &str,
        mutation: Mutation<'_>,
    ) -> RepositoryResult<()> {
        let operation = mutation.operation();
        let snapshot = self.merged_record(id).await;
        if let Err(e) = &snapshot {
            debug!("No snapshot of song director {} before {}: {}", id, operation, e);
        }

        let mut completed: Vec<&Arc<dyn Fragment>> = Vec::new();
        for fragment in self.ordered_for(operation) {
            if let Err(e) = mutation.apply(fragment.as_ref(), id).await {
                let cause = RepositoryError::fragment_failure(fragment.name(), operation, e);
                return Err(self.compensate(id, &mutation, completed, cause, snapshot).await);
            }
            completed.push(fragment);
        }
        Ok(())
    }

    async fn compensate(
        &self,
        id: &str,
        mutation: &Mutation<'_>,
        completed: Vec<&Arc<dyn Fragment>>,
        cause: RepositoryError,
        snapshot: RepositoryResult<PartialRecord>,
    ) -> RepositoryError {
        let operation = mutation.operation();
        if completed.is_empty() {
            return cause;
        }

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(snapshot_error) => {
                let error = RepositoryError::SnapshotUnavailable {
                    operation,
                    id: id.to_string(),
                    cause: Box::new(cause),
                    snapshot_error: Box::new(snapshot_error),
                };
                error!("{}", error);
                return error;
            }
        };

        warn!(
            "{} of song director {} failed, rolling back {} fragment(s): {}",
            operation,
            id,
            completed.len(),
            cause
        );
        let mut rolled_back = Vec::new();
        let mut failures = Vec::new();
        for fragment in completed.into_iter().rev() {
            match mutation.undo(fragment.as_ref(), &snapshot).await {
                Ok(()) => rolled_back.push(fragment.name().to_string()),
                Err(e) => failures.push(RepositoryError::fragment_failure(
                    fragment.name(),
                    mutation.undo_operation(),
                    e,
                )),
            }
        }

        if failures.is_empty() {
            warn!(
                "Rolled back {} of song director {} on {}",
                operation,
                id,
                rolled_back.join(", ")
            );
            RepositoryError::RolledBack {
                operation,
                id: Some(id.to_string()),
                cause: Box::new(cause),
                fragments: rolled_back,
            }
        } else {
            let error = RepositoryError::CompensationFailure {
                operation,
                id: Some(id.to_string()),
                cause: Box::new(cause),
                failures,
            };
            error!("{}", error);
            error
        }
    }
}

fn materialize(record: &PartialRecord) -> RepositoryResult<SongDirector> {
    record
        .to_song_director()
        .map_err(|e| RepositoryError::InvalidRecord {
            id: record.id.clone().unwrap_or_default(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl Repository for AggregateRepository {
    async fn try_add(&self, mut song_director: SongDirector) -> RepositoryResult<SongDirector> {
        let mut record = PartialRecord::from(&song_director);
        record.id = None;

        let mut assigned: Option<String> = None;
        let mut completed: Vec<(&Arc<dyn Fragment>, Option<String>)> = Vec::new();
        for fragment in self.ordered_for(Operation::Add) {
            let failure = match fragment.try_add(&record).await {
                Ok(Some(returned)) => {
                    let conflicting = assigned.as_ref().filter(|id| **id != returned).cloned();
                    if let Some(expected) = conflicting {
                        let conflict = RepositoryError::IdentityConflict {
                            fragment: fragment.name().to_string(),
                            expected,
                            returned: returned.clone(),
                        };
                        completed.push((fragment, Some(returned)));
                        Some(conflict)
                    } else {
                        debug!("Fragment {} stored song director {}", fragment.name(), returned);
                        record.id = Some(returned.clone());
                        assigned = Some(returned.clone());
                        completed.push((fragment, Some(returned)));
                        None
                    }
                }
                Ok(None) => {
                    completed.push((fragment, record.id.clone()));
                    None
                }
                Err(e) => Some(RepositoryError::fragment_failure(
                    fragment.name(),
                    Operation::Add,
                    e,
                )),
            };

            if let Some(cause) = failure {
                return Err(self.roll_back_add(completed, cause, assigned).await);
            }
        }

        let id = assigned.ok_or_else(|| RepositoryError::NoIdentityGenerated {
            full_name: song_director.full_name().to_string(),
        })?;
        info!("Added song director {}", id);
        song_director.update_id(id);
        Ok(song_director)
    }

    async fn try_find_property_by_id(
        &self,
        id: &str,
        property: Property,
    ) -> RepositoryResult<Option<PropertyValue>> {
        let results = join_all(self.fragments.iter().map(|fragment| async move {
            (
                fragment.name(),
                fragment.try_find_property_by_id(id, property).await,
            )
        }))
        .await;

        let mut values = Vec::new();
        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(value) => values.push(value),
                Err(FragmentError::PropertyNotStored { .. }) => {
                    debug!("Fragment {} does not store {}", name, property)
                }
                Err(e) => failures.push(RepositoryError::fragment_failure(
                    name,
                    Operation::FindPropertyById,
                    e,
                )),
            }
        }

        if values.is_empty() {
            return Err(RepositoryError::PropertyNotFound {
                id: id.to_string(),
                property,
                failures,
            });
        }
        for failure in &failures {
            warn!("Ignoring failed read of {} for song director {}: {}", property, id, failure);
        }

        let mut agreed: Option<PropertyValue> = None;
        for value in values.into_iter().flatten() {
            match &agreed {
                Some(current) if *current != value => {
                    return Err(RepositoryError::FieldConflict {
                        id: id.to_string(),
                        field: property,
                        left: current.to_string(),
                        right: value.to_string(),
                    });
                }
                Some(_) => {}
                None => agreed = Some(value),
            }
        }
        Ok(agreed)
    }

    async fn try_get_all(&self) -> RepositoryResult<GetAllOutcome> {
        let results = join_all(
            self.fragments
                .iter()
                .map(|fragment| async move { (fragment.name(), fragment.try_get_all().await) }),
        )
        .await;

        let mut scans = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(records) => scans.push((name, records)),
                Err(e) => {
                    failures.push(RepositoryError::fragment_failure(name, Operation::GetAll, e))
                }
            }
        }
        if !failures.is_empty() {
            return Err(RepositoryError::PartialUniverseFailure { failures });
        }

        let mut outcome = GetAllOutcome::default();
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<PartialRecord>> = HashMap::new();
        for (name, records) in scans {
            for record in records {
                let Some(id) = record.id.clone() else {
                    outcome.errors.push(RepositoryError::InvalidRecord {
                        id: String::new(),
                        reason: format!("fragment {} returned a record without an id", name),
                    });
                    continue;
                };
                groups
                    .entry(id.clone())
                    .or_insert_with(|| {
                        order.push(id);
                        Vec::new()
                    })
                    .push(record);
            }
        }

        for id in order {
            let records = groups.remove(&id).unwrap_or_default();
            let director = PartialRecord::merge_all(records)
                .map_err(|e| RepositoryError::from_merge(&id, e))
                .and_then(|merged| materialize(&merged));
            match director {
                Ok(director) => outcome.directors.push(director),
                Err(e) => outcome.errors.push(e),
            }
        }

        if outcome.directors.is_empty() && !outcome.errors.is_empty() {
            return Err(RepositoryError::OutOfSync {
                failures: outcome.errors,
            });
        }
        for e in &outcome.errors {
            warn!("Skipping song director: {}", e);
        }
        Ok(outcome)
    }

    async fn try_get_by_id(&self, id: &str) -> RepositoryResult<SongDirector> {
        materialize(&self.merged_record(id).await?)
    }

    async fn try_remove_by_id(&self, id: &str) -> RepositoryResult<()> {
        self.run_with_compensation(id, Mutation::Remove).await?;
        info!("Removed song director {}", id);
        Ok(())
    }

    async fn try_update(&self, song_director: &SongDirector) -> RepositoryResult<()> {
        let id = song_director.id().ok_or(RepositoryError::MissingId)?;
        let record = PartialRecord::from(song_director);
        self.run_with_compensation(id, Mutation::Update(&record)).await?;
        info!("Updated song director {}", id);
        Ok(())
    }
}
