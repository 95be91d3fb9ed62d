use crate::fragment::{FragmentError, MergeError, Operation};
use crate::song_director::Property;
use thiserror::Error;

fn list(errors: &[RepositoryError]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}]", e))
        .collect::<Vec<_>>()
        .join("; ")
}

fn described_id(id: &Option<String>) -> &str {
    id.as_deref().unwrap_or("<unassigned>")
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Fragment {fragment} failed on {operation}: {source}")]
    FragmentFailure {
        fragment: String,
        operation: Operation,
        source: FragmentError,
    },

    #[error("Song director {id} has conflicting values for {field}: {left} != {right}")]
    FieldConflict {
        id: String,
        field: Property,
        left: String,
        right: String,
    },

    #[error("Song director {id} can't be built from its stored fields ({reason}), manual remediation required")]
    InvalidRecord { id: String, reason: String },

    #[error("Song director {full_name} was stored but no fragment generated an id, manual remediation required")]
    NoIdentityGenerated { full_name: String },

    #[error("Fragment {fragment} stored the song director as {returned} instead of {expected}")]
    IdentityConflict {
        fragment: String,
        expected: String,
        returned: String,
    },

    #[error("{operation} of song director {} failed and was rolled back on {}: {cause}", described_id(.id), .fragments.join(", "))]
    RolledBack {
        operation: Operation,
        id: Option<String>,
        cause: Box<RepositoryError>,
        fragments: Vec<String>,
    },

    #[error("{operation} of song director {} failed and could not be rolled back: {cause}. Rollback errors: {}", described_id(.id), list(.failures))]
    CompensationFailure {
        operation: Operation,
        id: Option<String>,
        cause: Box<RepositoryError>,
        failures: Vec<RepositoryError>,
    },

    #[error("{operation} of song director {id} failed and can't be rolled back, original state unavailable: {cause}. Snapshot error: {snapshot_error}")]
    SnapshotUnavailable {
        operation: Operation,
        id: String,
        cause: Box<RepositoryError>,
        snapshot_error: Box<RepositoryError>,
    },

    #[error("Could not read every fragment: {}", list(.failures))]
    PartialUniverseFailure { failures: Vec<RepositoryError> },

    #[error("Could not read song director {id} from every fragment: {}", list(.failures))]
    Incomplete {
        id: String,
        failures: Vec<RepositoryError>,
    },

    #[error("No fragment returned {property} of song director {id}: {}", list(.failures))]
    PropertyNotFound {
        id: String,
        property: Property,
        failures: Vec<RepositoryError>,
    },

    #[error("Fragments are out of sync, no song director could be read: {}", list(.failures))]
    OutOfSync { failures: Vec<RepositoryError> },

    #[error("Song director has no id")]
    MissingId,
}

impl RepositoryError {
    pub fn fragment_failure(fragment: &str, operation: Operation, source: FragmentError) -> Self {
        RepositoryError::FragmentFailure {
            fragment: fragment.to_string(),
            operation,
            source,
        }
    }

    /// Maps a merge failure for the song director `id`.
    pub fn from_merge(id: &str, error: MergeError) -> Self {
        match error {
            MergeError::FieldConflict {
                field, left, right, ..
            } => RepositoryError::FieldConflict {
                id: id.to_string(),
                field,
                left,
                right,
            },
            other => RepositoryError::InvalidRecord {
                id: id.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// True when the failure only says that the song director does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            RepositoryError::FragmentFailure {
                source: FragmentError::NotFound(_),
                ..
            } => true,
            RepositoryError::Incomplete { failures, .. }
            | RepositoryError::PropertyNotFound { failures, .. } => {
                !failures.is_empty() && failures.iter().all(RepositoryError::is_not_found)
            }
            _ => false,
        }
    }
}
