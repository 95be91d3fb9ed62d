//! Song Director Store Library
//!
//! A song director repository whose fields are split across several stores, kept
//! consistent by a coordinator with compensating rollback.

pub mod config;
pub mod coordinator;
pub mod fragment;
pub mod repository;
pub mod song_director;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use coordinator::AggregateRepository;
pub use fragment::{Fragment, FragmentError, Operation, PartialRecord};
pub use repository::{GetAllOutcome, Repository, RepositoryError};
pub use song_director::{Property, PropertyValue, Rank, SongDirector};
