//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{ana, TestStores};
//! use song_director_store::Repository;
//!
//! #[tokio::test]
//! async fn test_add() {
//!     let stores = TestStores::spawn().await;
//!     let stored = stores.repository.try_add(ana()).await.unwrap();
//!     assert_eq!(stored.id(), Some("user-1"));
//! }
//! ```

mod directory_server;
mod fixtures;

#[allow(unused_imports)]
pub use directory_server::{DirectoryRoute, FakeDirectory, DIRECTORY_DOMAIN};
#[allow(unused_imports)]
pub use fixtures::{ana, bruno, TestStores};
