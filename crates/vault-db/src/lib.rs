//! MediaVault persistence layer
//!
//! The primary record store (`media` table), the FTS5 search index
//! (`media_fts`) and [`MediaStore`], which writes both inside one SQLite
//! transaction.

pub mod index;
pub mod pool;
pub mod repository;
pub mod store;
pub mod test_helpers;

pub use index::{FtsIndex, SearchIndex};
pub use pool::{connect, connect_options, connect_with, run_migrations};
pub use repository::MediaRepository;
pub use store::{IndexSync, MediaStore};
