//! Media archiver
//!
//! Walks a package manifest, LZ4-compresses selected file types, optionally
//! encrypts every file and stores the result in a single keyed database
//! file. [`MediaDatabase::read`] reverses the process.

pub mod compress;
pub mod database;
pub mod encrypt;
pub mod error;
pub mod manifest;
pub mod pack;

pub use database::{MediaDatabase, StoredFile};
pub use error::MediaError;
pub use pack::{PackOptions, PackSummary, run};
