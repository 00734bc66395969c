//! Domain logic for the asset forge: categories, lineage rules, size
//! tables, object-key naming, prompt templates, composite hashing and the
//! local transparent-border trim.
//!
//! Nothing in this crate performs I/O against the database, the object
//! store or the remote transform services.

pub mod category;
pub mod composite;
pub mod error;
pub mod hashing;
pub mod lineage;
pub mod prompt;
pub mod references;
pub mod sizing;
pub mod storage_keys;
pub mod trim;
pub mod types;
