pub mod error;

pub use error::{Error, Result};

/// A schema version. Versions are totally ordered and stored as an integer
/// column in the version table.
pub type Version = i64;
