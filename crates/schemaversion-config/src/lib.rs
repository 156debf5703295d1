pub mod loader;
pub mod model;
pub mod validation;

pub use loader::ConfigLoader;
pub use model::{AppConfig, ConnectionParams, VersionTableConfig};
pub use validation::IdentifierValidator;
