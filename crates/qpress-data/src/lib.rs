//! QPress Data -- zone and scenario definitions loaded from RON, TOML or
//! JSON data directories.

pub mod loader;
pub mod schema;

pub use loader::{load_data_dir, DataLoadError, DataSet};
pub use schema::ScenarioData;
