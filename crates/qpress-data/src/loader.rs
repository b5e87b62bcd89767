//! Loading pipeline: reads zone and scenario files, checks names, builds the
//! topology registry.
//!
//! A data directory holds `zones.{ron,toml,json}` (optional) and
//! `scenarios.{ron,toml,json}` (required). Zones in the file are added to the
//! built-in ones; a file zone whose key matches a built-in zone replaces it.

use qpress_core::batch::run_batch;
use qpress_core::engine::SimulationOutput;
use qpress_core::error::ConfigError;
use qpress_core::topology::{TopologyRegistry, TopologyRegistryBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::schema::{ScenarioData, ZoneData};

/// Base name of the zone file.
pub const ZONES_FILE: &str = "zones";

/// Base name of the scenario file.
pub const SCENARIOS_FILE: &str = "scenarios";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A scenario names a zone the registry does not have.
    #[error("scenario '{scenario}' in {file} references unknown zone '{zone}'")]
    UnknownZone {
        file: PathBuf,
        scenario: String,
        zone: String,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// Zone or scenario values the engine rejects.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

fn parse_str<T: DeserializeOwned>(
    path: &Path,
    format: Format,
    content: &str,
) -> Result<T, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(path, e)),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_str(path, format, &content)
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    if format != Format::Toml {
        return parse_str(path, format, &content);
    }

    let mut table: toml::Table = parse_str(path, format, &content)?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

/// Fail with `DuplicateName` if `name` was already seen in this file.
pub fn check_duplicate(
    seen: &mut HashMap<String, usize>,
    name: &str,
    index: usize,
    file: &Path,
) -> Result<(), DataLoadError> {
    if seen.insert(name.to_string(), index).is_some() {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

// ===========================================================================
// Zones
// ===========================================================================

/// Load a zone list and merge it over the built-in zones.
pub fn load_zones(path: &Path) -> Result<TopologyRegistry, DataLoadError> {
    let zones: Vec<ZoneData> = deserialize_list(path, "zones")?;
    let mut seen = HashMap::new();
    let mut builder = TopologyRegistryBuilder::with_builtin_zones();

    for (i, zone) in zones.iter().enumerate() {
        check_duplicate(&mut seen, &zone.key, i, path)?;
        let centers = zone.resolve_centers();
        let replaced = builder
            .mutate_zone(&zone.key, |z| {
                z.route = zone.route.clone();
                z.centers = centers.clone();
            })
            .is_ok();
        if replaced {
            debug!(zone = %zone.key, "replacing built-in zone");
        } else {
            builder.register_zone(&zone.key, zone.route.clone(), centers);
        }
    }

    Ok(builder.build()?)
}

// ===========================================================================
// Scenarios
// ===========================================================================

/// Load a scenario list, validating every config against `registry`.
pub fn load_scenarios(
    path: &Path,
    registry: &TopologyRegistry,
) -> Result<Vec<ScenarioData>, DataLoadError> {
    let scenarios: Vec<ScenarioData> = deserialize_list(path, "scenarios")?;
    let mut seen = HashMap::new();

    for (i, s) in scenarios.iter().enumerate() {
        check_duplicate(&mut seen, &s.name, i, path)?;
        if registry.zone(&s.config.zone).is_err() {
            return Err(DataLoadError::UnknownZone {
                file: path.to_path_buf(),
                scenario: s.name.clone(),
                zone: s.config.zone.clone(),
            });
        }
        s.config.validate()?;
    }

    Ok(scenarios)
}

// ===========================================================================
// Data directory
// ===========================================================================

/// Everything a data directory defines.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub registry: TopologyRegistry,
    pub scenarios: Vec<ScenarioData>,
}

impl DataSet {
    pub fn scenario(&self, name: &str) -> Option<&ScenarioData> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Run every scenario, pairing each result with its scenario name.
    pub fn run_all(&self) -> Vec<(&str, Result<SimulationOutput, ConfigError>)> {
        let configs: Vec<_> = self.scenarios.iter().map(|s| s.config.clone()).collect();
        self.scenarios
            .iter()
            .map(|s| s.name.as_str())
            .zip(run_batch(&self.registry, &configs))
            .collect()
    }
}

/// Load a data directory.
pub fn load_data_dir(dir: &Path) -> Result<DataSet, DataLoadError> {
    let registry = match find_data_file(dir, ZONES_FILE)? {
        Some(path) => load_zones(&path)?,
        None => TopologyRegistry::builtin(),
    };
    let scenarios_path = require_data_file(dir, SCENARIOS_FILE)?;
    let scenarios = load_scenarios(&scenarios_path, &registry)?;

    info!(
        dir = %dir.display(),
        zones = registry.zone_count(),
        scenarios = scenarios.len(),
        "data directory loaded"
    );
    Ok(DataSet {
        registry,
        scenarios,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
