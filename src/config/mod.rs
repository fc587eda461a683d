//! JSON configuration of the command-line tools.
pub mod coherence;
pub mod sgt;

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read and deserialize a JSON config file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config {}: {e}", path.display())))?;
    serde_json::from_str(&data)
        .map_err(|e| Error::Config(format!("Failed to parse config {}: {e}", path.display())))
}

/// Single positional argument: the config path.
pub fn config_path_from_args(program: &str, mut args: impl Iterator<Item = String>) -> Result<PathBuf> {
    match (args.next(), args.next()) {
        (Some(path), None) => Ok(PathBuf::from(path)),
        _ => Err(Error::Config(format!("Usage: {program} <config.json>"))),
    }
}
