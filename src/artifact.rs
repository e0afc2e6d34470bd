use serde::de::DeserializeOwned;
use std::{fs, path::Path};

use crate::error::ArtifactError;

/// Reads and parses a JSON artifact exported alongside the trained model.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let txt = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&txt).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
