use std::fs;

use camino::Utf8Path;
use serde::de::DeserializeOwned;

use crate::domain::{TrackMetadata, UrlMap};
use crate::error::CatalogError;

/// Loads the two side inputs of a patch run. Both must already exist; they
/// are produced by the download and upload stages.
pub fn load_inputs(
    metadata_path: &Utf8Path,
    url_map_path: &Utf8Path,
) -> Result<(Vec<TrackMetadata>, UrlMap), CatalogError> {
    require_file(
        metadata_path,
        "metadata file not found; run the download stage first",
    )?;
    require_file(url_map_path, "URL map not found; run the upload stage first")?;

    let metadata: Vec<TrackMetadata> = read_json(metadata_path)?;
    let urls = load_url_map(url_map_path)?;
    Ok((metadata, urls))
}

pub fn load_url_map(path: &Utf8Path) -> Result<UrlMap, CatalogError> {
    require_file(path, "URL map not found; run the upload stage first")?;
    read_json(path)
}

fn require_file(path: &Utf8Path, hint: &str) -> Result<(), CatalogError> {
    if path.as_std_path().is_file() {
        return Ok(());
    }
    Err(CatalogError::MissingInputFile {
        path: path.as_std_path().to_path_buf(),
        hint: hint.to_string(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, CatalogError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(format!("read {path}: {err}")))?;
    serde_json::from_str(&content).map_err(|err| CatalogError::InputParse {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    })
}
