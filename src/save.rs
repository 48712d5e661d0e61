use camino::Utf8PathBuf;
use tracing::info;

use crate::error::CatalogError;
use crate::fs_util::{sanitize_file_name, write_bytes_atomic};

/// Hands finished downloads to the user. One call per completed download.
pub trait SaveTarget: Send + Sync {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Utf8PathBuf, CatalogError>;
}

/// Saves into a directory, replacing any file with the same name.
#[derive(Debug, Clone)]
pub struct DirectorySave {
    dir: Utf8PathBuf,
}

impl DirectorySave {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SaveTarget for DirectorySave {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Utf8PathBuf, CatalogError> {
        let path = self.dir.join(sanitize_file_name(file_name));
        write_bytes_atomic(&path, bytes)?;
        info!(path = %path, bytes = bytes.len(), "saved download");
        Ok(path)
    }
}
