use std::fs;
use std::io::{self, Cursor, Write};

use camino::Utf8Path;
use tempfile::Builder;
use zip::ZipArchive;

use crate::error::CatalogError;

/// Writes `content` to a temp file next to `path` and persists it over the
/// target, so readers never observe a half-written file.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CatalogError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = Builder::new()
        .prefix(".ceo-bars")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(format!("write {path}: {}", err.error)))?;
    Ok(())
}

/// Reads every entry of an in-memory archive to the end. Returns the number
/// of file entries.
pub fn validate_zip_bytes(bytes: &[u8]) -> Result<usize, CatalogError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| CatalogError::ArchiveFinalization(err.to_string()))?;

    let mut files = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| CatalogError::ArchiveFinalization(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| CatalogError::ArchiveFinalization(err.to_string()))?;
        files += 1;
    }
    Ok(files)
}

/// Replaces characters that would turn a display name into a path.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_content() {
        let temp = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(temp.path().join("nested/page.tsx")).unwrap();
        write_bytes_atomic(&path, b"first").unwrap();
        write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "second");
        let leftovers = fs::read_dir(path.parent().unwrap().as_std_path())
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn garbage_is_not_an_archive() {
        assert!(validate_zip_bytes(b"not a zip").is_err());
    }

    #[test]
    fn separators_are_replaced() {
        assert_eq!(sanitize_file_name("AC/DC: Live?"), "AC_DC_ Live_");
        assert_eq!(sanitize_file_name("../.."), "_..");
        assert_eq!(sanitize_file_name("  "), "untitled");
    }
}
