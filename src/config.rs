use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub const SCHEMA_VERSION: u32 = 1;
pub const CONFIG_FILE: &str = "ceo-bars.json";
pub const DEFAULT_HOST_FILE: &str = "src/app/tracks/page.tsx";
pub const DEFAULT_ARRAY_MARKER: &str = "const tracks: Track[] = [";
pub const DEFAULT_RELINK_MAP: &str = "outputs/blob-urls.json";
pub const DEFAULT_ARCHIVE_NAME: &str = "CEO_Bars_Complete_Collection.zip";
pub const DEFAULT_ARTIST: &str = "Adi 55";
pub const DEFAULT_INSTRUMENTAL: &str = "YouTube Original — Official Release";
pub const DEFAULT_RELEASE_FALLBACK: &str = "YouTube Release";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub host_file: Option<String>,
    #[serde(default)]
    pub host_format: Option<HostFormat>,
    #[serde(default)]
    pub array_marker: Option<String>,
    #[serde(default)]
    pub relink_map: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub archive_name: Option<String>,
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    #[serde(default)]
    pub collections: Option<Vec<CollectionEntry>>,
}

/// How the catalog is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostFormat {
    /// Literal record array inside a generated source file.
    #[default]
    Source,
    /// Plain JSON array of records.
    Json,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CollectionEntry {
    Shorthand(String),
    Detailed(CollectionEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CollectionEntryObject {
    pub name: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub asset_dir: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub url_map: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub featuring: Option<Vec<String>>,
    #[serde(default)]
    pub instrumental: Option<String>,
    #[serde(default)]
    pub fallback_release_date: Option<String>,
    #[serde(default)]
    pub description_template: Option<String>,
}

/// Everything one patch run needs to know about a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub album: String,
    pub asset_dir: String,
    pub metadata: Utf8PathBuf,
    pub url_map: Utf8PathBuf,
    pub artist: String,
    pub featuring: Vec<String>,
    pub instrumental: String,
    pub fallback_release_date: String,
    /// `{title}` is replaced with the track title.
    pub description_template: String,
}

impl Collection {
    pub fn label(&self) -> String {
        collection_label(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub root: Utf8PathBuf,
    pub host_file: Utf8PathBuf,
    pub host_format: HostFormat,
    pub array_marker: String,
    pub relink_map: Utf8PathBuf,
    pub base_url: Option<String>,
    pub archive_name: String,
    pub download_dir: Utf8PathBuf,
    pub concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub collections: Vec<Collection>,
}

impl ResolvedConfig {
    pub fn collection(&self, name: &str) -> Result<&Collection, CatalogError> {
        self.collections
            .iter()
            .find(|collection| collection.name == name)
            .ok_or_else(|| CatalogError::UnknownCollection(name.to_string()))
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `ceo-bars.json` in the working directory. A missing
    /// default file falls back to the built-in configuration.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CatalogError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        let cwd = std::env::current_dir().map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default(), &utf8(&cwd)?);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CatalogError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CatalogError::ConfigParse(err.to_string()))?;

        let root = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
            _ => cwd,
        };
        Self::resolve_config(config, &utf8(&root)?)
    }

    pub fn resolve_config(config: Config, root: &Utf8Path) -> Result<ResolvedConfig, CatalogError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(CatalogError::ConfigParse(format!(
                "unsupported schema_version {schema_version} (expected {SCHEMA_VERSION})"
            )));
        }

        let collections = config
            .collections
            .unwrap_or_else(default_collections)
            .into_iter()
            .map(|entry| match entry {
                CollectionEntry::Shorthand(name) => resolve_collection(
                    CollectionEntryObject {
                        name,
                        album: None,
                        asset_dir: None,
                        metadata: None,
                        url_map: None,
                        artist: None,
                        featuring: None,
                        instrumental: None,
                        fallback_release_date: None,
                        description_template: None,
                    },
                    root,
                ),
                CollectionEntry::Detailed(obj) => resolve_collection(obj, root),
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let download_dir = match config.download_dir {
            Some(dir) => root.join(dir),
            None => default_download_dir(root),
        };

        Ok(ResolvedConfig {
            root: root.to_path_buf(),
            host_file: root.join(config.host_file.as_deref().unwrap_or(DEFAULT_HOST_FILE)),
            host_format: config.host_format.unwrap_or_default(),
            array_marker: config
                .array_marker
                .unwrap_or_else(|| DEFAULT_ARRAY_MARKER.to_string()),
            relink_map: root.join(config.relink_map.as_deref().unwrap_or(DEFAULT_RELINK_MAP)),
            base_url: config.base_url,
            archive_name: config
                .archive_name
                .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string()),
            download_dir,
            concurrency: config.concurrency.unwrap_or(1).max(1),
            fetch_timeout_secs: config
                .fetch_timeout_secs
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            collections,
        })
    }
}

fn resolve_collection(
    obj: CollectionEntryObject,
    root: &Utf8Path,
) -> Result<Collection, CatalogError> {
    let name = obj.name.trim().to_string();
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(CatalogError::ConfigParse(format!(
            "invalid collection name: {:?}",
            obj.name
        )));
    }
    let file_stem = name.replace('-', "_");
    let artist = obj.artist.unwrap_or_else(|| DEFAULT_ARTIST.to_string());
    let description_template = obj
        .description_template
        .unwrap_or_else(|| default_description_template(&artist, &collection_label(&name)));

    Ok(Collection {
        album: obj
            .album
            .unwrap_or_else(|| name.replace('-', " ").to_uppercase()),
        asset_dir: obj
            .asset_dir
            .map(|dir| dir.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("/assets/{name}")),
        metadata: root.join(
            obj.metadata
                .unwrap_or_else(|| format!("outputs/{file_stem}_metadata.json")),
        ),
        url_map: root.join(
            obj.url_map
                .unwrap_or_else(|| format!("outputs/{file_stem}_blob_urls.json")),
        ),
        featuring: obj.featuring.unwrap_or_else(|| vec![artist.clone()]),
        artist,
        instrumental: obj
            .instrumental
            .unwrap_or_else(|| DEFAULT_INSTRUMENTAL.to_string()),
        fallback_release_date: obj
            .fallback_release_date
            .unwrap_or_else(|| DEFAULT_RELEASE_FALLBACK.to_string()),
        description_template,
        name,
    })
}

pub fn default_collections() -> Vec<CollectionEntry> {
    vec![
        CollectionEntry::Shorthand("singles".to_string()),
        CollectionEntry::Shorthand("yt-singles".to_string()),
    ]
}

pub fn default_description_template(artist: &str, label: &str) -> String {
    format!(
        "{{title}} - An official release from {artist}'s YouTube channel. Part of the {label} collection featuring professionally mastered audio from the original video release."
    )
}

/// `yt-singles` -> `YT Singles`.
pub fn collection_label(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            if word.chars().count() <= 2 {
                return word.to_uppercase();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn default_download_dir(root: &Utf8Path) -> Utf8PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .unwrap_or_else(|| root.join("downloads"))
}

fn utf8(path: &Path) -> Result<Utf8PathBuf, CatalogError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|_| CatalogError::Filesystem("non-utf8 project path".to_string()))
}
