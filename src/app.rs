use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;

use crate::archive::{BulkDownloader, BulkReport, SingleReport};
use crate::catalog::{Catalog, CatalogWarning};
use crate::config::ResolvedConfig;
use crate::domain::TrackRecord;
use crate::error::CatalogError;
use crate::fetch::AssetFetcher;
use crate::fs_util::write_bytes_atomic;
use crate::host::relink_source;
use crate::inputs::load_url_map;
use crate::notify::Toast;
use crate::patch::{PatchReport, Patcher};
use crate::save::SaveTarget;

pub const DEFAULT_EXPORT_FILE: &str = "outputs/tracks.json";

#[derive(Debug, Clone, Serialize)]
pub struct RelinkReport {
    pub host_file: String,
    pub url_map: String,
    pub loaded_urls: usize,
    pub replaced: Vec<String>,
    pub written: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub total: usize,
    pub query: Option<String>,
    pub tracks: Vec<TrackRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResult {
    pub tracks: usize,
    pub highest_id: Option<u64>,
    pub warnings: Vec<CatalogWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub path: String,
    pub tracks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSinkKind {
    BulkDownload,
    SingleDownload,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    /// Bulk download percentage, when the event reports one.
    pub percent: Option<u8>,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            percent: None,
            elapsed: None,
        }
    }

    pub fn progress(message: impl Into<String>, percent: u8) -> Self {
        Self {
            message: message.into(),
            percent: Some(percent),
            elapsed: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);

    fn notify(&self, _toast: &Toast) {}
}

pub struct App<F: AssetFetcher, S: SaveTarget> {
    config: ResolvedConfig,
    downloader: BulkDownloader<F, S>,
}

impl<F: AssetFetcher, S: SaveTarget> App<F, S> {
    pub fn new(config: ResolvedConfig, fetcher: F, saver: S) -> Self {
        let downloader = BulkDownloader::new(
            fetcher,
            saver,
            config.archive_name.clone(),
            config.concurrency,
        );
        Self { config, downloader }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Patches one named collection, or every configured collection in order.
    pub fn patch(
        &self,
        collection: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<PatchReport>, CatalogError> {
        let collections = match collection {
            Some(name) => vec![self.config.collection(name)?],
            None => self.config.collections.iter().collect(),
        };
        let patcher = Patcher::new(&self.config);
        let mut reports = Vec::with_capacity(collections.len());
        for collection in collections {
            reports.push(patcher.run(collection, sink)?);
        }
        Ok(reports)
    }

    /// Swaps local asset paths in the host file for their public URLs.
    pub fn relink(&self, sink: &dyn ProgressSink) -> Result<RelinkReport, CatalogError> {
        let urls = load_url_map(&self.config.relink_map)?;
        sink.event(ProgressEvent::new(format!("Loaded {} URL mappings", urls.len())));

        let host_path = &self.config.host_file;
        let content = fs::read_to_string(host_path.as_std_path())
            .map_err(|err| CatalogError::Filesystem(format!("read {host_path}: {err}")))?;
        let result = relink_source(&content, &urls);
        for path in &result.replaced {
            sink.event(ProgressEvent::new(format!("Replaced: {path}")));
        }

        let written = !result.replaced.is_empty();
        if written {
            write_bytes_atomic(host_path, result.content.as_bytes())?;
        }
        info!(replaced = result.replaced.len(), "relink finished");
        Ok(RelinkReport {
            host_file: host_path.to_string(),
            url_map: self.config.relink_map.to_string(),
            loaded_urls: urls.len(),
            replaced: result.replaced,
            written,
        })
    }

    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::load(
            &self.config.host_file,
            self.config.host_format,
            &self.config.array_marker,
        )
    }

    pub fn list(
        &self,
        query: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<ListResult, CatalogError> {
        let catalog = self.load_catalog()?;
        sink.event(ProgressEvent::new(format!(
            "Loaded {} tracks from {}",
            catalog.len(),
            self.config.host_file
        )));
        Ok(ListResult {
            total: catalog.len(),
            query: query.map(str::to_string),
            tracks: catalog.filter(query.unwrap_or_default()),
        })
    }

    pub fn validate(&self, sink: &dyn ProgressSink) -> Result<ValidateResult, CatalogError> {
        let catalog = self.load_catalog()?;
        let warnings = catalog.validate()?;
        for warning in &warnings {
            sink.event(ProgressEvent::new(format!(
                "Track {}: {}",
                warning.id, warning.message
            )));
        }
        Ok(ValidateResult {
            tracks: catalog.len(),
            highest_id: catalog.max_id(),
            warnings,
        })
    }

    pub fn export(
        &self,
        output: Option<&Utf8Path>,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, CatalogError> {
        let catalog = self.load_catalog()?;
        let path = match output {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.config.root.join(path),
            None => default_export_path(&self.config.root),
        };
        write_bytes_atomic(&path, catalog.to_json()?.as_bytes())?;
        sink.event(ProgressEvent::new(format!(
            "Exported {} tracks to {path}",
            catalog.len()
        )));
        Ok(ExportResult {
            path: path.to_string(),
            tracks: catalog.len(),
        })
    }

    /// Archives the whole catalog, or the tracks matching `query`.
    pub fn download_all(
        &self,
        query: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<BulkReport, CatalogError> {
        let catalog = self.load_catalog()?;
        let tracks = catalog.filter(query.unwrap_or_default());
        self.downloader.download_all(&tracks, sink)
    }

    pub fn download_one(
        &self,
        id: u64,
        sink: &dyn ProgressSink,
    ) -> Result<SingleReport, CatalogError> {
        let catalog = self.load_catalog()?;
        let track = catalog.get(id).ok_or(CatalogError::TrackNotFound(id))?;
        self.downloader.download_one(track, sink)
    }
}

/// Default output path for `export`, relative to the project root.
pub fn default_export_path(root: &Utf8Path) -> Utf8PathBuf {
    root.join(DEFAULT_EXPORT_FILE)
}
