use std::fs;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::config::{Collection, HostFormat, ResolvedConfig};
use crate::describe::{format_release_date, normalize_description};
use crate::domain::{TrackMetadata, TrackRecord, UrlMap};
use crate::error::CatalogError;
use crate::fs_util::write_bytes_atomic;
use crate::host::{append_json, compute_next_id, next_id_in, parse_json_catalog, splice_into_source};
use crate::inputs::load_inputs;
use crate::render::render_record_literal;

pub const AUDIO_FILE: &str = "master.mp3";
pub const COVER_FILE: &str = "cover.jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrls {
    pub audio: String,
    /// Empty when the upload stage produced no cover.
    pub cover: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedTrack {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedTrack {
    pub title: String,
    pub expected_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub collection: String,
    pub host_file: String,
    pub loaded_tracks: usize,
    pub loaded_urls: usize,
    pub previous_highest_id: u64,
    pub added: Vec<AddedTrack>,
    pub skipped: Vec<SkippedTrack>,
    pub highest_id: u64,
    pub written: bool,
    pub generated_at: String,
}

/// Canonical local paths of a track's audio and cover under the collection's
/// asset directory.
pub fn asset_paths(collection: &Collection, slug: &str) -> (String, String) {
    let dir = format!("{}/{slug}", collection.asset_dir);
    (format!("{dir}/{AUDIO_FILE}"), format!("{dir}/{COVER_FILE}"))
}

pub fn resolve_asset_urls(
    track: &TrackMetadata,
    collection: &Collection,
    urls: &UrlMap,
) -> Result<AssetUrls, CatalogError> {
    let slug = track.slug();
    let (audio_path, cover_path) = asset_paths(collection, slug.as_str());
    let audio = urls
        .get(&audio_path)
        .ok_or_else(|| CatalogError::MissingAssetUrl {
            title: track.title.clone(),
            path: audio_path.clone(),
        })?;
    Ok(AssetUrls {
        audio: audio.to_string(),
        cover: urls.get(&cover_path).unwrap_or_default().to_string(),
    })
}

pub fn build_record(
    track: &TrackMetadata,
    collection: &Collection,
    id: u64,
    urls: AssetUrls,
) -> TrackRecord {
    TrackRecord {
        id,
        title: track.title.clone(),
        artist: collection.artist.clone(),
        album: collection.album.clone(),
        duration: track.duration.clone(),
        file: urls.audio,
        cover_art: urls.cover,
        description: normalize_description(
            track.description.as_deref().unwrap_or_default(),
            &track.title,
            &collection.description_template,
        ),
        release_date: format_release_date(
            track.upload_date.as_deref(),
            &collection.fallback_release_date,
        ),
        featuring: collection.featuring.clone(),
        instrumental: collection.instrumental.clone(),
    }
}

/// Appends a collection's newly uploaded tracks to the catalog host file.
///
/// The host file is read completely before the single write at the end, so
/// a failed run leaves it untouched. Runs are not idempotent: nothing marks
/// a track as already added, so repeating a run appends the same tracks
/// again under new ids.
pub struct Patcher<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> Patcher<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        collection: &Collection,
        sink: &dyn ProgressSink,
    ) -> Result<PatchReport, CatalogError> {
        let (metadata, urls) = load_inputs(&collection.metadata, &collection.url_map)?;
        sink.event(ProgressEvent::new(format!(
            "Loaded {} tracks from metadata",
            metadata.len()
        )));
        sink.event(ProgressEvent::new(format!("Loaded {} blob URLs", urls.len())));

        let host_path = &self.config.host_file;
        let content = match (self.config.host_format, host_path.as_std_path().exists()) {
            (HostFormat::Json, false) => String::new(),
            _ => fs::read_to_string(host_path.as_std_path())
                .map_err(|err| CatalogError::Filesystem(format!("read {host_path}: {err}")))?,
        };
        let first_id = match self.config.host_format {
            HostFormat::Source => compute_next_id(&content)?,
            HostFormat::Json => next_id_in(&parse_json_catalog(&content)?)?,
        };
        let previous_highest_id = first_id - 1;
        sink.event(ProgressEvent::new(format!(
            "Current highest track ID: {previous_highest_id}"
        )));

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut next_id = first_id;
        for track in &metadata {
            let resolved = match resolve_asset_urls(track, collection, &urls) {
                Ok(resolved) => resolved,
                Err(CatalogError::MissingAssetUrl { title, path }) => {
                    warn!(%title, %path, "skipping track without audio URL");
                    sink.event(ProgressEvent::new(format!(
                        "Skipping {title} - no MP3 URL found"
                    )));
                    skipped.push(SkippedTrack {
                        title,
                        expected_path: path,
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };
            let record = build_record(track, collection, next_id, resolved);
            sink.event(ProgressEvent::new(format!(
                "Added: {} (ID: {})",
                record.title, record.id
            )));
            records.push(record);
            next_id += 1;
        }

        let added: Vec<AddedTrack> = records
            .iter()
            .map(|record| AddedTrack {
                id: record.id,
                title: record.title.clone(),
            })
            .collect();
        let mut report = PatchReport {
            collection: collection.name.clone(),
            host_file: host_path.to_string(),
            loaded_tracks: metadata.len(),
            loaded_urls: urls.len(),
            previous_highest_id,
            added,
            skipped,
            highest_id: next_id - 1,
            written: false,
            generated_at: chrono::Utc::now().to_rfc3339(),
        };

        if records.is_empty() {
            sink.event(ProgressEvent::new("No new tracks to add."));
            return Ok(report);
        }

        let updated = match self.config.host_format {
            HostFormat::Source => {
                let literals: Vec<String> = records.iter().map(render_record_literal).collect();
                splice_into_source(&content, &self.config.array_marker, &literals)?
            }
            HostFormat::Json => append_json(&content, &records)?,
        };
        write_bytes_atomic(host_path, updated.as_bytes())?;
        report.written = true;

        info!(
            collection = %collection.name,
            added = report.added.len(),
            skipped = report.skipped.len(),
            highest_id = report.highest_id,
            "catalog patched"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8Path;

    use super::*;
    use crate::config::{Config, ConfigLoader};

    fn collection() -> Collection {
        let resolved = ConfigLoader::resolve_config(Config::default(), Utf8Path::new("/site")).unwrap();
        resolved.collection("singles").unwrap().clone()
    }

    fn meta(title: &str, slug: &str) -> TrackMetadata {
        TrackMetadata {
            title: title.to_string(),
            slug: Some(slug.to_string()),
            duration: "2:30".to_string(),
            description: None,
            upload_date: Some("20251225".to_string()),
        }
    }

    #[test]
    fn missing_audio_url_is_reported() {
        let urls = UrlMap::default();
        let err = resolve_asset_urls(&meta("One", "one"), &collection(), &urls).unwrap_err();
        assert_matches!(err, CatalogError::MissingAssetUrl { path, .. } if path == "/assets/singles/one/master.mp3");
    }

    #[test]
    fn missing_cover_is_tolerated() {
        let urls: UrlMap = [(
            "/assets/singles/one/master.mp3".to_string(),
            "https://cdn/one.mp3".to_string(),
        )]
        .into_iter()
        .collect();
        let resolved = resolve_asset_urls(&meta("One", "one"), &collection(), &urls).unwrap();
        assert_eq!(resolved.audio, "https://cdn/one.mp3");
        assert_eq!(resolved.cover, "");
    }

    #[test]
    fn record_uses_collection_defaults() {
        let urls = AssetUrls {
            audio: "https://cdn/one.mp3".to_string(),
            cover: "https://cdn/one.jpg".to_string(),
        };
        let record = build_record(&meta("One", "one"), &collection(), 42, urls);
        assert_eq!(record.id, 42);
        assert_eq!(record.album, "SINGLES");
        assert_eq!(record.artist, "Adi 55");
        assert_eq!(record.release_date, "25 December 2025");
        assert!(record.description.starts_with("One - An official release"));
        assert_eq!(record.instrumental, "YouTube Original — Official Release");
    }
}
