use std::collections::BTreeSet;
use std::fs;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;
use serde::Serialize;
use serde::de::IgnoredAny;

use crate::config::HostFormat;
use crate::domain::TrackRecord;
use crate::error::CatalogError;
use crate::host::{parse_json_catalog, render_json_catalog};

static ARRAY_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[\s*\];|\n\];").unwrap());

/// The ordered track list. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    tracks: Vec<TrackRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogWarning {
    pub id: u64,
    pub message: String,
}

impl Catalog {
    pub fn new(tracks: Vec<TrackRecord>) -> Self {
        Self { tracks }
    }

    pub fn load(path: &Utf8Path, format: HostFormat, marker: &str) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| CatalogError::Filesystem(format!("read {path}: {err}")))?;
        match format {
            HostFormat::Source => Self::from_source(&content, marker),
            HostFormat::Json => Self::from_json(&content),
        }
    }

    /// Reads the literal array declared by `marker` out of a source file.
    /// The array runs from its `[` to the first `];` that starts a line, or
    /// is empty (`[];`).
    pub fn from_source(source: &str, marker: &str) -> Result<Self, CatalogError> {
        let start = source.find(marker).ok_or_else(|| {
            CatalogError::MalformedHostFile(format!("array declaration `{marker}` not found"))
        })?;
        let open = if marker.trim_end().ends_with('[') {
            start + marker.trim_end().len() - 1
        } else {
            source[start + marker.len()..]
                .find('[')
                .map(|offset| start + marker.len() + offset)
                .ok_or_else(|| {
                    CatalogError::MalformedHostFile("record array has no opening `[`".to_string())
                })?
        };
        let close = ARRAY_END
            .find(&source[open..])
            .map(|found| open + found.end() - 1)
            .ok_or_else(|| {
                CatalogError::MalformedHostFile("record array has no closing `];`".to_string())
            })?;

        let array = &source[open..close];
        json5::from_str::<Vec<IgnoredAny>>(array)
            .map_err(|err| CatalogError::MalformedHostFile(format!("record array: {err}")))?;
        let tracks = json5::from_str::<Vec<TrackRecord>>(array)
            .map_err(|err| CatalogError::InvalidRecord(err.to_string()))?;
        Ok(Self { tracks })
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            tracks: parse_json_catalog(content)?,
        })
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        render_json_catalog(&self.tracks)
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&TrackRecord> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn max_id(&self) -> Option<u64> {
        self.tracks.iter().map(|track| track.id).max()
    }

    /// Case-insensitive match of `query` against title, artist and album.
    /// An empty query keeps everything.
    pub fn filter(&self, query: &str) -> Vec<TrackRecord> {
        let needle = query.trim().to_lowercase();
        self.tracks
            .iter()
            .filter(|track| {
                needle.is_empty()
                    || track.title.to_lowercase().contains(&needle)
                    || track.artist.to_lowercase().contains(&needle)
                    || track.album.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Hard invariants fail; soft issues come back as warnings.
    pub fn validate(&self) -> Result<Vec<CatalogWarning>, CatalogError> {
        let mut seen = BTreeSet::new();
        let mut warnings = Vec::new();
        for track in &self.tracks {
            if track.id == 0 {
                return Err(CatalogError::InvalidRecord(format!(
                    "\"{}\" has id 0; ids must be positive",
                    track.title
                )));
            }
            if !seen.insert(track.id) {
                return Err(CatalogError::InvalidRecord(format!(
                    "duplicate id {}",
                    track.id
                )));
            }
            if track.file.trim().is_empty() {
                return Err(CatalogError::InvalidRecord(format!(
                    "track {} (\"{}\") has no file",
                    track.id, track.title
                )));
            }
            if !track.has_well_formed_duration() {
                warnings.push(CatalogWarning {
                    id: track.id,
                    message: format!("duration {:?} is not M:SS", track.duration),
                });
            }
            if track.cover_art.is_empty() {
                warnings.push(CatalogWarning {
                    id: track.id,
                    message: "no cover art".to_string(),
                });
            }
        }
        for warning in &warnings {
            tracing::warn!(id = warning.id, "{}", warning.message);
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const MARKER: &str = "const tracks: Track[] = [";

    const PAGE: &str = r#""use client";

interface Track {
  id: number;
  featuring?: string[];
}

const tracks: Track[] = [
  {
    id: 1,
    title: "CEO Bars",
    artist: "Adi 55",
    album: "CEO Bars™",
    duration: "3:42",
    file: "https://cdn/ceo-bars/master.mp3",
    coverArt: "https://cdn/ceo-bars/cover.jpg",
    description: "Anthem.",
    releaseDate: "25th December 2025",
    featuring: ["Adi 55"],
    instrumental: "FASTFORWARD by AllRoundaBeats",
  },
  {
    id: 2,
    title: "Zen, Yoga, and Quantum Physics",
    artist: "Zen Master Aditya Patange",
    album: "DETBOMBAY FREESTYLES",
    duration: "7:34",
    file: "/assets/detbombay-freestyles/zen/master.mp3",
    coverArt: "",
    description: "Mystic.",
    releaseDate: "26th December 2025",
    instrumental: "SOUNDIFY ZONER",
  },
];

export default function TracksPage() {}
"#;

    #[test]
    fn reads_records_from_source() {
        let catalog = Catalog::from_source(PAGE, MARKER).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tracks()[0].cover_art, "https://cdn/ceo-bars/cover.jpg");
        assert_eq!(catalog.tracks()[1].featuring, Vec::<String>::new());
        assert_eq!(catalog.max_id(), Some(2));
    }

    #[test]
    fn filter_matches_title_artist_album() {
        let catalog = Catalog::from_source(PAGE, MARKER).unwrap();
        assert_eq!(catalog.filter("zen").len(), 1);
        assert_eq!(catalog.filter("ADI").len(), 2);
        assert_eq!(catalog.filter("detbombay").len(), 1);
        assert_eq!(catalog.filter("  ").len(), 2);
        assert!(catalog.filter("nothing").is_empty());
    }

    #[test]
    fn validate_warns_on_missing_cover() {
        let catalog = Catalog::from_source(PAGE, MARKER).unwrap();
        let warnings = catalog.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].id, 2);
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut tracks = Catalog::from_source(PAGE, MARKER).unwrap().tracks().to_vec();
        tracks[1].id = 1;
        let err = Catalog::new(tracks).validate().unwrap_err();
        assert_matches!(err, CatalogError::InvalidRecord(_));
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let catalog = Catalog::from_source(PAGE, MARKER).unwrap();
        let json = catalog.to_json().unwrap();
        assert!(json.contains("\"coverArt\""));
        assert_eq!(Catalog::from_json(&json).unwrap(), catalog);
    }

    #[test]
    fn reads_comments_and_single_quotes() {
        let page = "const tracks: Track[] = [\n  // newest first\n  {\n    id: 5,\n    title: 'Boomday',\n    artist: \"Adi 55\",\n    album: \"CEO Bars\",\n    duration: \"2:58\",\n    file: \"https://cdn/boomday.mp3\",\n    featuring: [],\n  },\n];\n";
        let catalog = Catalog::from_source(page, MARKER).unwrap();
        assert_eq!(catalog.tracks()[0].title, "Boomday");
        assert_eq!(catalog.tracks()[0].id, 5);
    }

    #[test]
    fn empty_array_reads_as_empty_catalog() {
        let catalog = Catalog::from_source("const tracks: Track[] = [];\n", MARKER).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.max_id(), None);
    }

    #[test]
    fn unterminated_array_is_malformed() {
        let page = "const tracks: Track[] = [\n  { id: 1 },\n]\n";
        assert_matches!(
            Catalog::from_source(page, MARKER),
            Err(CatalogError::MalformedHostFile(_))
        );
    }

    #[test]
    fn record_missing_fields_is_invalid() {
        let page = "const tracks: Track[] = [\n  { id: 1, title: \"A\" },\n];\n";
        assert_matches!(
            Catalog::from_source(page, MARKER),
            Err(CatalogError::InvalidRecord(_))
        );
    }

    #[test]
    fn missing_marker_is_malformed() {
        assert_matches!(
            Catalog::from_source("const songs = [];", MARKER),
            Err(CatalogError::MalformedHostFile(_))
        );
    }
}
