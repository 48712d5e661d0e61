use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};


static SLUG_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SLUG_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_-]+").unwrap());
static DURATION_SHAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}$").unwrap());

/// One playable release as it appears in the catalog array.
///
/// Field order matches the order records are rendered in, so serializing a
/// record to JSON reads the same way the host source file does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub file: String,
    #[serde(default)]
    pub cover_art: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub featuring: Vec<String>,
    #[serde(default)]
    pub instrumental: String,
}

impl TrackRecord {
    pub fn has_well_formed_duration(&self) -> bool {
        DURATION_SHAPE.is_match(&self.duration)
    }
}

/// Entry of the metadata side input produced by the ingestion stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub duration: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
}

impl TrackMetadata {
    /// The slug from the side input, or one derived from the title.
    pub fn slug(&self) -> Slug {
        match self.slug.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Slug(value.to_string()),
            _ => Slug::from_title(&self.title),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationField {
    Display(String),
    Seconds(f64),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DurationField>::deserialize(deserializer)?;
    Ok(match value {
        Some(DurationField::Display(text)) => text,
        Some(DurationField::Seconds(seconds)) => format_seconds(seconds),
        None => String::new(),
    })
}

/// Renders a second count as `M:SS`.
pub fn format_seconds(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Map from canonical local asset path to its public URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlMap(BTreeMap<String, String>);

impl UrlMap {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0
            .get(path)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for UrlMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// URL-safe identifier naming a track's asset directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    pub fn from_title(title: &str) -> Self {
        let lowered = title.to_lowercase();
        let stripped = SLUG_STRIP.replace_all(&lowered, "");
        let joined = SLUG_SEPARATORS.replace_all(&stripped, "-");
        Self(joined.trim_matches('-').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
