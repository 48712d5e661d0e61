use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::{TrackRecord, UrlMap};
use crate::error::CatalogError;
use crate::render::quote;

static ID_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"id:\s*(\d+)").unwrap());
static LAST_RECORD_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\},\s*\n\];").unwrap());

/// One past the largest `id: <int>` assignment anywhere in `source`, or 1
/// when there is none.
pub fn compute_next_id(source: &str) -> Result<u64, CatalogError> {
    let mut max = 0u64;
    for captures in ID_ASSIGNMENT.captures_iter(source) {
        let digits = &captures[1];
        let id = digits.parse::<u64>().map_err(|_| {
            CatalogError::MalformedHostFile(format!("id {digits} does not fit in 64 bits"))
        })?;
        max = max.max(id);
    }
    max.checked_add(1)
        .ok_or_else(|| CatalogError::MalformedHostFile("no ids left after u64::MAX".to_string()))
}

/// Inserts `literals` after the last record of the array declared by
/// `marker`. The last record must close with `},` directly before the
/// array's `];`, otherwise the file is rejected rather than guessed at.
pub fn splice_into_source(
    source: &str,
    marker: &str,
    literals: &[String],
) -> Result<String, CatalogError> {
    let start = source.find(marker).ok_or_else(|| {
        CatalogError::MalformedHostFile(format!("array declaration `{marker}` not found"))
    })?;
    let found = LAST_RECORD_END.find(&source[start..]).ok_or_else(|| {
        CatalogError::MalformedHostFile(
            "end of the record array (`},` followed by `];`) not found".to_string(),
        )
    })?;
    if literals.is_empty() {
        return Ok(source.to_string());
    }

    let insert_at = start + found.start() + 2;
    let (before, after) = source.split_at(insert_at);
    let mut out = String::with_capacity(source.len() + literals.iter().map(String::len).sum::<usize>() + 8);
    out.push_str(before);
    out.push('\n');
    out.push_str(&literals.join(",\n"));
    out.push(',');
    out.push_str(after);
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct RelinkResult {
    pub content: String,
    pub replaced: Vec<String>,
}

/// Replaces every string literal that is exactly a local asset path with its
/// public URL. Backslash separators in map keys are normalized to `/` first.
/// Public URLs usually end in the local path, so only whole quoted literals
/// match and a second run leaves relinked entries alone.
pub fn relink_source(source: &str, urls: &UrlMap) -> RelinkResult {
    let mut content = source.to_string();
    let mut replaced = Vec::new();
    for (local, url) in urls.iter() {
        let path = local.replace('\\', "/");
        if path.is_empty() {
            continue;
        }
        let search = quote(&path);
        if !content.contains(&search) {
            continue;
        }
        content = content.replace(&search, &quote(url));
        replaced.push(path);
    }
    RelinkResult { content, replaced }
}

/// Parses a JSON catalog document: a plain array of records.
pub fn parse_json_catalog(content: &str) -> Result<Vec<TrackRecord>, CatalogError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(content)
        .map_err(|err| CatalogError::MalformedHostFile(format!("JSON catalog: {err}")))
}

pub fn next_id_in(records: &[TrackRecord]) -> Result<u64, CatalogError> {
    records
        .iter()
        .map(|record| record.id)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| CatalogError::MalformedHostFile("no ids left after u64::MAX".to_string()))
}

pub fn append_json(content: &str, new_records: &[TrackRecord]) -> Result<String, CatalogError> {
    let mut records = parse_json_catalog(content)?;
    records.extend_from_slice(new_records);
    render_json_catalog(&records)
}

pub fn render_json_catalog(records: &[TrackRecord]) -> Result<String, CatalogError> {
    let mut out = serde_json::to_string_pretty(records)
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    out.push('\n');
    Ok(out)
}
