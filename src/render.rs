
use serde_json::Value;

use crate::domain::TrackRecord;

const RECORD_INDENT: &str = "  ";
const FIELD_INDENT: &str = "    ";

/// Renders one record as an object literal for the host source file.
///
/// Every string is JSON-encoded so quotes, backslashes and line breaks in
/// titles or descriptions cannot terminate the literal early.
pub fn render_record_literal(record: &TrackRecord) -> String {
    let featuring = record
        .featuring
        .iter()
        .map(|name| quote(name))
        .collect::<Vec<_>>()
        .join(", ");

    let fields: [(&str, String); 11] = [
        ("id", record.id.to_string()),
        ("title", quote(&record.title)),
        ("artist", quote(&record.artist)),
        ("album", quote(&record.album)),
        ("duration", quote(&record.duration)),
        ("file", quote(&record.file)),
        ("coverArt", quote(&record.cover_art)),
        ("description", quote(&record.description)),
        ("releaseDate", quote(&record.release_date)),
        ("featuring", format!("[{featuring}]")),
        ("instrumental", quote(&record.instrumental)),
    ];

    let mut out = String::new();
    out.push_str(RECORD_INDENT);
    out.push_str("{\n");
    for (key, value) in fields {
        out.push_str(&format!("{FIELD_INDENT}{key}: {value},\n"));
    }
    out.push_str(RECORD_INDENT);
    out.push('}');
    out
}

pub fn quote(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}
