use std::sync::LazyLock;

use regex::Regex;

pub const MIN_DESCRIPTION_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 400;
pub const ELLIPSIS: &str = "...";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[#@]\w+").unwrap());

/// Short or empty descriptions are replaced by `template` with `{title}`
/// filled in. Longer ones are cleaned up; once they reach
/// [`MAX_DESCRIPTION_CHARS`] they are cut back to a word boundary and marked
/// with [`ELLIPSIS`], staying within the limit.
pub fn normalize_description(raw: &str, title: &str, template: &str) -> String {
    if raw.chars().count() < MIN_DESCRIPTION_CHARS {
        return canned_description(title, template);
    }

    let collapsed = WHITESPACE.replace_all(raw, " ");
    let stripped = TAGS.replace_all(&collapsed, "");
    let cleaned = WHITESPACE.replace_all(&stripped, " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return canned_description(title, template);
    }
    if cleaned.chars().count() < MAX_DESCRIPTION_CHARS {
        return cleaned.to_string();
    }

    let budget = MAX_DESCRIPTION_CHARS - ELLIPSIS.len();
    let head = take_chars(cleaned, budget);
    let cut = match head.rfind(' ') {
        Some(pos) if !head[..pos].trim_end().is_empty() => head[..pos].trim_end(),
        // a single unbroken token longer than the budget
        _ => head,
    };
    format!("{cut}{ELLIPSIS}")
}

pub fn canned_description(title: &str, template: &str) -> String {
    template.replace("{title}", title)
}

/// `YYYYMMDD` becomes `"<day> <Month> <year>"`; anything else yields
/// `fallback`.
pub fn format_release_date(upload_date: Option<&str>, fallback: &str) -> String {
    let Some(value) = upload_date else {
        return fallback.to_string();
    };
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return fallback.to_string();
    }

    let year = &value[0..4];
    let month = &value[4..6];
    let day = value[6..8].parse::<u32>().unwrap_or_default();
    let month_name = month
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| MONTHS.get(index).copied())
        .unwrap_or(month);
    format!("{day} {month_name} {year}")
}

fn take_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "{title} - An official release.";

    #[test]
    fn short_description_uses_template() {
        assert_eq!(
            normalize_description("", "Boomday", TEMPLATE),
            "Boomday - An official release."
        );
        let almost = "x".repeat(MIN_DESCRIPTION_CHARS - 1);
        assert_eq!(
            normalize_description(&almost, "Boomday", TEMPLATE),
            "Boomday - An official release."
        );
    }

    #[test]
    fn long_description_is_cleaned() {
        let raw = format!(
            "First line\n\nsecond   line #freestyle @adi55 tail {}",
            "word ".repeat(20)
        );
        let out = normalize_description(&raw, "t", TEMPLATE);
        assert!(out.starts_with("First line second line tail word"));
        assert!(!out.contains('#'));
        assert!(!out.contains('@'));
        assert!(!out.contains("  "));
        assert!(!out.ends_with(ELLIPSIS));
    }

    #[test]
    fn overlong_description_snaps_to_word_boundary() {
        let raw = "lyric ".repeat(120);
        let out = normalize_description(&raw, "t", TEMPLATE);
        assert!(out.chars().count() <= MAX_DESCRIPTION_CHARS);
        assert!(out.ends_with("lyric..."));
        let body = out.trim_end_matches(ELLIPSIS);
        assert!(body.split(' ').all(|word| word == "lyric"));
    }

    #[test]
    fn description_at_the_limit_is_shortened() {
        let raw = format!("{}word", "lyric ".repeat(66));
        assert_eq!(raw.chars().count(), MAX_DESCRIPTION_CHARS);
        let out = normalize_description(&raw, "t", TEMPLATE);
        assert!(out.chars().count() <= MAX_DESCRIPTION_CHARS);
        assert!(out.ends_with("lyric..."));
        assert!(!out.contains("word"));

        let under = format!("{}wor", "lyric ".repeat(66));
        assert_eq!(normalize_description(&under, "t", TEMPLATE), under);
    }

    #[test]
    fn multibyte_text_is_truncated_on_char_boundaries() {
        let raw = "ñandú ".repeat(100);
        let out = normalize_description(&raw, "t", TEMPLATE);
        assert!(out.chars().count() <= MAX_DESCRIPTION_CHARS);
        assert!(out.ends_with("ñandú..."));
    }

    #[test]
    fn release_date_formats() {
        assert_eq!(
            format_release_date(Some("20251225"), "YouTube Release"),
            "25 December 2025"
        );
        assert_eq!(
            format_release_date(Some("20250307"), "YouTube Release"),
            "7 March 2025"
        );
        assert_eq!(format_release_date(Some(""), "YouTube Release"), "YouTube Release");
        assert_eq!(format_release_date(Some("2025"), "YouTube Release"), "YouTube Release");
        assert_eq!(format_release_date(None, "YouTube Release"), "YouTube Release");
        assert_eq!(
            format_release_date(Some("2025-1-1"), "YouTube Release"),
            "YouTube Release"
        );
    }

    #[test]
    fn out_of_range_month_keeps_digits() {
        assert_eq!(format_release_date(Some("20251301"), "x"), "1 13 2025");
    }
}
