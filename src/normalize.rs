use jiff::{Timestamp, civil::Date, civil::DateTime, tz::TimeZone};

/// Canonical separator for multi-valued text columns.
pub const SEPARATOR: char = ';';

const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%B %d, %Y", "%d %B %Y"];

/// Splits a delimited column into its values.
///
/// Rows written by this service always use `;`. Older rows may use `,`, so a
/// value without any `;` is split on commas instead.
pub fn split_delimited(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let sep = if raw.contains(SEPARATOR) { SEPARATOR } else { ',' };
    raw.split(sep).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Joins values with the canonical separator; an empty list is stored as NULL.
///
/// A lone value containing a comma gets a trailing `;` so that
/// [`split_delimited`] does not take it for a comma-separated row.
pub fn join_delimited<S: AsRef<str>>(values: &[S]) -> Option<String> {
    let parts: Vec<&str> =
        values.iter().map(|v| v.as_ref().trim()).filter(|v| !v.is_empty()).collect();
    match parts.as_slice() {
        [] => None,
        [only] if only.contains(',') => Some(format!("{only}{SEPARATOR}")),
        _ => Some(parts.join(&SEPARATOR.to_string())),
    }
}

/// Splits request text on the canonical separator only.
pub fn split_request_list(raw: &str) -> Vec<String> {
    raw.split(SEPARATOR).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Trims text input; blank text is treated as absent.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Normalizes a release date to `YYYY-MM-DD` when it can be parsed.
///
/// Unparseable text is kept as-is so that nothing the caller supplied is lost.
pub fn normalize_release_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = raw.parse::<Date>() {
        return Some(date.to_string());
    }
    if let Ok(datetime) = raw.parse::<DateTime>() {
        return Some(datetime.date().to_string());
    }
    if let Ok(timestamp) = raw.parse::<Timestamp>() {
        return Some(timestamp.to_zoned(TimeZone::UTC).date().to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = Date::strptime(format, raw) {
            return Some(date.to_string());
        }
    }
    Some(raw.to_string())
}

/// The year of a release date, if its first four characters are a four-digit year.
pub fn extract_year(release_date: &str) -> Option<i32> {
    let head = release_date.get(..4)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok().filter(|year| *year > 0)
}
