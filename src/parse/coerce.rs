use chrono::NaiveDate;

/// Close dates arrive in whatever format the sheet's locale produced.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Parse a number out of hand-entered text: currency symbols, thousands
/// separators and percent signs are stripped (digits, decimal point and a
/// leading minus survive), and one trailing compact suffix is honored
/// ("55k" is 55 000, "1.2m" is 1 200 000). Anything unparseable is 0.0,
/// never an error and never NaN.
pub fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let (body, multiplier) = match trimmed.chars().last() {
        Some('k') | Some('K') => (&trimmed[..trimmed.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&trimmed[..trimmed.len() - 1], 1_000_000.0),
        _ => (trimmed, 1.0),
    };

    let mut cleaned = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' | '.' => cleaned.push(c),
            '-' if cleaned.is_empty() => cleaned.push('-'),
            _ => {}
        }
    }

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v * multiplier,
        _ => 0.0,
    }
}

/// Case-insensitive truthy check against the spellings that show up in
/// checkbox-style sheet columns.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "x"
    )
}

/// Confidence values appear as "85%", "85" or "0.85". A trailing percent
/// sign is stripped; a result of at most 1 is a fraction and scales to
/// 0-100, anything larger is already on that scale.
pub fn parse_percent(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let body = trimmed.strip_suffix('%').unwrap_or(trimmed);
    let value = parse_number(body);
    if value <= 1.0 {
        value * 100.0
    } else {
        value
    }
}

/// Parse a close date, tolerating the common sheet formats and a trailing
/// time component. Empty or unparseable input is `None`, not an error.
pub fn parse_close_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    // Some exports append a timestamp; retry on the date-sized prefix.
    if let Some(prefix) = trimmed.get(..10) {
        for fmt in DATE_FORMATS {
            if let Ok(parsed) = NaiveDate::parse_from_str(prefix, fmt) {
                return Some(parsed);
            }
        }
    }
    None
}
