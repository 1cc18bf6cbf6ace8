use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::record::normalize_header;

/// Tokens that fill divider rows in hand-maintained sheets.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(-+|–|—|n/?a|tbd|\.{3})$").expect("placeholder pattern"));

/// A parsed blob of delimited text: normalized header keys plus data rows
/// padded or truncated to the header width.
#[derive(Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Split one line of comma-delimited text into field values.
///
/// A field may be wrapped in double quotes; inside quotes a doubled quote is
/// one literal quote and commas lose their separating meaning. Final values
/// are whitespace-trimmed with the wrapping quotes removed. A trailing comma
/// yields a trailing empty field, so row width stays consistent with the
/// header row.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }
    fields.push(current);

    fields.iter().map(|f| f.trim().to_string()).collect()
}

/// Render field values back to one delimited line, quoting and escaping so
/// that `split_record` recovers the values exactly.
pub fn format_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let field = field.as_ref();
        let needs_quotes = field.contains(',')
            || field.contains('"')
            || field.starts_with(char::is_whitespace)
            || field.ends_with(char::is_whitespace);
        if needs_quotes {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out
}

/// Parse a full text blob into headers and data rows.
///
/// Strips a leading byte-order marker, splits on CR/LF boundaries, drops
/// blank lines, and treats the first remaining line as headers. Returns an
/// empty table when fewer than two non-blank lines remain. Data rows are
/// padded with empty strings or truncated to the header width; rows that
/// echo the header line or contain only placeholder tokens are dropped.
pub fn parse_rows(text: &str) -> RawTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text
        .split(['\r', '\n'])
        .filter(|l| !l.trim().is_empty())
        .collect();
    if lines.len() < 2 {
        return RawTable::default();
    }

    let headers: Vec<String> = split_record(lines[0])
        .iter()
        .map(|h| normalize_header(h))
        .collect();
    let width = headers.len();

    let mut rows = Vec::with_capacity(lines.len() - 1);
    for line in &lines[1..] {
        let mut fields = split_record(line);
        if fields.len() > width {
            fields.truncate(width);
        } else {
            fields.resize(width, String::new());
        }
        if is_header_echo(&fields, &headers) || is_filler_row(&fields) {
            debug!(row = %line, "dropping stray non-data row");
            continue;
        }
        rows.push(fields);
    }

    RawTable { headers, rows }
}

/// A stray sub-header accidentally included in the data: more than half of
/// the header count of its values equal their own column's header text.
fn is_header_echo(fields: &[String], headers: &[String]) -> bool {
    let hits = fields
        .iter()
        .zip(headers)
        .filter(|(value, header)| !value.is_empty() && &normalize_header(value) == *header)
        .count();
    hits * 2 > headers.len()
}

/// A divider row: every non-empty value is a placeholder token, or the row
/// is entirely empty after padding.
fn is_filler_row(fields: &[String]) -> bool {
    fields
        .iter()
        .filter(|f| !f.is_empty())
        .all(|f| PLACEHOLDER.is_match(f))
}
