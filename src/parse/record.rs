use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::rows;

/// Alias table for logical field names, keyed and stored in normalized form.
/// Upstream sheets are hand-maintained, so every new naming quirk should
/// land here as a data change rather than new lookup code.
static ALIASES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("client", &["account", "accountname", "customer", "company"]);
    m.insert("segment", &["vertical", "category", "tier", "marketsegment"]);
    m.insert(
        "owner",
        &["dealowner", "rep", "salesperson", "accountexecutive", "ae"],
    );
    m.insert("month", &["period", "closemonth", "monthlabel"]);
    m.insert("closedate", &["expectedclose", "closingdate", "signeddate", "date"]);
    m.insert("value", &["acv", "amount", "volume", "arr", "total", "dealvalue"]);
    m.insert("confidence", &["probability", "likelihood", "winprobability"]);
    m.insert("committed", &["commit", "incommit", "iscommitted"]);
    m.insert("projected", &["forecast", "forecasted", "plan"]);
    m.insert("actual", &["actuals", "achieved", "booked"]);
    m.insert("stage", &["pipelinestage", "status"]);
    m.insert("count", &["deals", "dealcount", "opportunities"]);
    m.insert("label", &["kpi", "metric", "name"]);
    m.insert("target", &["goal", "budget", "quota"]);
    m.insert("higherisbetter", &["goodifup", "direction"]);
    m
});

/// Last-resort key patterns for fields whose header spelling is the most
/// inconsistent in practice. Matched against normalized record keys.
static RELAXED: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("owner", Regex::new("owner").expect("owner pattern"));
    m.insert(
        "closedate",
        Regex::new("close.*date|date.*close").expect("close date pattern"),
    );
    m
});

/// Canonicalize a column name for lookup: lowercase, strip one wrapping
/// quote pair and any byte-order marks, and remove whitespace and
/// underscores, so "Deal Owner", "deal_owner" and "DEALOWNER" collide.
/// Falls back to the raw trimmed string when nothing survives.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    let key: String = unquoted
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '\u{feff}')
        .flat_map(char::to_lowercase)
        .collect();
    if key.is_empty() {
        trimmed.to_string()
    } else {
        key
    }
}

/// One input row, keyed by normalized header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// Zip normalized header keys with row values. The first occurrence of
    /// a duplicated header wins; later duplicates are ignored.
    pub fn from_row(headers: &[String], values: Vec<String>) -> Self {
        let mut fields = HashMap::with_capacity(headers.len());
        for (key, value) in headers.iter().zip(values) {
            fields.entry(key.clone()).or_insert(value);
        }
        Record { fields }
    }

    /// Look up a logical field, trying in order: the normalized form of the
    /// requested name, the literal requested name, the alias table, and a
    /// relaxed pattern scan over all keys for known-ambiguous fields. Never
    /// fails; a field that cannot be found is the empty string.
    pub fn value(&self, logical: &str) -> &str {
        let key = normalize_header(logical);
        if let Some(v) = self.fields.get(&key) {
            return v;
        }
        if let Some(v) = self.fields.get(logical) {
            return v;
        }
        if let Some(aliases) = ALIASES.get(key.as_str()) {
            for alias in *aliases {
                if let Some(v) = self.fields.get(*alias) {
                    return v;
                }
            }
        }
        if let Some(pattern) = RELAXED.get(key.as_str()) {
            for (k, v) in &self.fields {
                if pattern.is_match(k) {
                    return v;
                }
            }
        }
        ""
    }
}

/// Parse a CSV blob into records keyed by normalized header.
pub fn parse_table(text: &str) -> Vec<Record> {
    let table = rows::parse_rows(text);
    table
        .rows
        .into_iter()
        .map(|row| Record::from_row(&table.headers, row))
        .collect()
}
