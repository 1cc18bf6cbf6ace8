mod filter;

pub use filter::FilterSelection;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::parse::{coerce, Record};

/// One deal row from the commercial sheet. String fields are always present
/// (missing is the empty string) and numeric fields always finite, so
/// aggregation never branches on absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deal {
    pub client: String,
    pub segment: String,
    pub owner: String,
    /// Month label as the sheet shows it ("Jan".."Dec"); derived from the
    /// close date when the column is blank.
    pub month: String,
    /// Raw close date string; parse on demand via [`Deal::close_day`].
    pub close_date: String,
    pub value: f64,
    /// Win confidence on a 0-100 scale.
    pub confidence: f64,
    pub committed: bool,
}

impl Deal {
    pub fn from_record(record: &Record) -> Self {
        let close_date = record.value("close date").to_string();
        let mut month = record.value("month").trim().to_string();
        if month.is_empty() {
            month = coerce::parse_close_date(&close_date)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_default();
        }
        Deal {
            client: record.value("client").to_string(),
            segment: record.value("segment").to_string(),
            owner: record.value("owner").to_string(),
            month,
            close_date,
            value: coerce::parse_number(record.value("value")),
            confidence: coerce::parse_percent(record.value("confidence")),
            committed: coerce::parse_flag(record.value("committed")),
        }
    }

    /// The close date as a calendar date, when one was supplied and parses.
    pub fn close_day(&self) -> Option<NaiveDate> {
        coerce::parse_close_date(&self.close_date)
    }
}

/// One month of the revenue forecast overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastPoint {
    pub month: String,
    pub projected: f64,
    pub actual: f64,
}

impl ForecastPoint {
    pub fn from_record(record: &Record) -> Self {
        ForecastPoint {
            month: record.value("month").to_string(),
            projected: coerce::parse_number(record.value("projected")),
            actual: coerce::parse_number(record.value("actual")),
        }
    }
}

/// One funnel stage of the pipeline summary table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineStage {
    pub stage: String,
    pub count: u32,
    pub value: f64,
}

impl PipelineStage {
    pub fn from_record(record: &Record) -> Self {
        PipelineStage {
            stage: record.value("stage").to_string(),
            count: coerce::parse_number(record.value("count")).max(0.0).round() as u32,
            value: coerce::parse_number(record.value("value")),
        }
    }
}

/// One headline KPI row maintained on its own tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiEntry {
    pub label: String,
    pub value: f64,
    pub target: f64,
    pub higher_is_better: bool,
}

impl KpiEntry {
    pub fn from_record(record: &Record) -> Self {
        let direction = record.value("higher is better");
        KpiEntry {
            label: record.value("label").to_string(),
            value: coerce::parse_number(record.value("value")),
            target: coerce::parse_number(record.value("target")),
            // A sheet without a direction column means up is good.
            higher_is_better: direction.trim().is_empty() || coerce::parse_flag(direction),
        }
    }
}

/// Everything one load produced. Assembled in full or not at all; replaced
/// wholesale on reload, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSet {
    pub deals: Vec<Deal>,
    pub forecast: Vec<ForecastPoint>,
    pub pipeline: Vec<PipelineStage>,
    pub kpis: Vec<KpiEntry>,
}
