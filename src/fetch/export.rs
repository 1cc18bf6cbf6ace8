use std::path::Path;

use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};

use super::{tables, ExportConfig, LoadError};
use crate::model::{Deal, ForecastPoint, KpiEntry, PipelineStage, TableSet};
use crate::parse::{normalize_header, Record};

/// Positional layouts of the spreadsheet-to-JSON export. The export's own
/// keys are placeholder junk ("Column3", "__EMPTY_2"), so only each value's
/// position carries meaning.
const DEAL_COLUMNS: &[&str] = &[
    "client",
    "segment",
    "owner",
    "month",
    "close date",
    "value",
    "confidence",
    "committed",
];
const FORECAST_COLUMNS: &[&str] = &["month", "projected", "actual"];
const PIPELINE_COLUMNS: &[&str] = &["stage", "count", "value"];
const KPI_COLUMNS: &[&str] = &["label", "value", "target", "higher is better"];

/// Load every table from static JSON export files.
pub async fn load_all(cfg: &ExportConfig) -> Result<TableSet, LoadError> {
    let deals_path = cfg.deals_path.as_deref().ok_or(LoadError::MissingSource {
        table: tables::DEALS,
    })?;

    let (deals, forecast, pipeline, kpis) = tokio::join!(
        load_records(deals_path, DEAL_COLUMNS, tables::DEALS),
        load_optional(cfg.forecast_path.as_deref(), FORECAST_COLUMNS, tables::FORECAST),
        load_optional(cfg.pipeline_path.as_deref(), PIPELINE_COLUMNS, tables::PIPELINE),
        load_optional(cfg.kpis_path.as_deref(), KPI_COLUMNS, tables::KPIS),
    );

    let deals: Vec<Deal> = deals?.iter().map(Deal::from_record).collect();
    if deals.is_empty() {
        return Err(LoadError::Empty {
            table: tables::DEALS,
        });
    }

    Ok(TableSet {
        deals,
        forecast: forecast.iter().map(ForecastPoint::from_record).collect(),
        pipeline: pipeline.iter().map(PipelineStage::from_record).collect(),
        kpis: kpis.iter().map(KpiEntry::from_record).collect(),
    })
}

/// Read one export file and remap each row object's values, by position,
/// onto the table's logical columns.
async fn load_records(
    path: &Path,
    columns: &[&str],
    table: &'static str,
) -> Result<Vec<Record>, LoadError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Export { table, source })?;
    let rows: Vec<Map<String, Value>> =
        serde_json::from_str(&text).map_err(|source| LoadError::Decode { table, source })?;

    let headers: Vec<String> = columns.iter().map(|c| normalize_header(c)).collect();
    let records = rows
        .iter()
        .map(|row| {
            let mut values: Vec<String> = row.values().map(value_to_string).collect();
            if values.len() > headers.len() {
                values.truncate(headers.len());
            } else {
                values.resize(headers.len(), String::new());
            }
            Record::from_row(&headers, values)
        })
        .collect::<Vec<_>>();

    debug!(table, rows = records.len(), "loaded export file");
    Ok(records)
}

async fn load_optional(
    path: Option<&Path>,
    columns: &[&str],
    table: &'static str,
) -> Vec<Record> {
    let Some(path) = path else {
        return Vec::new();
    };
    match load_records(path, columns, table).await {
        Ok(records) => records,
        Err(err) => {
            warn!(table, %err, "optional export unavailable; treating as empty");
            Vec::new()
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
