use chrono::Utc;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::{tables, ApiConfig, LoadError};
use crate::model::{Deal, ForecastPoint, KpiEntry, PipelineStage, TableSet};

/// Load every table from the REST source. The API returns pre-typed JSON
/// matching the entity shapes directly, bypassing the CSV pipeline.
pub async fn load_all(client: &Client, cfg: &ApiConfig) -> Result<TableSet, LoadError> {
    let (deals, forecast, pipeline, kpis) = tokio::join!(
        fetch_entities::<Deal>(client, &cfg.base_url, tables::DEALS),
        fetch_entities::<ForecastPoint>(client, &cfg.base_url, tables::FORECAST),
        fetch_entities::<PipelineStage>(client, &cfg.base_url, tables::PIPELINE),
        fetch_entities::<KpiEntry>(client, &cfg.base_url, tables::KPIS),
    );

    let deals = deals?;
    if deals.is_empty() {
        return Err(LoadError::Empty {
            table: tables::DEALS,
        });
    }

    Ok(TableSet {
        deals,
        forecast: swallow(forecast, tables::FORECAST),
        pipeline: swallow(pipeline, tables::PIPELINE),
        kpis: swallow(kpis, tables::KPIS),
    })
}

async fn fetch_entities<T: DeserializeOwned>(
    client: &Client,
    base_url: &str,
    table: &'static str,
) -> Result<Vec<T>, LoadError> {
    let url = table_url(base_url, table).map_err(|source| LoadError::Url { table, source })?;

    let entities = client
        .get(url)
        .header(header::CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(|source| LoadError::Fetch { table, source })?
        .error_for_status()
        .map_err(|source| LoadError::Fetch { table, source })?
        .json::<Vec<T>>()
        .await
        .map_err(|source| LoadError::Fetch { table, source })?;

    debug!(table, rows = entities.len(), "fetched api table");
    Ok(entities)
}

fn table_url(base_url: &str, table: &str) -> Result<Url, url::ParseError> {
    // Joining against a path without a trailing slash would replace its
    // last segment.
    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    let mut url = Url::parse(&base)?.join(table)?;
    url.query_pairs_mut()
        .append_pair("nocache", &Utc::now().timestamp_millis().to_string());
    Ok(url)
}

fn swallow<T>(result: Result<Vec<T>, LoadError>, table: &'static str) -> Vec<T> {
    match result {
        Ok(entities) => entities,
        Err(err) => {
            warn!(table, %err, "optional table fetch failed; treating as empty");
            Vec::new()
        }
    }
}
