pub mod api;
pub mod export;
pub mod sheet;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Deal, ForecastPoint, KpiEntry, PipelineStage, TableSet};
use crate::parse::{parse_table, Record};

/// Logical table names used in configuration and error messages.
pub mod tables {
    pub const DEALS: &str = "deals";
    pub const FORECAST: &str = "forecast";
    pub const PIPELINE: &str = "pipeline";
    pub const KPIS: &str = "kpis";
}

/// Where one dashboard load gets its tables. Exactly one source kind is
/// active; an optional table is skipped by leaving its id or path unset.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Sheet(SheetConfig),
    Api(ApiConfig),
    Export(ExportConfig),
}

/// A published spreadsheet: one base URL plus a tab id per table.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub base_url: String,
    pub deals_tab: Option<String>,
    pub forecast_tab: Option<String>,
    pub pipeline_tab: Option<String>,
    pub kpis_tab: Option<String>,
}

/// A small REST API serving pre-typed JSON entity arrays.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

/// Static JSON exports on disk, one file per table.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub deals_path: Option<PathBuf>,
    pub forecast_path: Option<PathBuf>,
    pub pipeline_path: Option<PathBuf>,
    pub kpis_path: Option<PathBuf>,
}

/// A required table could not be loaded. Optional tables never produce
/// these; they degrade to empty sequences.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("required table `{table}` has no configured source")]
    MissingSource { table: &'static str },
    #[error("building request for table `{table}`: {source}")]
    Url {
        table: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("fetching required table `{table}`: {source}")]
    Fetch {
        table: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("reading export for required table `{table}`: {source}")]
    Export {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding required table `{table}`: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("required table `{table}` contained no usable rows")]
    Empty { table: &'static str },
}

/// Load lifecycle as the presentation layer sees it.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded(Arc<TableSet>),
    Errored(String),
}

/// Owns the fetch/parse lifecycle. The only mutable state is the current
/// [`LoadState`] plus a monotonic generation counter that discards
/// superseded in-flight loads, so the last requested load always wins.
pub struct Loader {
    client: Client,
    config: SourceConfig,
    generation: AtomicU64,
    state: Mutex<LoadState>,
}

impl Loader {
    pub fn new(client: Client, config: SourceConfig) -> Self {
        Loader {
            client,
            config,
            generation: AtomicU64::new(0),
            state: Mutex::new(LoadState::Idle),
        }
    }

    /// Snapshot of the current lifecycle state.
    pub fn state(&self) -> LoadState {
        self.state.lock().unwrap().clone()
    }

    /// The most recently committed table set, if any load has succeeded.
    pub fn current(&self) -> Option<Arc<TableSet>> {
        match &*self.state.lock().unwrap() {
            LoadState::Loaded(tables) => Some(tables.clone()),
            _ => None,
        }
    }

    /// Fetch every configured table and replace the current result
    /// wholesale.
    ///
    /// Returns `Ok(None)` when a newer reload started while this one was in
    /// flight: the stale result (or error) is discarded and the newer load
    /// decides the final state.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&self) -> Result<Option<Arc<TableSet>>, LoadError> {
        let token = self.begin();
        match load_tables(&self.client, &self.config).await {
            Ok(tables) => {
                let committed = self.commit(token, tables);
                if committed.is_none() {
                    debug!(token, "discarding superseded load");
                }
                Ok(committed)
            }
            Err(err) if self.is_newest(token) => {
                *self.state.lock().unwrap() = LoadState::Errored(err.to_string());
                Err(err)
            }
            Err(err) => {
                debug!(token, %err, "discarding error from superseded load");
                Ok(None)
            }
        }
    }

    fn begin(&self) -> u64 {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.lock().unwrap() = LoadState::Loading;
        token
    }

    fn is_newest(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    fn commit(&self, token: u64, tables: TableSet) -> Option<Arc<TableSet>> {
        let mut state = self.state.lock().unwrap();
        if self.generation.load(Ordering::SeqCst) != token {
            return None;
        }
        let shared = Arc::new(tables);
        *state = LoadState::Loaded(shared.clone());
        Some(shared)
    }
}

/// Load a full table set from the configured source. Pure with respect to
/// loader state; [`Loader::reload`] layers last-load-wins on top.
pub async fn load_tables(client: &Client, config: &SourceConfig) -> Result<TableSet, LoadError> {
    match config {
        SourceConfig::Sheet(cfg) => load_from_sheet(client, cfg).await,
        SourceConfig::Api(cfg) => api::load_all(client, cfg).await,
        SourceConfig::Export(cfg) => export::load_all(cfg).await,
    }
}

async fn load_from_sheet(client: &Client, cfg: &SheetConfig) -> Result<TableSet, LoadError> {
    let deals_tab = cfg.deals_tab.as_deref().ok_or(LoadError::MissingSource {
        table: tables::DEALS,
    })?;

    // Sibling fetches are independent; fan out and join before assembling.
    let (deals_text, forecast_text, pipeline_text, kpis_text) = tokio::join!(
        sheet::fetch_tab(client, &cfg.base_url, deals_tab, tables::DEALS),
        fetch_optional(client, &cfg.base_url, cfg.forecast_tab.as_deref(), tables::FORECAST),
        fetch_optional(client, &cfg.base_url, cfg.pipeline_tab.as_deref(), tables::PIPELINE),
        fetch_optional(client, &cfg.base_url, cfg.kpis_tab.as_deref(), tables::KPIS),
    );

    assemble(&deals_text?, forecast_text, pipeline_text, kpis_text)
}

async fn fetch_optional(
    client: &Client,
    base_url: &str,
    tab: Option<&str>,
    table: &'static str,
) -> Option<String> {
    let tab = tab?;
    match sheet::fetch_tab(client, base_url, tab, table).await {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(table, %err, "optional table fetch failed; treating as empty");
            None
        }
    }
}

/// Turn fetched tab texts into a typed table set. The deals table must
/// yield at least one row; optional tables degrade to empty sequences.
fn assemble(
    deals_text: &str,
    forecast_text: Option<String>,
    pipeline_text: Option<String>,
    kpis_text: Option<String>,
) -> Result<TableSet, LoadError> {
    let deals = entities_from_text(deals_text, Deal::from_record);
    if deals.is_empty() {
        return Err(LoadError::Empty {
            table: tables::DEALS,
        });
    }
    let tables = TableSet {
        deals,
        forecast: optional_entities(forecast_text, ForecastPoint::from_record),
        pipeline: optional_entities(pipeline_text, PipelineStage::from_record),
        kpis: optional_entities(kpis_text, KpiEntry::from_record),
    };
    info!(
        deals = tables.deals.len(),
        forecast = tables.forecast.len(),
        pipeline = tables.pipeline.len(),
        kpis = tables.kpis.len(),
        "assembled table set"
    );
    Ok(tables)
}

pub(crate) fn entities_from_text<T>(text: &str, build: fn(&Record) -> T) -> Vec<T> {
    parse_table(text).iter().map(build).collect()
}

fn optional_entities<T>(text: Option<String>, build: fn(&Record) -> T) -> Vec<T> {
    text.map(|t| entities_from_text(&t, build)).unwrap_or_default()
}
