use chrono::Utc;
use reqwest::{header, Client};
use tracing::debug;
use url::Url;

use super::LoadError;

/// Fetch one published-sheet tab as CSV text.
///
/// The underlying sheet changes between loads, so every request carries a
/// fresh `nocache` query parameter and a `Cache-Control: no-cache` header
/// to defeat intermediate caches; a stale tab would be a correctness bug,
/// not a performance one.
pub async fn fetch_tab(
    client: &Client,
    base_url: &str,
    tab: &str,
    table: &'static str,
) -> Result<String, LoadError> {
    let url = tab_url(base_url, tab).map_err(|source| LoadError::Url { table, source })?;

    let response = client
        .get(url)
        .header(header::CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(|source| LoadError::Fetch { table, source })?
        .error_for_status()
        .map_err(|source| LoadError::Fetch { table, source })?;

    let text = response
        .text()
        .await
        .map_err(|source| LoadError::Fetch { table, source })?;

    debug!(table, bytes = text.len(), "fetched sheet tab");
    Ok(text)
}

fn tab_url(base_url: &str, tab: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut()
        .append_pair("gid", tab)
        .append_pair("single", "true")
        .append_pair("output", "csv")
        .append_pair("nocache", &Utc::now().timestamp_millis().to_string());
    Ok(url)
}
