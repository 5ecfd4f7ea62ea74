//! HTTP access to a marketplace's remote product API: the count call and the
//! paginated read call. Transport concerns (timeout, user agent, egress
//! proxy) are fixed once at client construction and injected per deployment.

use crate::marketplace::Marketplace;
use crate::sync::error::SyncError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Result of the remote count call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCount {
    pub no_of_pages: u32,
    pub no_of_items: u64,
}

/// One page of the remote catalog, as received.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub is_error: bool,
    pub results: Vec<Value>,
}

/// Seam between the orchestrator and the wire. The production implementation
/// is [`MarketplaceClient`]; tests drive the orchestrator with scripted pages.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn count(
        &self,
        marketplace: &Marketplace,
        headers: HeaderMap,
    ) -> Result<CatalogCount, SyncError>;

    async fn fetch_page(
        &self,
        marketplace: &Marketplace,
        headers: HeaderMap,
        page_nr: u32,
        items_per_page: u32,
    ) -> Result<CatalogPage, SyncError>;
}

#[derive(Clone)]
pub struct MarketplaceClient {
    http: Client,
}

impl MarketplaceClient {
    /// Build the shared client. `proxy_url` routes all marketplace egress
    /// through a forward proxy when set; it is never compiled in.
    pub fn new(proxy_url: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("marketsync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs));
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    /// The underlying client, shared with the image mirror so downloads use
    /// the same proxy and timeout.
    pub fn http(&self) -> &Client {
        &self.http
    }

}

fn products_url(marketplace: &Marketplace, endpoint: &str, subpath: &str) -> String {
    format!("{}{}/{}", marketplace.base_api_url, endpoint, subpath)
}

#[async_trait]
impl CatalogSource for MarketplaceClient {
    async fn count(
        &self,
        marketplace: &Marketplace,
        headers: HeaderMap,
    ) -> Result<CatalogCount, SyncError> {
        let endpoints = marketplace.products_endpoints()?;
        let url = products_url(
            marketplace,
            endpoints.endpoint.as_deref().unwrap_or_default(),
            endpoints.count.as_deref().unwrap_or("count"),
        );

        let resp = self.http.get(&url).headers(headers).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::RemoteFetch {
                status: Some(status.as_u16()),
                message: format!("count call failed for {url}"),
            });
        }
        let body: Value = resp.json().await?;
        parse_count(&body)
    }

    async fn fetch_page(
        &self,
        marketplace: &Marketplace,
        headers: HeaderMap,
        page_nr: u32,
        items_per_page: u32,
    ) -> Result<CatalogPage, SyncError> {
        let endpoints = marketplace.products_endpoints()?;
        let url = products_url(
            marketplace,
            endpoints.endpoint.as_deref().unwrap_or_default(),
            endpoints.read.as_deref().unwrap_or("read"),
        );

        let resp = self
            .http
            .post(&url)
            .headers(headers)
            .json(&json!({
                "itemsPerPage": items_per_page,
                "currentPage": page_nr,
            }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::RemoteFetch {
                status: Some(status.as_u16()),
                message: format!("page {page_nr} fetch failed for {url}"),
            });
        }
        let body: Value = resp.json().await?;
        parse_page(&body)
    }
}

fn parse_count(body: &Value) -> Result<CatalogCount, SyncError> {
    let results = body.get("results").ok_or_else(|| SyncError::RemoteFetch {
        status: None,
        message: "count response missing results".into(),
    })?;
    let no_of_pages = value_as_u64(results.get("noOfPages")).ok_or_else(|| {
        SyncError::RemoteFetch {
            status: None,
            message: "count response missing noOfPages".into(),
        }
    })?;
    let no_of_pages = u32::try_from(no_of_pages).map_err(|_| SyncError::RemoteFetch {
        status: None,
        message: format!("implausible noOfPages {no_of_pages}"),
    })?;
    let no_of_items = value_as_u64(results.get("noOfItems")).unwrap_or(0);
    Ok(CatalogCount {
        no_of_pages,
        no_of_items,
    })
}

fn parse_page(body: &Value) -> Result<CatalogPage, SyncError> {
    let is_error = body
        .get("isError")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| SyncError::RemoteFetch {
            status: None,
            message: "page response missing isError flag".into(),
        })?;
    let results = body
        .get("results")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    Ok(CatalogPage { is_error, results })
}

/// Marketplaces disagree on whether counters come back as numbers or strings.
fn value_as_u64(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<u64>().ok();
    }
    None
}
