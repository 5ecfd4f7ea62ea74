//! Drives one marketplace end to end — resolve credentials, count, walk the
//! pages, normalize, mirror, upsert — and fans a scheduled tick out over all
//! configured marketplaces with bounded concurrency. Errors are contained at
//! the smallest skippable unit: record, page, or marketplace.

use crate::marketplace::Marketplace;
use crate::sync::client::CatalogSource;
use crate::sync::credentials::{resolve, PageContext};
use crate::sync::error::SyncError;
use crate::sync::mirror::ImageMirror;
use crate::sync::normalize::normalize;
use crate::sync::store::ProductSink;
use futures::{stream, StreamExt};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub items_per_page: u32,
    /// Marketplaces synced in parallel per tick.
    pub concurrency: usize,
    /// Hard per-marketplace deadline so one unresponsive remote cannot
    /// starve the next scheduled tick.
    pub deadline: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            items_per_page: 100,
            concurrency: 4,
            deadline: Duration::from_secs(600),
        }
    }
}

/// Per-marketplace result of one tick. Ephemeral, logging/observability only.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub marketplace_id: i32,
    pub title: String,
    pub pages_attempted: u32,
    pub pages_succeeded: u32,
    pub items_seen: usize,
    pub rows_persisted: usize,
    pub first_error: Option<String>,
}

impl SyncOutcome {
    fn for_marketplace(marketplace: &Marketplace) -> Self {
        Self {
            marketplace_id: marketplace.id,
            title: marketplace.title.clone(),
            ..Self::default()
        }
    }

    fn record_error(&mut self, error: &SyncError) {
        if self.first_error.is_none() {
            self.first_error = Some(error.to_string());
        }
    }
}

/// Sync one marketplace. Never returns an error: every failure is absorbed
/// into the outcome so sibling marketplaces proceed untouched.
pub async fn sync_marketplace<S, K>(
    source: &S,
    sink: &K,
    mirror: Option<&ImageMirror>,
    marketplace: &Marketplace,
    opts: &SyncOptions,
) -> SyncOutcome
where
    S: CatalogSource,
    K: ProductSink,
{
    let mut outcome = SyncOutcome::for_marketplace(marketplace);
    info!(marketplace = %marketplace.title, "sync start");

    let credentials = match marketplace.parsed_credentials() {
        Ok(c) => c,
        Err(e) => {
            warn!(marketplace = %marketplace.title, error = %e, "skipping marketplace");
            outcome.record_error(&e);
            return outcome;
        }
    };

    let count_page = PageContext {
        page_nr: 1,
        items_per_page: opts.items_per_page,
    };
    let count = match resolve(&credentials, count_page) {
        Ok(headers) => match source.count(marketplace, headers).await {
            Ok(count) => count,
            Err(e) => {
                warn!(marketplace = %marketplace.title, error = %e, "count failed; skipping marketplace");
                outcome.record_error(&e);
                return outcome;
            }
        },
        Err(e) => {
            warn!(marketplace = %marketplace.title, error = %e, "skipping marketplace");
            outcome.record_error(&e);
            return outcome;
        }
    };
    info!(
        marketplace = %marketplace.title,
        pages = count.no_of_pages,
        items = count.no_of_items,
        "remote catalog counted"
    );

    for page_nr in 1..=count.no_of_pages {
        outcome.pages_attempted += 1;

        // Fresh headers per page: the signed scheme's signature is page- and
        // time-window dependent.
        let page_ctx = PageContext {
            page_nr,
            items_per_page: opts.items_per_page,
        };
        let headers = match resolve(&credentials, page_ctx) {
            Ok(h) => h,
            Err(e) => {
                warn!(marketplace = %marketplace.title, error = %e, "header resolution failed");
                outcome.record_error(&e);
                break;
            }
        };

        let page = match source
            .fetch_page(marketplace, headers, page_nr, opts.items_per_page)
            .await
        {
            Ok(p) => p,
            Err(e) => {
                warn!(marketplace = %marketplace.title, page = page_nr, error = %e, "page fetch failed; skipping page");
                outcome.record_error(&e);
                continue;
            }
        };
        if page.is_error {
            let e = SyncError::RemoteFetch {
                status: None,
                message: format!("page {page_nr} flagged isError"),
            };
            warn!(marketplace = %marketplace.title, page = page_nr, "remote flagged page as error; skipping page");
            outcome.record_error(&e);
            continue;
        }

        outcome.items_seen += page.results.len();
        let mut rows = Vec::with_capacity(page.results.len());
        for record in &page.results {
            match normalize(record) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(marketplace = %marketplace.title, page = page_nr, error = %e, "dropping record");
                    outcome.record_error(&e);
                }
            }
        }

        if let Some(mirror) = mirror {
            for row in &rows {
                if let Err(e) = mirror.mirror(row).await {
                    // Best-effort side channel; the row is persisted anyway.
                    warn!(product_id = row.id, error = %e, "image mirror failed");
                }
            }
        }

        outcome.rows_persisted += sink.upsert_page(&rows, &marketplace.owner).await;
        outcome.pages_succeeded += 1;
    }

    info!(
        marketplace = %marketplace.title,
        pages_succeeded = outcome.pages_succeeded,
        pages_attempted = outcome.pages_attempted,
        rows = outcome.rows_persisted,
        "sync done"
    );
    outcome
}

/// One scheduled pass over all configured marketplaces. Marketplaces share no
/// mutable state besides the store, whose conflict resolution is atomic, so
/// they run in parallel under a bounded worker pool.
pub async fn run_tick<S, K>(
    source: &S,
    sink: &K,
    mirror: Option<&ImageMirror>,
    marketplaces: &[Marketplace],
    opts: &SyncOptions,
) -> Vec<SyncOutcome>
where
    S: CatalogSource,
    K: ProductSink,
{
    stream::iter(marketplaces)
        .map(|marketplace| async move {
            match tokio::time::timeout(
                opts.deadline,
                sync_marketplace(source, sink, mirror, marketplace, opts),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(marketplace = %marketplace.title, deadline = ?opts.deadline, "sync deadline exceeded");
                    let mut outcome = SyncOutcome::for_marketplace(marketplace);
                    outcome.first_error = Some(format!(
                        "deadline of {:?} exceeded",
                        opts.deadline
                    ));
                    outcome
                }
            }
        })
        .buffer_unordered(opts.concurrency.max(1))
        .collect()
        .await
}
