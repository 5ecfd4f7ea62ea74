use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use marketsync::marketplace::load_marketplaces;
use marketsync::sync::store::ensure_products_table;
use marketsync::sync::{
    run_tick, ImageMirror, MarketplaceClient, OwnerOnConflict, ProductUpsertStore, SyncOptions,
};
use marketsync::util::db::Db;
use marketsync::util::env as env_util;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "marketsync", version, about = "Marketplace product sync service")]
struct Args {
    /// Seconds between sync ticks
    #[arg(long, default_value_t = 900)]
    interval_secs: u64,
    /// Run a single tick and exit
    #[arg(long, default_value_t = false)]
    once: bool,
    /// Sync only this marketplace id
    #[arg(long)]
    marketplace_id: Option<i32>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    env_util::init_env();
    marketsync::tracing::init_tracing("marketsync=info,sqlx=warn")?;
    let args = Args::parse();

    let db_url = env_util::db_url()?;
    let max_conns: u32 = env_util::env_parse("DB_MAX_CONNS", 5);
    let db = Db::connect(&db_url, max_conns).await?;
    ensure_products_table(&db).await?;

    let timeout_secs: u64 = env_util::env_parse("HTTP_TIMEOUT_SECS", 30);
    let client = MarketplaceClient::new(env_util::proxy_url().as_deref(), timeout_secs)?;
    let mirror_enabled = env_util::env_flag("IMAGE_MIRROR_ENABLED", true);
    let mirror = ImageMirror::new(client.http().clone(), env_util::mirror_root());
    let store = ProductUpsertStore::new(db.clone(), OwnerOnConflict::from_env());

    let opts = SyncOptions {
        items_per_page: env_util::env_parse("SYNC_PAGE_SIZE", 100u32),
        concurrency: env_util::env_parse("SYNC_CONCURRENCY", 4usize),
        deadline: Duration::from_secs(env_util::env_parse("SYNC_DEADLINE_SECS", 600u64)),
    };
    info!(
        interval_secs = args.interval_secs,
        page_size = opts.items_per_page,
        concurrency = opts.concurrency,
        "marketsync started"
    );

    let mut ticker = interval(Duration::from_secs(args.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }

        // Reload each tick so admin edits take effect without a restart.
        let marketplaces = match load_marketplaces(&db, args.marketplace_id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "could not load marketplaces; retrying next tick");
                continue;
            }
        };
        if marketplaces.is_empty() {
            info!("no marketplaces configured");
        }

        let started = Utc::now();
        let outcomes = run_tick(
            &client,
            &store,
            mirror_enabled.then_some(&mirror),
            &marketplaces,
            &opts,
        )
        .await;
        for outcome in &outcomes {
            match &outcome.first_error {
                None => info!(
                    marketplace = %outcome.title,
                    pages = outcome.pages_succeeded,
                    rows = outcome.rows_persisted,
                    "tick ok"
                ),
                Some(err) => warn!(
                    marketplace = %outcome.title,
                    pages_succeeded = outcome.pages_succeeded,
                    pages_attempted = outcome.pages_attempted,
                    rows = outcome.rows_persisted,
                    error = %err,
                    "tick finished with errors"
                ),
            }
        }
        info!(
            marketplaces = outcomes.len(),
            elapsed_ms = (Utc::now() - started).num_milliseconds(),
            "tick complete"
        );

        if args.once {
            break;
        }
    }

    Ok(())
}
