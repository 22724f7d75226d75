//! TeenCivics web server.
//!
//! Serves the featured-bill voting page, the vote API, and the health
//! probes. Startup never blocks on PostgreSQL: the pool is lazy, schema
//! migration runs in a background task, and an in-memory snapshot of the
//! featured bill keeps the front page up through database outages.

#[macro_use]
extern crate rocket;

mod cache;
mod pages;
mod routes;

use anyhow::{Context, Result};
use shared::{Store, WebConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cache::PageCache;
use routes::AppState;

#[rocket::main]
async fn main() -> Result<()> {
    init_logging();

    let config = WebConfig::from_env()?;
    let store = Store::connect_lazy(&config.database_url)?;
    let page_cache = PageCache::new();

    // Migrate and warm the cache off the startup path; a dead database
    // must not keep the server from binding its port.
    tokio::spawn(warm_up(store.clone(), page_cache.clone()));

    info!(
        "starting web server on port {} with {} workers",
        config.port, config.workers
    );

    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", config.port))
        .merge(("workers", config.workers));

    rocket::custom(figment)
        .manage(AppState {
            store,
            cache: page_cache,
        })
        .mount(
            "/",
            routes![
                routes::healthz,
                routes::healthz_db,
                routes::index,
                routes::bill_page,
                routes::results,
                routes::vote,
            ],
        )
        .launch()
        .await
        .context("failed to launch web server")?;

    Ok(())
}

async fn warm_up(store: Store, cache: PageCache) {
    if let Err(e) = store.migrate().await {
        warn!("startup migration deferred, database unavailable: {}", e);
        return;
    }

    match store.latest_posted_bill().await {
        Ok(Some(bill)) => match store.tally(bill.id).await {
            Ok(tally) => {
                info!("warmed page cache with {}", bill.slug);
                cache.store(bill, tally).await;
            }
            Err(e) => warn!("cache warm-up skipped: {}", e),
        },
        Ok(None) => info!("no posted bill yet, cache left empty"),
        Err(e) => warn!("cache warm-up skipped: {}", e),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}
