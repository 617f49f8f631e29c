use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cache::{CacheStore, QueryCache};
use common::{Config, MarketDataSource};
use gateway::CoinGeckoClient;
use strategy::WatchFileConfig;
use tracker::{CoinWatcher, MarketData};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(currency = %cfg.vs_currency, api = %cfg.api_base_url, "CoinWatch starting");

    // ── Cache store ───────────────────────────────────────────────────────────
    let db = SqlitePool::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to cache database: {e}"));
    sqlx::migrate!("../../migrations")
        .run(&db)
        .await
        .unwrap_or_else(|e| panic!("Database migration failed: {e}"));
    info!("Cache store ready");

    // ── Market data facade ────────────────────────────────────────────────────
    let source: Arc<dyn MarketDataSource> = Arc::new(CoinGeckoClient::new(&cfg.api_base_url));
    let cache = QueryCache::new(CacheStore::new(db));
    let market = MarketData::new(source, cache, cfg.vs_currency.clone());

    // ── Watchers ──────────────────────────────────────────────────────────────
    let watchlist = WatchFileConfig::load(&cfg.watchlist_path);
    for watch in watchlist.watches {
        let watcher = CoinWatcher::new(market.clone(), watch);
        tokio::spawn(watcher.run());
    }

    // ── Market overview ───────────────────────────────────────────────────────
    tokio::spawn(overview_loop(market));

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await.unwrap();
    info!("Shutdown signal received. Exiting.");
}

/// Log the market at startup, then ride the global snapshot refreshes.
async fn overview_loop(market: MarketData) {
    match market.categories().await {
        Ok(categories) => info!(count = categories.len(), "category index loaded"),
        Err(e) => warn!(error = %e, "category index unavailable"),
    }

    match market.coins_list(1, 10, "market_cap_desc").await {
        Ok(coins) => {
            for coin in &coins {
                info!(
                    rank = ?coin.market_cap_rank,
                    id = %coin.id,
                    price = ?coin.current_price,
                    change_24h = ?coin.price_change_percentage_24h,
                    "top coin"
                );
            }
        }
        Err(e) => warn!(error = %e, "coin list unavailable"),
    }

    match market.global().await {
        Ok(snapshot) => log_snapshot(&market, &snapshot),
        Err(e) => warn!(error = %e, "global snapshot unavailable"),
    }

    let mut sub = market.subscribe_global();
    while let Some(snapshot) = sub.recv().await {
        log_snapshot(&market, &snapshot);
    }
    warn!("global snapshot stream closed");
}

fn log_snapshot(market: &MarketData, snapshot: &common::GlobalSnapshot) {
    info!(
        total_market_cap = ?snapshot.total_market_cap.get(market.currency()),
        btc_dominance = ?snapshot.market_cap_percentage.get("btc"),
        change_24h = ?snapshot.market_cap_change_percentage_24h_usd,
        "market overview"
    );
}
