use std::sync::Arc;
use std::time::Duration;

use cache::{QueryCache, Subscription};
use common::{
    CoinCategory, CoinDetail, CoinSummary, GlobalSnapshot, MarketChart, MarketDataSource, Result,
};

/// Default entry lifetime, matching the original client's cache default.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Background refresh cadence per data kind.
pub const GLOBAL_REFRESH: Duration = Duration::from_secs(5 * 60);
pub const LIST_REFRESH: Duration = Duration::from_secs(60);
pub const DETAIL_REFRESH: Duration = Duration::from_secs(60);

/// Intraday lookbacks refresh every minute; longer histories barely move.
pub fn chart_refresh(days: u32) -> Duration {
    if days <= 1 {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(30 * 60)
    }
}

// ─── Cache keys ───────────────────────────────────────────────────────────────
// Deterministic strings derived from data kind + parameter tuple.

const GLOBAL_KEY: &str = "global-data";
const CATEGORIES_KEY: &str = "coin-categories";

fn coins_list_key(currency: &str, page: u32, per_page: u32, order: &str) -> String {
    format!("coins-list-{currency}-{page}-{per_page}-{order}")
}

fn coin_detail_key(id: &str) -> String {
    format!("coin-details-{id}")
}

fn chart_key(id: &str, days: u32, currency: &str) -> String {
    format!("market-chart-{id}-{days}-{currency}")
}

/// Cached front door to the remote market data API.
///
/// Owns cache-key derivation and the freshness policy per data kind.
/// `*_subscribe` variants attach to the key's background revalidation, so
/// consumers receive pushed updates without polling `query`.
#[derive(Clone)]
pub struct MarketData {
    source: Arc<dyn MarketDataSource>,
    cache: QueryCache,
    currency: String,
}

impl MarketData {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        cache: QueryCache,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            source,
            cache,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub async fn global(&self) -> Result<GlobalSnapshot> {
        let source = Arc::clone(&self.source);
        self.cache
            .query(GLOBAL_KEY, DEFAULT_TTL, move || async move {
                source.global().await
            })
            .await
    }

    pub fn subscribe_global(&self) -> Subscription<GlobalSnapshot> {
        let source = Arc::clone(&self.source);
        self.cache
            .subscribe(GLOBAL_KEY, DEFAULT_TTL, GLOBAL_REFRESH, move || {
                let source = Arc::clone(&source);
                async move { source.global().await }
            })
    }

    pub async fn coins_list(
        &self,
        page: u32,
        per_page: u32,
        order: &str,
    ) -> Result<Vec<CoinSummary>> {
        let key = coins_list_key(&self.currency, page, per_page, order);
        let source = Arc::clone(&self.source);
        let currency = self.currency.clone();
        let order = order.to_string();
        self.cache
            .query(&key, DEFAULT_TTL, move || async move {
                source.coins_list(page, per_page, &currency, &order).await
            })
            .await
    }

    pub fn subscribe_coins_list(
        &self,
        page: u32,
        per_page: u32,
        order: &str,
    ) -> Subscription<Vec<CoinSummary>> {
        let key = coins_list_key(&self.currency, page, per_page, order);
        let source = Arc::clone(&self.source);
        let currency = self.currency.clone();
        let order = order.to_string();
        self.cache
            .subscribe(&key, DEFAULT_TTL, LIST_REFRESH, move || {
                let source = Arc::clone(&source);
                let currency = currency.clone();
                let order = order.clone();
                async move { source.coins_list(page, per_page, &currency, &order).await }
            })
    }

    pub async fn coin_detail(&self, id: &str) -> Result<CoinDetail> {
        let key = coin_detail_key(id);
        let source = Arc::clone(&self.source);
        let id = id.to_string();
        self.cache
            .query(&key, DEFAULT_TTL, move || async move {
                source.coin_detail(&id).await
            })
            .await
    }

    pub fn subscribe_coin_detail(&self, id: &str) -> Subscription<CoinDetail> {
        let key = coin_detail_key(id);
        let source = Arc::clone(&self.source);
        let id = id.to_string();
        self.cache
            .subscribe(&key, DEFAULT_TTL, DETAIL_REFRESH, move || {
                let source = Arc::clone(&source);
                let id = id.clone();
                async move { source.coin_detail(&id).await }
            })
    }

    pub async fn market_chart(&self, id: &str, days: u32) -> Result<MarketChart> {
        let key = chart_key(id, days, &self.currency);
        let source = Arc::clone(&self.source);
        let id = id.to_string();
        let currency = self.currency.clone();
        self.cache
            .query(&key, DEFAULT_TTL, move || async move {
                source.market_chart(&id, days, &currency).await
            })
            .await
    }

    pub fn subscribe_market_chart(&self, id: &str, days: u32) -> Subscription<MarketChart> {
        let key = chart_key(id, days, &self.currency);
        let source = Arc::clone(&self.source);
        let id = id.to_string();
        let currency = self.currency.clone();
        self.cache
            .subscribe(&key, DEFAULT_TTL, chart_refresh(days), move || {
                let source = Arc::clone(&source);
                let id = id.clone();
                let currency = currency.clone();
                async move { source.market_chart(&id, days, &currency).await }
            })
    }

    pub async fn categories(&self) -> Result<Vec<CoinCategory>> {
        let source = Arc::clone(&self.source);
        self.cache
            .query(CATEGORIES_KEY, DEFAULT_TTL, move || async move {
                source.categories().await
            })
            .await
    }
}
