use async_trait::async_trait;

use crate::market::{CoinCategory, CoinDetail, CoinSummary, GlobalSnapshot, MarketChart};
use crate::Result;

/// Abstraction over the remote market data API.
///
/// The gateway crate implements this against CoinGecko; tests implement it
/// with canned responses. Callers own retry policy; implementations must
/// surface the first failure and never retry internally.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Aggregate market snapshot (total cap, dominance percentages).
    async fn global(&self) -> Result<GlobalSnapshot>;

    /// One page of the coin list, sorted server-side.
    async fn coins_list(
        &self,
        page: u32,
        per_page: u32,
        currency: &str,
        order: &str,
    ) -> Result<Vec<CoinSummary>>;

    /// Full detail for a single coin.
    async fn coin_detail(&self, id: &str) -> Result<CoinDetail>;

    /// Price history over a lookback window in days.
    async fn market_chart(&self, id: &str, days: u32, currency: &str) -> Result<MarketChart>;

    /// The coin category index.
    async fn categories(&self) -> Result<Vec<CoinCategory>>;
}
