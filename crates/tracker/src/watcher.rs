use tracing::{debug, error, info, warn};

use common::{MarketChart, Signal};
use strategy::{compute_overlays, detect_signals, WatchConfig};

use crate::market::MarketData;

/// Follows one instrument's price history and reports strategy signals.
///
/// Gets an initial chart through the cache, then rides the key's background
/// refreshes. Overlays and signals are recomputed from scratch on every new
/// series; the previous signal list is kept only to log fresh events once.
pub struct CoinWatcher {
    market: MarketData,
    watch: WatchConfig,
}

impl CoinWatcher {
    pub fn new(market: MarketData, watch: WatchConfig) -> Self {
        Self { market, watch }
    }

    /// Run the watch loop. Call from `tokio::spawn`.
    pub async fn run(self) {
        let coin = self.watch.coin.clone();

        match self.market.coin_detail(&coin).await {
            Ok(detail) => {
                info!(
                    coin = %coin,
                    name = %detail.name,
                    days = self.watch.days,
                    strategies = ?self.watch.strategies,
                    "watching"
                );
            }
            Err(e) => warn!(coin = %coin, error = %e, "coin detail unavailable"),
        }

        let mut last_signals: Vec<Signal> = Vec::new();
        match self.market.market_chart(&coin, self.watch.days).await {
            Ok(chart) => {
                last_signals = self.evaluate(&chart);
                for signal in &last_signals {
                    info!(
                        coin = %coin,
                        strategy = %signal.strategy,
                        kind = %signal.kind,
                        index = signal.index,
                        price = signal.price,
                        "signal"
                    );
                }
            }
            Err(e) => error!(coin = %coin, error = %e, "initial chart fetch failed"),
        }

        let mut sub = self.market.subscribe_market_chart(&coin, self.watch.days);
        while let Some(chart) = sub.recv().await {
            let signals = self.evaluate(&chart);
            for signal in signals.iter().filter(|s| !last_signals.contains(s)) {
                info!(
                    coin = %coin,
                    strategy = %signal.strategy,
                    kind = %signal.kind,
                    index = signal.index,
                    price = signal.price,
                    "new signal"
                );
            }
            last_signals = signals;
        }
        warn!(coin = %coin, "refresh stream closed — watcher exiting");
    }

    /// Derive overlays and the full signal list for one chart payload.
    fn evaluate(&self, chart: &MarketChart) -> Vec<Signal> {
        let series = chart.series();
        let overlays = compute_overlays(&series, &self.watch.strategies);
        debug!(
            coin = %self.watch.coin,
            points = series.len(),
            ma20 = ?overlays.ma20.as_ref().and_then(|ma| ma.last().copied().flatten()),
            "overlays recomputed"
        );
        detect_signals(&series, &self.watch.strategies)
    }
}
