use serde::{Deserialize, Serialize};

/// One price sample: epoch-millisecond timestamp and quote-currency price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: f64,
}

/// A time-ordered sequence of price samples.
///
/// Timestamps are non-decreasing; duplicate timestamps are kept as
/// consecutive samples. Produced once per fetch response and read-only from
/// then on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    points: Vec<PricePoint>,
}

impl Series {
    /// Build a series, stably sorting by timestamp to establish the ordering
    /// invariant. Duplicate timestamps keep their relative order.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self { points }
    }

    /// Build from raw `[timestamp, value]` pairs as returned by the API.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(ts, price)| PricePoint {
                    timestamp: ts as i64,
                    price,
                })
                .collect(),
        )
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Prices alone, in series order, for indicator computation.
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }
}

/// Direction of a detected signal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buy,
    Sell,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "buy"),
            SignalKind::Sell => write!(f, "sell"),
        }
    }
}

/// One of the supported overlay/signal strategies.
///
/// Several may be active at once; their signal lists are unioned. The enum
/// order is the canonical ordering of unioned signal lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// MA(5) / MA(20) crossover signals.
    GoldenCross,
    /// Adds MA(10) and MA(60) overlays for charting; emits no signals.
    MultiEma,
    /// MA(20) ± 2·stddev(20) channel breakout signals.
    MaChannel,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::GoldenCross => write!(f, "goldencross"),
            StrategyKind::MultiEma => write!(f, "multiema"),
            StrategyKind::MaChannel => write!(f, "machannel"),
        }
    }
}

/// A discrete buy/sell event detected at one index of a series.
///
/// Recomputed from scratch whenever the series or the active strategy set
/// changes; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Index into the series the signal was detected on.
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
    pub strategy: StrategyKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_sorts_points_by_timestamp() {
        let series = Series::new(vec![
            PricePoint { timestamp: 30, price: 3.0 },
            PricePoint { timestamp: 10, price: 1.0 },
            PricePoint { timestamp: 20, price: 2.0 },
        ]);
        let ts: Vec<i64> = series.points().iter().map(|p| p.timestamp).collect();
        assert_eq!(ts, vec![10, 20, 30]);
    }

    #[test]
    fn series_keeps_duplicate_timestamps_in_order() {
        let series = Series::from_pairs(&[(10.0, 1.0), (20.0, 2.0), (20.0, 3.0), (30.0, 4.0)]);
        assert_eq!(series.len(), 4);
        assert_eq!(series.points()[1].price, 2.0);
        assert_eq!(series.points()[2].price, 3.0);
    }

    #[test]
    fn strategy_kind_parses_config_spelling() {
        let kind: StrategyKind = serde_json::from_str("\"goldencross\"").unwrap();
        assert_eq!(kind, StrategyKind::GoldenCross);
        let kind: StrategyKind = serde_json::from_str("\"machannel\"").unwrap();
        assert_eq!(kind, StrategyKind::MaChannel);
    }
}
