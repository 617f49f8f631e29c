use common::{Series, Signal, SignalKind, StrategyKind};

use crate::indicators::{band, moving_average, residual_std_dev, Band};

pub const SHORT_MA_PERIOD: usize = 5;
pub const LONG_MA_PERIOD: usize = 20;
/// Extra overlays drawn by the multi-EMA view.
pub const MID_MA_PERIOD: usize = 10;
pub const SLOW_MA_PERIOD: usize = 60;
pub const CHANNEL_PERIOD: usize = 20;
pub const CHANNEL_WIDTH: f64 = 2.0;

/// Chart overlays derived from one series for a set of active strategies.
/// Each moving average is computed once even when several strategies share
/// it; fields stay `None` for strategies that are not active.
#[derive(Debug, Clone, Default)]
pub struct Overlays {
    pub ma5: Option<Vec<Option<f64>>>,
    pub ma10: Option<Vec<Option<f64>>>,
    pub ma20: Option<Vec<Option<f64>>>,
    pub ma60: Option<Vec<Option<f64>>>,
    pub channel: Option<Band>,
}

/// Compute the overlays the active strategies draw.
///
/// Pure: same series and strategy set, same output. Callers re-invoke when
/// either input changes and memoize on the pair if they care.
pub fn compute_overlays(series: &Series, active: &[StrategyKind]) -> Overlays {
    let prices = series.prices();
    let mut overlays = Overlays::default();

    let crossover = active.contains(&StrategyKind::GoldenCross)
        || active.contains(&StrategyKind::MultiEma);
    let channel = active.contains(&StrategyKind::MaChannel);

    if crossover {
        overlays.ma5 = Some(moving_average(&prices, SHORT_MA_PERIOD));
    }
    if active.contains(&StrategyKind::MultiEma) {
        overlays.ma10 = Some(moving_average(&prices, MID_MA_PERIOD));
        overlays.ma60 = Some(moving_average(&prices, SLOW_MA_PERIOD));
    }
    if crossover || channel {
        let ma20 = moving_average(&prices, LONG_MA_PERIOD);
        if channel {
            let std_dev = residual_std_dev(&prices, &ma20, CHANNEL_PERIOD);
            overlays.channel = Some(band(&ma20, std_dev, CHANNEL_WIDTH));
        }
        overlays.ma20 = Some(ma20);
    }
    overlays
}

/// Detect the union of signals for the active strategies.
///
/// Strategies are evaluated independently and concatenated in canonical
/// order (goldencross, then machannel), each sorted by index. The multi-EMA
/// strategy contributes overlays only, never signals. A series shorter than
/// the indicator windows yields an empty list, not an error.
pub fn detect_signals(series: &Series, active: &[StrategyKind]) -> Vec<Signal> {
    let golden = active.contains(&StrategyKind::GoldenCross);
    let channel = active.contains(&StrategyKind::MaChannel);
    if series.len() < 2 || (!golden && !channel) {
        return Vec::new();
    }

    let prices = series.prices();
    let ma20 = moving_average(&prices, LONG_MA_PERIOD);

    let mut signals = Vec::new();
    if golden {
        let ma5 = moving_average(&prices, SHORT_MA_PERIOD);
        signals.extend(crossover_signals(series, &ma5, &ma20));
    }
    if channel {
        let std_dev = residual_std_dev(&prices, &ma20, CHANNEL_PERIOD);
        let channel_band = band(&ma20, std_dev, CHANNEL_WIDTH);
        signals.extend(breakout_signals(series, &channel_band));
    }
    signals
}

/// Scan for short/long moving-average crossovers.
///
/// Both averages must be defined at `i-1` and `i` to evaluate. The
/// inequality at the crossing index is strict: a run of exact equality
/// followed by a strict move fires exactly once, at the move.
pub fn crossover_signals(
    series: &Series,
    short: &[Option<f64>],
    long: &[Option<f64>],
) -> Vec<Signal> {
    let points = series.points();
    let n = points.len().min(short.len()).min(long.len());

    let mut out = Vec::new();
    for i in 1..n {
        let (Some(s_prev), Some(s_cur), Some(l_prev), Some(l_cur)) =
            (short[i - 1], short[i], long[i - 1], long[i])
        else {
            continue;
        };

        let kind = if s_prev <= l_prev && s_cur > l_cur {
            SignalKind::Buy
        } else if s_prev >= l_prev && s_cur < l_cur {
            SignalKind::Sell
        } else {
            continue;
        };

        out.push(Signal {
            kind,
            index: i,
            timestamp: points[i].timestamp,
            price: points[i].price,
            strategy: StrategyKind::GoldenCross,
        });
    }
    out
}

/// Scan for price breakouts through the volatility channel.
///
/// Band edges are `None` exactly where the underlying average is undefined,
/// so the edge checks also enforce the average's availability at `i-1` and
/// `i`. Breaking above the channel sells; breaking below buys.
pub fn breakout_signals(series: &Series, channel: &Band) -> Vec<Signal> {
    let points = series.points();
    let n = points
        .len()
        .min(channel.upper.len())
        .min(channel.lower.len());

    let mut out = Vec::new();
    for i in 1..n {
        let (Some(u_prev), Some(u_cur), Some(lo_prev), Some(lo_cur)) = (
            channel.upper[i - 1],
            channel.upper[i],
            channel.lower[i - 1],
            channel.lower[i],
        ) else {
            continue;
        };

        let prev = points[i - 1].price;
        let cur = points[i].price;

        let kind = if prev <= u_prev && cur > u_cur {
            SignalKind::Sell
        } else if prev >= lo_prev && cur < lo_cur {
            SignalKind::Buy
        } else {
            continue;
        };

        out.push(Signal {
            kind,
            index: i,
            timestamp: points[i].timestamp,
            price: points[i].price,
            strategy: StrategyKind::MaChannel,
        });
    }
    out
}
