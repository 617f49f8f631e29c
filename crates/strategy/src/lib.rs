pub mod config;
pub mod detector;
pub mod indicators;

pub use config::{WatchConfig, WatchFileConfig};
pub use detector::{
    breakout_signals, compute_overlays, crossover_signals, detect_signals, Overlays,
};
pub use indicators::{band, moving_average, residual_std_dev, Band};
