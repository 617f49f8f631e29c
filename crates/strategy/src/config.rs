use serde::{Deserialize, Serialize};

use common::StrategyKind;

/// Top-level watchlist config file (TOML).
///
/// Example `config/watchlist.toml`:
/// ```toml
/// [[watch]]
/// coin = "bitcoin"
/// days = 30
/// strategies = ["goldencross", "machannel"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchFileConfig {
    #[serde(rename = "watch")]
    pub watches: Vec<WatchConfig>,
}

/// One watched instrument and the strategies to run over its history.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Instrument id as known to the remote API, e.g. "bitcoin".
    pub coin: String,
    /// Lookback window in days for the price history.
    #[serde(default = "default_days")]
    pub days: u32,
    /// Active strategies; their signal lists are unioned.
    #[serde(default)]
    pub strategies: Vec<StrategyKind>,
}

fn default_days() -> u32 {
    30
}

impl WatchFileConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read watchlist config at '{path}': {e}"));
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse watchlist config at '{path}': {e}"))
    }
}
