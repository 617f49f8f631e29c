/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string for the cache store.
    pub database_url: String,

    /// Base URL of the market data API.
    pub api_base_url: String,

    /// Quote currency for prices and market caps (e.g. "usd").
    pub vs_currency: String,

    /// Watchlist config file path.
    pub watchlist_path: String,
}

pub const DEFAULT_API_BASE_URL: &str = "https://api.coingecko.com/api/v3";

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            database_url: required_env("DATABASE_URL"),
            api_base_url: optional_env("API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            vs_currency: optional_env("VS_CURRENCY").unwrap_or_else(|| "usd".to_string()),
            watchlist_path: optional_env("WATCHLIST_PATH")
                .unwrap_or_else(|| "config/watchlist.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
