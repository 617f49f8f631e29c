pub mod market;
pub mod watcher;

pub use market::MarketData;
pub use watcher::CoinWatcher;
