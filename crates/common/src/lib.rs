pub mod config;
pub mod error;
pub mod market;
pub mod source;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use market::*;
pub use source::MarketDataSource;
pub use types::*;
