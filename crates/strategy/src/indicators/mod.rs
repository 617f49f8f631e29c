pub mod band;
pub mod ma;

pub use band::{band, residual_std_dev, Band};
pub use ma::moving_average;
