//! Statistics over drilled pixel arrays

pub mod point_stats;
pub mod standard;
pub mod value;

pub use point_stats::{ItemStats, PointStats};
pub use standard::{check_single_band, StdStat};
pub use value::{StatFn, StatValue, UserStat};
