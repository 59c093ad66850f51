//! 配置辅助类型

pub mod duration;

pub use duration::{format_duration, parse_duration, DurationError, HumanDur};
