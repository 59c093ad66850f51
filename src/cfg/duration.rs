use serde::{Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};
use std::time::Duration;
use thiserror::Error;

/// 时长解析错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("expected number at `{0}`")]
    MissingNumber(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("missing unit after `{0}`")]
    MissingUnit(String),

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("duration overflow: {0}")]
    Overflow(String),
}

/// 人类可读的时长，配合 `#[serde_as(as = "HumanDur")]` 使用
///
/// 支持 ns / us / ms / s / m / h / d 及其组合，如 "100ms"、"1h30m"、"1.5s"
pub struct HumanDur;

impl SerializeAs<Duration> for HumanDur {
    fn serialize_as<S>(source: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*source))
    }
}

impl<'de> DeserializeAs<'de, Duration> for HumanDur {
    fn deserialize_as<D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        "d" => 86400e9,
        _ => return None,
    };
    Some(nanos)
}

/// 解析时长字符串，"1h30m45s" -> Duration
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let mut total = Duration::ZERO;
    let mut rest = s.as_str();

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return Err(DurationError::MissingNumber(rest.to_string()));
        }
        let (num, tail) = rest.split_at(num_end);
        let value: f64 = num
            .parse()
            .map_err(|_| DurationError::InvalidNumber(num.to_string()))?;

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        if unit_end == 0 {
            return Err(DurationError::MissingUnit(num.to_string()));
        }
        let (unit, tail) = tail.split_at(unit_end);
        let nanos = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))?;

        let part = (value * nanos).round();
        if part >= u64::MAX as f64 {
            return Err(DurationError::Overflow(s.to_string()));
        }
        total = total
            .checked_add(Duration::from_nanos(part as u64))
            .ok_or_else(|| DurationError::Overflow(s.to_string()))?;
        rest = tail;
    }

    Ok(total)
}

/// 格式化时长，Duration -> "1h30m45s"，不足一秒的部分用 ms / us / ns 表示
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    let mut out = String::new();
    let mut secs = duration.as_secs();
    for (unit, size) in [("d", 86400), ("h", 3600), ("m", 60), ("s", 1)] {
        if secs >= size {
            out.push_str(&format!("{}{}", secs / size, unit));
            secs %= size;
        }
    }

    let nanos = duration.subsec_nanos();
    if nanos > 0 {
        if nanos % 1_000_000 == 0 {
            out.push_str(&format!("{}ms", nanos / 1_000_000));
        } else if nanos % 1_000 == 0 {
            out.push_str(&format!("{}us", nanos / 1_000));
        } else {
            out.push_str(&format!("{}ns", nanos));
        }
    }

    out
}
