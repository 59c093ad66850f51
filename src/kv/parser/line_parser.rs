use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::marker::PhantomData;

use super::{ChangeType, ParseValue, Parser, ParserError};

/// LineParser 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct LineParserConfig {
    /// 字段分隔符
    #[default = "\t"]
    pub separator: String,
}

/// 行解析器
///
/// 格式：`key<sep>value[<sep>change_type]`，缺省或为空时变更类型为 Add。
/// value 中可以再出现分隔符，只有最后一段能被识别为变更类型时才会被拆出。
pub struct LineParser<K, V> {
    separator: String,
    _phantom: PhantomData<fn() -> (K, V)>,
}

impl<K, V> LineParser<K, V> {
    pub fn new(config: LineParserConfig) -> Self {
        Self {
            separator: config.separator,
            _phantom: PhantomData,
        }
    }

    fn split<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str, ChangeType)> {
        let (key, rest) = line.split_once(self.separator.as_str())?;

        if let Some((value, change_type)) = rest.rsplit_once(self.separator.as_str()) {
            if change_type.trim().is_empty() {
                return Some((key, value, ChangeType::Add));
            }
            if is_change_type(change_type) {
                return Some((key, value, ChangeType::parse(change_type)));
            }
        }

        Some((key, rest, ChangeType::Add))
    }
}

fn is_change_type(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && (s.chars().all(|c| c.is_ascii_digit()) || ChangeType::parse(s) != ChangeType::Unknown)
}

impl<K, V> From<LineParserConfig> for LineParser<K, V> {
    fn from(config: LineParserConfig) -> Self {
        Self::new(config)
    }
}

impl<K, V> Parser<K, V> for LineParser<K, V>
where
    K: ParseValue + Send + Sync,
    V: ParseValue + Send + Sync,
{
    fn parse(&self, buf: &[u8]) -> Result<(ChangeType, K, V), ParserError> {
        let line = std::str::from_utf8(buf)
            .map_err(|e| ParserError::ParseFailed(format!("invalid UTF-8: {}", e)))?;
        let line = line.trim_end_matches(['\r', '\n']);

        let (key, value, change_type) = self.split(line).ok_or_else(|| {
            ParserError::ParseFailed(format!(
                "expected at least 2 fields separated by {:?}, got {:?}",
                self.separator, line
            ))
        })?;

        let key = K::parse_value(key)
            .map_err(|e| ParserError::ParseFailed(format!("failed to parse key: {}", e)))?;
        let value = V::parse_value(value)
            .map_err(|e| ParserError::ParseFailed(format!("failed to parse value: {}", e)))?;

        Ok((change_type, key, value))
    }
}
