use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{LineParser, LineParserConfig, ParseValue};

/// 数据变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeType {
    /// 无法识别的变更类型，消费方按 Update 处理
    #[default]
    Unknown = 0,
    Add = 1,
    Update = 2,
    Delete = 3,
}

impl ChangeType {
    /// 解析变更类型，支持数字（1/2/3）和名称（add/update/delete，不区分大小写），
    /// 其余输入均为 Unknown
    pub fn parse(s: &str) -> ChangeType {
        let s = s.trim();
        if let Ok(n) = s.parse::<i32>() {
            return ChangeType::from(n);
        }

        match s.to_ascii_lowercase().as_str() {
            "add" => ChangeType::Add,
            "update" => ChangeType::Update,
            "delete" => ChangeType::Delete,
            _ => ChangeType::Unknown,
        }
    }
}

impl From<i32> for ChangeType {
    fn from(n: i32) -> Self {
        match n {
            1 => ChangeType::Add,
            2 => ChangeType::Update,
            3 => ChangeType::Delete,
            _ => ChangeType::Unknown,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeType::Unknown => "unknown",
            ChangeType::Add => "add",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// 解析相关错误
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Parse failed: {0}")]
    ParseFailed(String),
}

/// 将一条原始记录解析为 `(ChangeType, K, V)`
pub trait Parser<K, V>: Send + Sync {
    fn parse(&self, buf: &[u8]) -> Result<(ChangeType, K, V), ParserError>;
}

/// 解析器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options")]
pub enum ParserConfig {
    LineParser(LineParserConfig),
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig::LineParser(LineParserConfig::default())
    }
}

impl ParserConfig {
    pub fn build<K, V>(&self) -> Box<dyn Parser<K, V>>
    where
        K: ParseValue + Send + Sync + 'static,
        V: ParseValue + Send + Sync + 'static,
    {
        match self {
            ParserConfig::LineParser(config) => Box::new(LineParser::new(config.clone())),
        }
    }
}
