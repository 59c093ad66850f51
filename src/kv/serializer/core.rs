use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{JsonSerializer, JsonSerializerConfig, MsgPackSerializer, MsgPackSerializerConfig};

/// 序列化相关错误
#[derive(Error, Debug)]
pub enum SerializerError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

/// 序列化 trait
///
/// F: 源类型（From type）
/// T: 目标类型（To type），后端存储一般为 `Vec<u8>`
pub trait Serializer<F, T>: Send + Sync {
    /// 序列化：将 F 类型转换为 T 类型
    fn serialize(&self, from: &F) -> Result<T, SerializerError>;

    /// 反序列化：将 T 类型转换为 F 类型
    fn deserialize(&self, to: &T) -> Result<F, SerializerError>;
}

/// 序列化器配置
///
/// 形如 `{ "type": "JsonSerializer", "options": { "pretty": false } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options")]
pub enum SerializerConfig {
    JsonSerializer(JsonSerializerConfig),
    MsgPackSerializer(MsgPackSerializerConfig),
}

impl Default for SerializerConfig {
    fn default() -> Self {
        SerializerConfig::JsonSerializer(JsonSerializerConfig::default())
    }
}

impl SerializerConfig {
    /// 根据配置创建字节序列化器
    pub fn build<T>(&self) -> Box<dyn Serializer<T, Vec<u8>>>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
    {
        match self {
            SerializerConfig::JsonSerializer(config) => {
                Box::new(JsonSerializer::new(config.clone()))
            }
            SerializerConfig::MsgPackSerializer(config) => {
                Box::new(MsgPackSerializer::new(config.clone()))
            }
        }
    }
}
