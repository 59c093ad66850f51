use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::marker::PhantomData;

use crate::kv::serializer::core::{Serializer, SerializerError};

/// JSON 序列化器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct JsonSerializerConfig {
    /// 是否格式化输出（美化 JSON）
    pub pretty: bool,
}

/// JSON 序列化器
///
/// 支持任意实现了 Serialize + Deserialize 的类型与字节数组之间的序列化
pub struct JsonSerializer<T> {
    config: JsonSerializerConfig,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new(config: JsonSerializerConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }
}

impl<T> Serializer<T, Vec<u8>> for JsonSerializer<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    fn serialize(&self, from: &T) -> Result<Vec<u8>, SerializerError> {
        let result = if self.config.pretty {
            serde_json::to_vec_pretty(from)
        } else {
            serde_json::to_vec(from)
        };
        result.map_err(|e| SerializerError::SerializationFailed(e.to_string()))
    }

    fn deserialize(&self, to: &Vec<u8>) -> Result<T, SerializerError> {
        serde_json::from_slice(to).map_err(|e| SerializerError::DeserializationFailed(e.to_string()))
    }
}

impl<T> From<JsonSerializerConfig> for JsonSerializer<T> {
    fn from(config: JsonSerializerConfig) -> Self {
        JsonSerializer::new(config)
    }
}
