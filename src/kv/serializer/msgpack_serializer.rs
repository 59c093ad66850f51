use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::marker::PhantomData;

use crate::kv::serializer::core::{Serializer, SerializerError};

/// MessagePack 序列化器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct MsgPackSerializerConfig {
    /// 是否使用命名字段（struct 字段名）
    #[default = true]
    pub named: bool,
}

/// MessagePack 序列化器
///
/// 二进制格式，体积比 JSON 小，适合存放到远端缓存
pub struct MsgPackSerializer<T> {
    config: MsgPackSerializerConfig,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> MsgPackSerializer<T> {
    pub fn new(config: MsgPackSerializerConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }
}

impl<T> Serializer<T, Vec<u8>> for MsgPackSerializer<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    fn serialize(&self, from: &T) -> Result<Vec<u8>, SerializerError> {
        let result = if self.config.named {
            rmp_serde::to_vec_named(from)
        } else {
            rmp_serde::to_vec(from)
        };
        result.map_err(|e| SerializerError::SerializationFailed(e.to_string()))
    }

    fn deserialize(&self, to: &Vec<u8>) -> Result<T, SerializerError> {
        rmp_serde::from_slice(to).map_err(|e| SerializerError::DeserializationFailed(e.to_string()))
    }
}

impl<T> From<MsgPackSerializerConfig> for MsgPackSerializer<T> {
    fn from(config: MsgPackSerializerConfig) -> Self {
        MsgPackSerializer::new(config)
    }
}
