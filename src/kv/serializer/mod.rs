pub mod core;
pub mod json_serializer;
pub mod msgpack_serializer;

pub use core::{Serializer, SerializerConfig, SerializerError};
pub use json_serializer::{JsonSerializer, JsonSerializerConfig};
pub use msgpack_serializer::{MsgPackSerializer, MsgPackSerializerConfig};
