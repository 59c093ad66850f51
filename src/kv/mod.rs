//! KV 存储抽象模块
//!
//! 统一的 `Store<K, V>` 接口，原始后端和装饰器（多级缓存、热加载、可观测）都实现同一接口，可以任意嵌套

pub mod loader;
pub mod parser;
pub mod serializer;
pub mod store;

// 重新导出核心接口
pub use loader::{KvStream, Listener, LoadStrategy, Loader, LoaderError};
pub use parser::{ChangeType, ParseValue, Parser, ParserError};
pub use serializer::{Serializer, SerializerError};
pub use store::{KvError, SetOptions, Store, StoreConfig};
