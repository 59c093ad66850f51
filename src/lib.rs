//! kvx - 可组合的泛型 KV 存储
//!
//! ## 模块
//!
//! - **kv**: `Store<K, V>` 接口、内存与 Redis 后端、多级缓存 / 热加载 / 可观测装饰器
//! - **fs**: 文件监听，供文件加载器热更新使用
//! - **cfg**: 配置辅助类型（人类可读的时长）
//!
//! ## 示例
//!
//! ```ignore
//! use kvx::kv::store::{MapStore, SetOptions, Store, TieredStore, WritePolicy};
//! use std::sync::Arc;
//!
//! let store = TieredStore::<String, String>::from_parts(
//!     vec![Arc::new(MapStore::default()), Arc::new(MapStore::default())],
//!     WritePolicy::WriteThrough,
//!     true,
//! )?;
//! store.set(&"a".to_string(), &"1".to_string(), &SetOptions::new()).await?;
//! ```

pub mod cfg;
pub mod fs;
pub mod kv;

// 重新导出主要的公共 API
pub use cfg::HumanDur;

pub use fs::{FileEvent, FileWatcher};

pub use kv::{
    ChangeType, KvError, KvStream, Listener, LoadStrategy, Loader, LoaderError, ParseValue, Parser,
    ParserError, Serializer, SerializerError, SetOptions, Store, StoreConfig,
};
