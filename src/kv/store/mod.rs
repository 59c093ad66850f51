pub mod builder;
pub mod core;
pub mod loadable_store;
pub mod map_store;
pub mod observable_store;
pub mod redis_store;
pub mod slice_map_store;
pub mod sync_map_store;
pub mod tiered_store;

// 重新导出核心类型和 trait
pub use core::{KvError, SetOptions, Store};
// 重新导出后端实现
pub use map_store::{MapStore, MapStoreConfig};
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use slice_map_store::{SliceMapStore, SliceMapStoreConfig};
pub use sync_map_store::{SyncMapStore, SyncMapStoreConfig};
// 重新导出装饰器
pub use loadable_store::{LoadableStore, LoadableStoreConfig, StoreFactory};
pub use observable_store::{
    global_registry, LogObserver, MetricsObserver, ObservableStore, ObservableStoreConfig, Observer,
};
pub use tiered_store::{TieredStore, TieredStoreConfig, WritePolicy};
// 重新导出配置构建
pub use builder::{StoreConfig, StoreKey, StoreValue};
