use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;

use super::core::{KvError, Store};
use super::{
    MapStore, MapStoreConfig, ObservableStore, ObservableStoreConfig, RedisStore,
    RedisStoreConfig, SliceMapStore, SliceMapStoreConfig, SyncMapStore, SyncMapStoreConfig,
    TieredStore, TieredStoreConfig,
};

/// 可以通过 [`StoreConfig`] 构建的 store 的键类型
pub trait StoreKey: Serialize + DeserializeOwned + Eq + Hash + Clone + Send + Sync + 'static {}

impl<T> StoreKey for T where T: Serialize + DeserializeOwned + Eq + Hash + Clone + Send + Sync + 'static
{}

/// 可以通过 [`StoreConfig`] 构建的 store 的值类型
pub trait StoreValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Store 配置
///
/// ```json
/// {
///     "type": "TieredStore",
///     "options": {
///         "tiers": [
///             { "type": "MapStore", "options": {} },
///             { "type": "RedisStore", "options": { "endpoint": "localhost:6379" } }
///         ],
///         "write_policy": "write_through",
///         "promote": true
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options")]
pub enum StoreConfig {
    MapStore(MapStoreConfig),
    SyncMapStore(SyncMapStoreConfig),
    SliceMapStore(SliceMapStoreConfig),
    RedisStore(RedisStoreConfig),
    TieredStore(TieredStoreConfig),
    ObservableStore(ObservableStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::MapStore(MapStoreConfig::default())
    }
}

impl StoreConfig {
    /// 按配置构建 store，装饰器配置会递归构建内层 store
    pub fn build<K, V>(&self) -> Result<Arc<dyn Store<K, V>>, KvError>
    where
        K: StoreKey,
        V: StoreValue,
    {
        let store: Arc<dyn Store<K, V>> = match self {
            StoreConfig::MapStore(config) => Arc::new(MapStore::new(config.clone())),
            StoreConfig::SyncMapStore(config) => Arc::new(SyncMapStore::new(config.clone())?),
            StoreConfig::SliceMapStore(config) => Arc::new(SliceMapStore::new(config.clone())),
            StoreConfig::RedisStore(config) => Arc::new(RedisStore::new(config.clone())?),
            StoreConfig::TieredStore(config) => Arc::new(TieredStore::new(config.clone())?),
            StoreConfig::ObservableStore(config) => {
                Arc::new(ObservableStore::new(config.clone())?)
            }
        };
        Ok(store)
    }

    /// 配置的类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreConfig::MapStore(_) => "MapStore",
            StoreConfig::SyncMapStore(_) => "SyncMapStore",
            StoreConfig::SliceMapStore(_) => "SliceMapStore",
            StoreConfig::RedisStore(_) => "RedisStore",
            StoreConfig::TieredStore(_) => "TieredStore",
            StoreConfig::ObservableStore(_) => "ObservableStore",
        }
    }
}
