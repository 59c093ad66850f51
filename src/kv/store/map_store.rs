use async_trait::async_trait;
use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::core::{check_batch_len, KvError, SetOptions, Store};

/// MapStore 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, SmartDefault, Validate)]
#[serde(default)]
pub struct MapStoreConfig {
    /// 初始容量（可选）
    #[garde(skip)]
    pub initial_capacity: Option<usize>,
}

/// 基于 `RwLock<HashMap>` 的内存 KV 存储
///
/// 不支持过期时间，`expiration` 选项会被忽略。
pub struct MapStore<K, V> {
    map: RwLock<HashMap<K, V>>,
}

impl<K, V> MapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    pub fn new(config: MapStoreConfig) -> Self {
        let map = match config.initial_capacity {
            Some(capacity) => HashMap::with_capacity(capacity),
            None => HashMap::new(),
        };

        Self {
            map: RwLock::new(map),
        }
    }

    /// 当前键数量
    pub fn len(&self) -> usize {
        self.map.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<K, V>>, KvError> {
        self.map
            .read()
            .map_err(|e| KvError::Backend(format!("map lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<K, V>>, KvError> {
        self.map
            .write()
            .map_err(|e| KvError::Backend(format!("map lock poisoned: {}", e)))
    }
}

impl<K, V> Default for MapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new(MapStoreConfig::default())
    }
}

#[async_trait]
impl<K, V> Store<K, V> for MapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        let mut map = self.write()?;

        if options.if_not_exist && map.contains_key(key) {
            return Err(KvError::ConditionFailed);
        }

        map.insert(key.clone(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &K) -> Result<V, KvError> {
        self.read()?.get(key).cloned().ok_or(KvError::KeyNotFound)
    }

    async fn del(&self, key: &K) -> Result<(), KvError> {
        self.write()?.remove(key);
        Ok(())
    }

    async fn batch_set(
        &self,
        keys: &[K],
        vals: &[V],
        options: &SetOptions,
    ) -> Result<Vec<Result<(), KvError>>, KvError> {
        check_batch_len(keys, vals)?;

        let mut map = self.write()?;
        let mut results = Vec::with_capacity(keys.len());

        for (key, value) in keys.iter().zip(vals.iter()) {
            if options.if_not_exist && map.contains_key(key) {
                results.push(Err(KvError::ConditionFailed));
                continue;
            }

            map.insert(key.clone(), value.clone());
            results.push(Ok(()));
        }

        Ok(results)
    }

    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError> {
        let map = self.read()?;
        Ok(keys
            .iter()
            .map(|key| map.get(key).cloned().ok_or(KvError::KeyNotFound))
            .collect())
    }

    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError> {
        let mut map = self.write()?;
        Ok(keys
            .iter()
            .map(|key| {
                map.remove(key);
                Ok(())
            })
            .collect())
    }

    async fn close(&self) -> Result<(), KvError> {
        // 内存存储没有需要释放的外部资源，数据保留
        Ok(())
    }
}

impl<K, V> From<MapStoreConfig> for MapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    fn from(config: MapStoreConfig) -> Self {
        MapStore::new(config)
    }
}
