use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::hash::Hash;

use super::core::{check_batch_len, KvError, SetOptions, Store};

/// SyncMapStore 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, SmartDefault, Validate)]
#[serde(default)]
pub struct SyncMapStoreConfig {
    /// 初始容量（可选）
    #[garde(skip)]
    pub initial_capacity: Option<usize>,

    /// 分片数量（可选，必须是 2 的幂）
    #[garde(custom(validate_shard_amount))]
    pub shard_amount: Option<usize>,
}

fn validate_shard_amount(value: &Option<usize>, _ctx: &()) -> garde::Result {
    match value {
        Some(n) if *n < 2 || !n.is_power_of_two() => Err(garde::Error::new(
            "shard_amount must be a power of two greater than 1",
        )),
        _ => Ok(()),
    }
}

/// 基于 DashMap 的分片并发 KV 存储
///
/// 读写按分片加锁，适合高并发场景。不支持过期时间。
pub struct SyncMapStore<K, V>
where
    K: Eq + Hash,
{
    map: DashMap<K, V>,
}

impl<K, V> SyncMapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    pub fn new(config: SyncMapStoreConfig) -> Result<Self, KvError> {
        config
            .validate()
            .map_err(|e| KvError::InvalidArgument(format!("invalid SyncMapStore config: {}", e)))?;

        let capacity = config.initial_capacity.unwrap_or(0);
        let map = match config.shard_amount {
            Some(shards) => DashMap::with_capacity_and_shard_amount(capacity, shards),
            None => DashMap::with_capacity(capacity),
        };

        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn set_one(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        if !options.if_not_exist {
            self.map.insert(key.clone(), value.clone());
            return Ok(());
        }

        // entry 持有分片写锁，检查与插入是原子的
        match self.map.entry(key.clone()) {
            Entry::Occupied(_) => Err(KvError::ConditionFailed),
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
                Ok(())
            }
        }
    }
}

impl<K, V> Default for SyncMapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self {
            map: DashMap::new(),
        }
    }
}

#[async_trait]
impl<K, V> Store<K, V> for SyncMapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        self.set_one(key, value, options)
    }

    async fn get(&self, key: &K) -> Result<V, KvError> {
        match self.map.get(key) {
            Some(value_ref) => Ok(value_ref.value().clone()),
            None => Err(KvError::KeyNotFound),
        }
    }

    async fn del(&self, key: &K) -> Result<(), KvError> {
        self.map.remove(key);
        Ok(())
    }

    async fn batch_set(
        &self,
        keys: &[K],
        vals: &[V],
        options: &SetOptions,
    ) -> Result<Vec<Result<(), KvError>>, KvError> {
        check_batch_len(keys, vals)?;

        Ok(keys
            .iter()
            .zip(vals.iter())
            .map(|(key, value)| self.set_one(key, value, options))
            .collect())
    }

    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError> {
        Ok(keys
            .iter()
            .map(|key| match self.map.get(key) {
                Some(value_ref) => Ok(value_ref.value().clone()),
                None => Err(KvError::KeyNotFound),
            })
            .collect())
    }

    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError> {
        Ok(keys
            .iter()
            .map(|key| {
                self.map.remove(key);
                Ok(())
            })
            .collect())
    }

    async fn close(&self) -> Result<(), KvError> {
        Ok(())
    }
}
