use async_trait::async_trait;
use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::core::{check_batch_len, KvError, SetOptions, Store};

/// SliceMapStore 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, SmartDefault, Validate)]
#[serde(default)]
pub struct SliceMapStoreConfig {
    /// 初始槽位容量
    #[garde(skip)]
    pub initial_capacity: Option<usize>,
}

/// 槽位表：值连续存放在 `slots` 中，`index` 记录键到槽位的映射，
/// 删除后空出的槽位进入 `free` 供后续写入复用
struct Slab<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<V>>,
    free: Vec<usize>,
}

impl<K, V> Slab<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.index
            .get(key)
            .and_then(|&slot| self.slots.get(slot))
            .and_then(|value| value.as_ref())
    }

    fn insert(&mut self, key: &K, value: &V, if_not_exist: bool) -> Result<(), KvError> {
        if let Some(&slot) = self.index.get(key) {
            if if_not_exist {
                return Err(KvError::ConditionFailed);
            }
            self.slots[slot] = Some(value.clone());
            return Ok(());
        }

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(value.clone());
                slot
            }
            None => {
                self.slots.push(Some(value.clone()));
                self.slots.len() - 1
            }
        };
        self.index.insert(key.clone(), slot);
        Ok(())
    }

    fn remove(&mut self, key: &K) {
        if let Some(slot) = self.index.remove(key) {
            self.slots[slot] = None;
            self.free.push(slot);
        }
    }
}

/// 槽位索引的内存 KV 存储
///
/// 值存放在连续的 Vec 中，删除产生的空槽通过空闲链表复用，
/// 索引、槽位和空闲链表由同一把读写锁保护。不支持过期时间。
pub struct SliceMapStore<K, V> {
    slab: RwLock<Slab<K, V>>,
}

impl<K, V> SliceMapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    pub fn new(config: SliceMapStoreConfig) -> Self {
        Self {
            slab: RwLock::new(Slab::with_capacity(config.initial_capacity.unwrap_or(0))),
        }
    }

    pub fn len(&self) -> usize {
        self.slab.read().map(|s| s.index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 已分配的槽位数（包括空闲槽位）
    pub fn slot_count(&self) -> usize {
        self.slab.read().map(|s| s.slots.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Slab<K, V>>, KvError> {
        self.slab
            .read()
            .map_err(|e| KvError::Backend(format!("slab lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Slab<K, V>>, KvError> {
        self.slab
            .write()
            .map_err(|e| KvError::Backend(format!("slab lock poisoned: {}", e)))
    }
}

impl<K, V> Default for SliceMapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new(SliceMapStoreConfig::default())
    }
}

#[async_trait]
impl<K, V> Store<K, V> for SliceMapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        self.write()?.insert(key, value, options.if_not_exist)
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

        let mut slab = self.write()?;
        Ok(keys
            .iter()
            .zip(vals.iter())
            .map(|(key, value)| slab.insert(key, value, options.if_not_exist))
            .collect())
    }

    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError> {
        let slab = self.read()?;
        Ok(keys
            .iter()
            .map(|key| slab.get(key).cloned().ok_or(KvError::KeyNotFound))
            .collect())
    }

    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError> {
        let mut slab = self.write()?;
        Ok(keys
            .iter()
            .map(|key| {
                slab.remove(key);
                Ok(())
            })
            .collect())
    }

    async fn close(&self) -> Result<(), KvError> {
        Ok(())
    }
}

impl<K, V> From<SliceMapStoreConfig> for SliceMapStore<K, V>
where
    K: Clone + Send + Sync + Eq + Hash,
    V: Clone + Send + Sync,
{
    fn from(config: SliceMapStoreConfig) -> Self {
        SliceMapStore::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::store::common_tests::*;

    #[tokio::test]
    async fn test_store_set() {
        test_set(SliceMapStore::<String, String>::default()).await;
    }

    #[tokio::test]
    async fn test_store_get() {
        test_get(SliceMapStore::<String, String>::default()).await;
    }

    #[tokio::test]
    async fn test_store_del() {
        test_del(SliceMapStore::<String, String>::default()).await;
    }

    #[tokio::test]
    async fn test_store_batch_set() {
        test_batch_set(SliceMapStore::<String, i32>::default()).await;
    }

    #[tokio::test]
    async fn test_store_batch_get() {
        test_batch_get(SliceMapStore::<String, i32>::default()).await;
    }

    #[tokio::test]
    async fn test_store_batch_del() {
        test_batch_del(SliceMapStore::<String, i32>::default()).await;
    }

    #[tokio::test]
    async fn test_store_close() {
        test_close(SliceMapStore::<String, i32>::default()).await;
    }

    #[tokio::test]
    async fn test_free_slots_are_reused() {
        let store = SliceMapStore::<String, i32>::default();
        let options = SetOptions::new();

        for i in 0..4 {
            store.set(&format!("k{}", i), &i, &options).await.unwrap();
        }
        assert_eq!(store.slot_count(), 4);

        store.del(&"k1".to_string()).await.unwrap();
        store.del(&"k2".to_string()).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.slot_count(), 4);

        store.set(&"k4".to_string(), &4, &options).await.unwrap();
        store.set(&"k5".to_string(), &5, &options).await.unwrap();
        assert_eq!(store.slot_count(), 4);

        store.set(&"k6".to_string(), &6, &options).await.unwrap();
        assert_eq!(store.slot_count(), 5);

        assert_eq!(store.get(&"k0".to_string()).await.unwrap(), 0);
        assert_eq!(store.get(&"k3".to_string()).await.unwrap(), 3);
        assert_eq!(store.get(&"k4".to_string()).await.unwrap(), 4);
        assert_eq!(store.get(&"k5".to_string()).await.unwrap(), 5);
        assert_eq!(store.get(&"k6".to_string()).await.unwrap(), 6);
        assert!(matches!(
            store.get(&"k1".to_string()).await,
            Err(KvError::KeyNotFound)
        ));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_slot() {
        let store = SliceMapStore::<String, String>::default();
        let key = "k".to_string();

        store.set(&key, &"v1".to_string(), &SetOptions::new()).await.unwrap();
        store.set(&key, &"v2".to_string(), &SetOptions::new()).await.unwrap();

        assert_eq!(store.slot_count(), 1);
        assert_eq!(store.get(&key).await.unwrap(), "v2");
    }
}
