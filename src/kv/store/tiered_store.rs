//! 多级缓存 Store
//!
//! 多个 store 按优先级排列组成一个逻辑 store，第 0 级最快。
//! 写策略决定 set 需要等待哪些层级，读提升决定下层命中后是否回填上层。

use async_trait::async_trait;
use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::sync::Arc;

use super::builder::{StoreConfig, StoreKey, StoreValue};
use super::core::{check_batch_len, KvError, SetOptions, Store};

/// 写策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// 依次同步写入所有层级
    #[default]
    WriteThrough,
    /// 同步写入第 0 级，其余层级在后台写入，失败不重试
    WriteBack,
}

/// TieredStore 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, SmartDefault, Validate)]
#[serde(default)]
pub struct TieredStoreConfig {
    /// 层级配置，第 0 级优先级最高
    #[garde(length(min = 1))]
    pub tiers: Vec<StoreConfig>,

    #[garde(skip)]
    pub write_policy: WritePolicy,

    /// 下层命中时是否回填上层
    #[default = true]
    #[garde(skip)]
    pub promote: bool,
}

/// 多级缓存 Store
pub struct TieredStore<K, V> {
    tiers: Vec<Arc<dyn Store<K, V>>>,
    write_policy: WritePolicy,
    promote: bool,
}

impl<K, V> TieredStore<K, V>
where
    K: StoreKey,
    V: StoreValue,
{
    pub fn new(config: TieredStoreConfig) -> Result<Self, KvError> {
        config
            .validate()
            .map_err(|e| KvError::InvalidArgument(format!("invalid TieredStore config: {}", e)))?;

        let tiers = config
            .tiers
            .iter()
            .map(|tier| tier.build::<K, V>())
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_parts(tiers, config.write_policy, config.promote)
    }
}

impl<K, V> TieredStore<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// 从已构建的层级创建，层级列表不能为空
    pub fn from_parts(
        tiers: Vec<Arc<dyn Store<K, V>>>,
        write_policy: WritePolicy,
        promote: bool,
    ) -> Result<Self, KvError> {
        if tiers.is_empty() {
            return Err(KvError::InvalidArgument(
                "tiered store requires at least one tier".to_string(),
            ));
        }

        Ok(Self {
            tiers,
            write_policy,
            promote,
        })
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    async fn write_through(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        let mut last_err = None;
        let mut failed = 0;

        for (i, tier) in self.tiers.iter().enumerate() {
            match tier.set(key, value, options).await {
                Ok(()) => {}
                // 条件失败时后续层级不再写入
                Err(KvError::ConditionFailed) => return Err(KvError::ConditionFailed),
                Err(e) => {
                    log::warn!("tiered store set failed: tier={}, error={}", i, e);
                    failed += 1;
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if failed == self.tiers.len() => Err(e),
            _ => Ok(()),
        }
    }

    async fn write_back(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        self.tiers[0].set(key, value, options).await?;

        if self.tiers.len() > 1 {
            let lower: Vec<_> = self.tiers[1..].to_vec();
            let key = key.clone();
            let value = value.clone();
            // 第 0 级已经判定过条件，下层可能残留旧值，直接覆盖
            let options = SetOptions {
                if_not_exist: false,
                ..options.clone()
            };

            tokio::spawn(async move {
                for (i, tier) in lower.iter().enumerate() {
                    if let Err(e) = tier.set(&key, &value, &options).await {
                        log::warn!("tiered store write back failed: tier={}, error={}", i + 1, e);
                    }
                }
            });
        }

        Ok(())
    }

    /// 把第 `hit` 级命中的值后台回填到 `0..hit` 级
    fn promote_to_upper(&self, hit: usize, key: &K, value: &V) {
        let upper: Vec<_> = self.tiers[..hit].to_vec();
        let key = key.clone();
        let value = value.clone();

        tokio::spawn(async move {
            for (i, tier) in upper.iter().enumerate() {
                if let Err(e) = tier.set(&key, &value, &SetOptions::new()).await {
                    log::debug!("tiered store promote failed: tier={}, error={}", i, e);
                }
            }
        });
    }
}

#[async_trait]
impl<K, V> Store<K, V> for TieredStore<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        match self.write_policy {
            WritePolicy::WriteThrough => self.write_through(key, value, options).await,
            WritePolicy::WriteBack => self.write_back(key, value, options).await,
        }
    }

    async fn get(&self, key: &K) -> Result<V, KvError> {
        let mut last_err = None;

        for (i, tier) in self.tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(value) => {
                    if self.promote && i > 0 {
                        self.promote_to_upper(i, key, &value);
                    }
                    return Ok(value);
                }
                Err(KvError::KeyNotFound) => {}
                Err(e) => {
                    log::warn!("tiered store get failed: tier={}, error={}", i, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(KvError::KeyNotFound))
    }

    async fn del(&self, key: &K) -> Result<(), KvError> {
        let mut last_err = None;

        for (i, tier) in self.tiers.iter().enumerate() {
            if let Err(e) = tier.del(key).await {
                log::warn!("tiered store del failed: tier={}, error={}", i, e);
                last_err = Some(e);
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn batch_set(
        &self,
        keys: &[K],
        vals: &[V],
        options: &SetOptions,
    ) -> Result<Vec<Result<(), KvError>>, KvError> {
        check_batch_len(keys, vals)?;

        let mut results = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(vals.iter()) {
            results.push(self.set(key, value, options).await);
        }
        Ok(results)
    }

    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(key).await);
        }
        Ok(results)
    }

    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.del(key).await);
        }
        Ok(results)
    }

    async fn close(&self) -> Result<(), KvError> {
        let mut last_err = None;

        for (i, tier) in self.tiers.iter().enumerate() {
            if let Err(e) = tier.close().await {
                log::warn!("tiered store close failed: tier={}, error={}", i, e);
                last_err = Some(e);
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
