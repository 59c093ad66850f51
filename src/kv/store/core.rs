use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// KV 存储错误类型
///
/// 所有 Store 实现（包括装饰器）对缺失的键和失败的前置条件返回相同的错误。
#[derive(Error, Debug)]
pub enum KvError {
    #[error("Key not found")]
    KeyNotFound,

    #[error("Condition failed")]
    ConditionFailed,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store closed")]
    StoreClosed,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Load failed: {0}")]
    LoadFailed(String),
}

impl KvError {
    /// 是否为前置条件类错误，这类错误不会被自动重试或吞掉
    pub fn is_precondition(&self) -> bool {
        matches!(self, KvError::ConditionFailed | KvError::InvalidArgument(_))
    }
}

/// 单次调用的设置选项
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SetOptions {
    /// 过期时间，不支持过期的后端会忽略该选项
    pub expiration: Option<Duration>,
    /// 仅在键不存在时设置
    pub if_not_exist: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_if_not_exist(mut self) -> Self {
        self.if_not_exist = true;
        self
    }
}

/// 核心 KV 存储 trait
///
/// 原始后端和装饰器实现同一套接口，因此装饰器可以任意嵌套。
/// 调用方丢弃返回的 future 即取消该次调用。
#[async_trait]
pub trait Store<K, V>: Send + Sync
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// 设置键值对，`if_not_exist` 时键已存在返回 `ConditionFailed` 且不修改原值
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError>;

    /// 获取键对应的值，键不存在时返回 `KeyNotFound`
    async fn get(&self, key: &K) -> Result<V, KvError>;

    /// 删除键，键不存在时也返回成功
    async fn del(&self, key: &K) -> Result<(), KvError>;

    /// 批量设置，keys 与 vals 长度不一致时返回 `InvalidArgument`，不写入任何数据
    async fn batch_set(
        &self,
        keys: &[K],
        vals: &[V],
        options: &SetOptions,
    ) -> Result<Vec<Result<(), KvError>>, KvError>;

    /// 批量获取，每个键对应一个结果
    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError>;

    /// 批量删除，每个键对应一个结果
    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError>;

    /// 关闭存储，重复调用不会 panic
    async fn close(&self) -> Result<(), KvError>;
}

/// 校验批量设置的参数长度
pub(crate) fn check_batch_len<K, V>(keys: &[K], vals: &[V]) -> Result<(), KvError> {
    if keys.len() != vals.len() {
        return Err(KvError::InvalidArgument(format!(
            "keys and values length mismatch: {} != {}",
            keys.len(),
            vals.len()
        )));
    }
    Ok(())
}
