use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::{KvFileLoader, KvFileLoaderConfig};
use crate::kv::parser::{ChangeType, ParseValue, ParserError};
use crate::kv::store::KvError;

/// 加载策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// 增量更新，直接在当前 store 上 set/del
    #[default]
    #[serde(alias = "inplace")]
    InPlace,
    /// 全量替换，新建 store 加载完数据后原子替换旧 store
    Replace,
}

/// 加载器相关错误
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("Store error: {0}")]
    Store(#[from] KvError),

    #[error("Watcher error: {0}")]
    Watcher(String),
}

/// 处理单条变更记录返回的 future
pub type HandlerFuture = BoxFuture<'static, Result<(), LoaderError>>;

/// KV 数据流：一次性、不可重放的 `(ChangeType, K, V)` 序列
#[async_trait]
pub trait KvStream<K, V>: Send + Sync {
    /// 按顺序对每条记录调用 handler，handler 出错时停止遍历并返回错误
    async fn each(
        &self,
        handler: &mut (dyn FnMut(ChangeType, K, V) -> HandlerFuture + Send),
    ) -> Result<(), LoaderError>;
}

/// 监听器：消费一个数据流
pub type Listener<K, V> =
    Arc<dyn Fn(Arc<dyn KvStream<K, V>>) -> HandlerFuture + Send + Sync>;

/// 加载器：推送数据源的全量和增量变更
#[async_trait]
pub trait Loader<K, V>: Send + Sync {
    /// 注册监听器
    ///
    /// 注册时立即用当前全量数据调用一次监听器并返回其结果，
    /// 之后数据源每次变化都会在后台再次调用
    async fn on_change(&mut self, listener: Listener<K, V>) -> Result<(), LoaderError>;

    /// 停止监听，之后不再调用监听器
    async fn close(&mut self) -> Result<(), LoaderError>;
}

/// 加载器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options")]
pub enum LoaderConfig {
    KvFileLoader(KvFileLoaderConfig),
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig::KvFileLoader(KvFileLoaderConfig::default())
    }
}

impl LoaderConfig {
    pub fn build<K, V>(&self) -> Result<Box<dyn Loader<K, V>>, LoaderError>
    where
        K: ParseValue + Clone + Send + Sync + 'static,
        V: ParseValue + Clone + Send + Sync + 'static,
    {
        match self {
            LoaderConfig::KvFileLoader(config) => Ok(Box::new(KvFileLoader::new(config.clone())?)),
        }
    }
}
