use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::kv::loader::core::{HandlerFuture, KvStream, Listener, Loader, LoaderError};
use crate::kv::parser::ChangeType;

/// 内存数据流
#[derive(Debug, Clone)]
pub struct MemoryStream<K, V> {
    records: Vec<(ChangeType, K, V)>,
}

impl<K, V> Default for MemoryStream<K, V> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<K, V> MemoryStream<K, V> {
    pub fn new(records: Vec<(ChangeType, K, V)>) -> Self {
        Self { records }
    }

    /// 全部记录均为 Add 的快照
    pub fn snapshot(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::new(
            entries
                .into_iter()
                .map(|(k, v)| (ChangeType::Add, k, v))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K, V> FromIterator<(ChangeType, K, V)> for MemoryStream<K, V> {
    fn from_iter<I: IntoIterator<Item = (ChangeType, K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl<K, V> KvStream<K, V> for MemoryStream<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn each(
        &self,
        handler: &mut (dyn FnMut(ChangeType, K, V) -> HandlerFuture + Send),
    ) -> Result<(), LoaderError> {
        for (change_type, key, value) in &self.records {
            handler(*change_type, key.clone(), value.clone()).await?;
        }
        Ok(())
    }
}

/// 由调用方主动推送变更的加载器
///
/// `on_change` 时推送初始快照，之后通过 [`MemoryNotifier`] 推送新的数据流。
pub struct MemoryLoader<K, V> {
    initial: MemoryStream<K, V>,
    listener: Arc<Mutex<Option<Listener<K, V>>>>,
}

/// MemoryLoader 的推送端，可以在加载器交给 store 之后继续使用
#[derive(Clone)]
pub struct MemoryNotifier<K, V> {
    listener: Arc<Mutex<Option<Listener<K, V>>>>,
}

impl<K, V> MemoryLoader<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(initial: MemoryStream<K, V>) -> Self {
        Self {
            initial,
            listener: Arc::new(Mutex::new(None)),
        }
    }

    pub fn notifier(&self) -> MemoryNotifier<K, V> {
        MemoryNotifier {
            listener: self.listener.clone(),
        }
    }
}

impl<K, V> MemoryNotifier<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// 把数据流交给监听器并等待处理完成，加载器关闭后为空操作
    pub async fn notify(&self, stream: MemoryStream<K, V>) -> Result<(), LoaderError> {
        let listener = self
            .listener
            .lock()
            .map_err(|e| LoaderError::LoadFailed(format!("listener lock poisoned: {}", e)))?
            .clone();

        match listener {
            Some(listener) => listener(Arc::new(stream)).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<K, V> Loader<K, V> for MemoryLoader<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn on_change(&mut self, listener: Listener<K, V>) -> Result<(), LoaderError> {
        listener(Arc::new(self.initial.clone())).await?;
        *self
            .listener
            .lock()
            .map_err(|e| LoaderError::LoadFailed(format!("listener lock poisoned: {}", e)))? =
            Some(listener);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LoaderError> {
        if let Ok(mut listener) = self.listener.lock() {
            listener.take();
        }
        Ok(())
    }
}
