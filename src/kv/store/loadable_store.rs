//! 可热加载的 Store 装饰器
//!
//! 通过 Loader 监听外部数据源，支持两种加载策略：
//! - InPlace: 增量更新，直接在当前 store 上 set/del
//! - Replace: 全量替换，新建 store 加载完数据后原子替换旧 store，
//!   旧 store 延迟 `close_delay` 后关闭

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use smart_default::SmartDefault;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};

use super::builder::{StoreConfig, StoreKey, StoreValue};
use super::core::{KvError, SetOptions, Store};
use crate::cfg::HumanDur;
use crate::kv::loader::{HandlerFuture, KvStream, Listener, LoadStrategy, Loader, LoaderConfig, LoaderError};
use crate::kv::parser::{ChangeType, ParseValue};

/// LoadableStore 配置
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, SmartDefault)]
#[serde(default)]
pub struct LoadableStoreConfig {
    /// 底层 store 配置，Replace 策略每次加载都按该配置新建
    pub store: StoreConfig,

    pub loader: LoaderConfig,

    /// 加载策略: "in_place" 或 "replace"
    pub load_strategy: LoadStrategy,

    /// 被替换的 store 延迟关闭的时间，留给进行中的调用
    #[serde_as(as = "HumanDur")]
    #[default(Duration::from_secs(1))]
    pub close_delay: Duration,
}

/// 新建底层 store 的工厂
pub type StoreFactory<K, V> = Arc<dyn Fn() -> Result<Arc<dyn Store<K, V>>, KvError> + Send + Sync>;

struct Shared<K, V> {
    current: ArcSwap<Arc<dyn Store<K, V>>>,
    /// Replace 策略下每次调用持有读锁，替换指针时持有写锁
    swap_gate: RwLock<()>,
    factory: StoreFactory<K, V>,
    load_strategy: LoadStrategy,
    close_delay: Duration,
    closed: AtomicBool,
}

/// 可热加载的 Store 装饰器
pub struct LoadableStore<K, V> {
    shared: Arc<Shared<K, V>>,
    loader: Mutex<Box<dyn Loader<K, V>>>,
}

impl<K, V> LoadableStore<K, V>
where
    K: StoreKey + ParseValue,
    V: StoreValue + ParseValue,
{
    /// 按配置创建，返回前完成第一次全量加载
    pub async fn new(config: LoadableStoreConfig) -> Result<Self, KvError> {
        let store_config = config.store.clone();
        let factory: StoreFactory<K, V> = Arc::new(move || store_config.build::<K, V>());

        let loader = config
            .loader
            .build::<K, V>()
            .map_err(|e| KvError::InvalidArgument(format!("invalid loader config: {}", e)))?;

        Self::from_parts(factory, loader, config.load_strategy, config.close_delay).await
    }
}

impl<K, V> LoadableStore<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// 从工厂和加载器创建，返回前完成第一次全量加载，加载失败时返回 `LoadFailed`
    pub async fn from_parts(
        factory: StoreFactory<K, V>,
        mut loader: Box<dyn Loader<K, V>>,
        load_strategy: LoadStrategy,
        close_delay: Duration,
    ) -> Result<Self, KvError> {
        let initial = factory()?;
        let shared = Arc::new(Shared {
            current: ArcSwap::from_pointee(initial),
            swap_gate: RwLock::new(()),
            factory,
            load_strategy,
            close_delay,
            closed: AtomicBool::new(false),
        });

        if let Err(e) = loader.on_change(Shared::listener(&shared)).await {
            shared.closed.store(true, Ordering::SeqCst);
            if let Err(e) = loader.close().await {
                log::warn!("failed to close loader: {}", e);
            }
            if let Err(e) = shared.current_store().close().await {
                log::warn!("failed to close store: {}", e);
            }
            return Err(KvError::LoadFailed(e.to_string()));
        }

        Ok(Self {
            shared,
            loader: Mutex::new(loader),
        })
    }

    pub fn load_strategy(&self) -> LoadStrategy {
        self.shared.load_strategy
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// 进入一次调用：检查关闭状态，Replace 策略下持有读锁直到调用结束
    async fn enter(&self) -> Result<(Option<RwLockReadGuard<'_, ()>>, Arc<dyn Store<K, V>>), KvError> {
        if self.is_closed() {
            return Err(KvError::StoreClosed);
        }

        let gate = match self.shared.load_strategy {
            LoadStrategy::Replace => Some(self.shared.swap_gate.read().await),
            LoadStrategy::InPlace => None,
        };

        // 排在 close 之后拿到读锁时，store 已被关闭
        if self.is_closed() {
            return Err(KvError::StoreClosed);
        }

        Ok((gate, self.shared.current_store()))
    }
}

impl<K, V> Shared<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn current_store(&self) -> Arc<dyn Store<K, V>> {
        (**self.current.load()).clone()
    }

    fn listener(shared: &Arc<Self>) -> Listener<K, V> {
        let shared = Arc::clone(shared);
        Arc::new(move |stream: Arc<dyn KvStream<K, V>>| -> HandlerFuture {
            let shared = Arc::clone(&shared);
            Box::pin(async move { shared.handle_change(stream).await })
        })
    }

    async fn handle_change(&self, stream: Arc<dyn KvStream<K, V>>) -> Result<(), LoaderError> {
        if self.closed.load(Ordering::SeqCst) {
            log::debug!("store closed, change ignored");
            return Ok(());
        }

        match self.load_strategy {
            LoadStrategy::InPlace => self.apply_in_place(stream).await,
            LoadStrategy::Replace => self.apply_replace(stream).await,
        }
    }

    async fn apply_in_place(&self, stream: Arc<dyn KvStream<K, V>>) -> Result<(), LoaderError> {
        let store = self.current_store();

        stream
            .each(&mut |change_type, key, value| -> HandlerFuture {
                let store = Arc::clone(&store);
                Box::pin(async move {
                    match change_type {
                        ChangeType::Add | ChangeType::Update => {
                            store.set(&key, &value, &SetOptions::new()).await?
                        }
                        ChangeType::Unknown => {
                            log::warn!("unknown change type, treated as update");
                            store.set(&key, &value, &SetOptions::new()).await?
                        }
                        ChangeType::Delete => store.del(&key).await?,
                    }
                    Ok(())
                })
            })
            .await
    }

    async fn apply_replace(&self, stream: Arc<dyn KvStream<K, V>>) -> Result<(), LoaderError> {
        let store = (self.factory)()?;

        let result = stream
            .each(&mut |change_type, key, value| -> HandlerFuture {
                let store = Arc::clone(&store);
                Box::pin(async move {
                    match change_type {
                        // 快照中不存在的键不写入即可
                        ChangeType::Delete => {}
                        ChangeType::Unknown => {
                            log::warn!("unknown change type, treated as update");
                            store.set(&key, &value, &SetOptions::new()).await?
                        }
                        ChangeType::Add | ChangeType::Update => {
                            store.set(&key, &value, &SetOptions::new()).await?
                        }
                    }
                    Ok(())
                })
            })
            .await;

        if let Err(e) = result {
            if let Err(close_err) = store.close().await {
                log::warn!("failed to close discarded store: {}", close_err);
            }
            return Err(e);
        }

        let old = {
            let _gate = self.swap_gate.write().await;
            if self.closed.load(Ordering::SeqCst) {
                drop(_gate);
                log::debug!("store closed during reload, replacement discarded");
                store.close().await?;
                return Ok(());
            }
            self.current.swap(Arc::new(store))
        };
        log::debug!("store replaced, old store closes in {:?}", self.close_delay);

        let close_delay = self.close_delay;
        tokio::spawn(async move {
            tokio::time::sleep(close_delay).await;
            if let Err(e) = old.close().await {
                log::warn!("failed to close replaced store: {}", e);
            }
        });

        Ok(())
    }
}

#[async_trait]
impl<K, V> Store<K, V> for LoadableStore<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        let (_gate, store) = self.enter().await?;
        store.set(key, value, options).await
    }

    async fn get(&self, key: &K) -> Result<V, KvError> {
        let (_gate, store) = self.enter().await?;
        store.get(key).await
    }

    async fn del(&self, key: &K) -> Result<(), KvError> {
        let (_gate, store) = self.enter().await?;
        store.del(key).await
    }

    async fn batch_set(
        &self,
        keys: &[K],
        vals: &[V],
        options: &SetOptions,
    ) -> Result<Vec<Result<(), KvError>>, KvError> {
        let (_gate, store) = self.enter().await?;
        store.batch_set(keys, vals, options).await
    }

    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError> {
        let (_gate, store) = self.enter().await?;
        store.batch_get(keys).await
    }

    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError> {
        let (_gate, store) = self.enter().await?;
        store.batch_del(keys).await
    }

    async fn close(&self) -> Result<(), KvError> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Err(KvError::StoreClosed);
        }

        let loader_result = self.loader.lock().await.close().await;

        // 等待进行中的调用结束
        let _gate = self.shared.swap_gate.write().await;
        let store_result = self.shared.current_store().close().await;

        loader_result.map_err(|e| KvError::Backend(format!("failed to close loader: {}", e)))?;
        store_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::loader::{MemoryLoader, MemoryNotifier, MemoryStream};
    use crate::kv::store::common_tests::*;
    use crate::kv::store::observable_store::Observer;
    use crate::kv::store::{MapStore, ObservableStore, SyncMapStore};
    use serial_test::serial;
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;
    use tempfile::NamedTempFile;

    fn map_factory<V: Clone + Send + Sync + 'static>() -> StoreFactory<String, V> {
        Arc::new(|| {
            let store: Arc<dyn Store<String, V>> = Arc::new(MapStore::<String, V>::default());
            Ok::<_, KvError>(store)
        })
    }

    async fn empty_store<V: Clone + Send + Sync + 'static>(
        load_strategy: LoadStrategy,
    ) -> LoadableStore<String, V> {
        LoadableStore::from_parts(
            map_factory::<V>(),
            Box::new(MemoryLoader::new(MemoryStream::default())),
            load_strategy,
            Duration::from_millis(10),
        )
        .await
        .unwrap()
    }

    async fn seeded_store(
        load_strategy: LoadStrategy,
        entries: &[(&str, &str)],
    ) -> (LoadableStore<String, String>, MemoryNotifier<String, String>) {
        let loader = MemoryLoader::new(snapshot(entries));
        let notifier = loader.notifier();
        let store = LoadableStore::from_parts(
            map_factory::<String>(),
            Box::new(loader),
            load_strategy,
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        (store, notifier)
    }

    fn snapshot(entries: &[(&str, &str)]) -> MemoryStream<String, String> {
        MemoryStream::snapshot(entries.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    // ========== 公共测试 ==========

    #[tokio::test]
    async fn test_store_set() {
        test_set(empty_store::<String>(LoadStrategy::InPlace).await).await;
        test_set(empty_store::<String>(LoadStrategy::Replace).await).await;
    }

    #[tokio::test]
    async fn test_store_get() {
        test_get(empty_store::<String>(LoadStrategy::InPlace).await).await;
        test_get(empty_store::<String>(LoadStrategy::Replace).await).await;
    }

    #[tokio::test]
    async fn test_store_del() {
        test_del(empty_store::<String>(LoadStrategy::InPlace).await).await;
        test_del(empty_store::<String>(LoadStrategy::Replace).await).await;
    }

    #[tokio::test]
    async fn test_store_batch_set() {
        test_batch_set(empty_store::<i32>(LoadStrategy::InPlace).await).await;
        test_batch_set(empty_store::<i32>(LoadStrategy::Replace).await).await;
    }

    #[tokio::test]
    async fn test_store_batch_get() {
        test_batch_get(empty_store::<i32>(LoadStrategy::InPlace).await).await;
        test_batch_get(empty_store::<i32>(LoadStrategy::Replace).await).await;
    }

    #[tokio::test]
    async fn test_store_batch_del() {
        test_batch_del(empty_store::<i32>(LoadStrategy::InPlace).await).await;
        test_batch_del(empty_store::<i32>(LoadStrategy::Replace).await).await;
    }

    #[tokio::test]
    async fn test_store_close() {
        test_close(empty_store::<i32>(LoadStrategy::InPlace).await).await;
        test_close(empty_store::<i32>(LoadStrategy::Replace).await).await;
    }

    // ========== 场景测试 ==========

    #[tokio::test]
    async fn test_replace_drops_missing_and_runtime_keys() {
        let (store, notifier) =
            seeded_store(LoadStrategy::Replace, &[("k1", "v1"), ("k2", "v2")]).await;
        assert_eq!(store.get(&"k1".to_string()).await.unwrap(), "v1");
        assert_eq!(store.get(&"k2".to_string()).await.unwrap(), "v2");

        let runtime_key = "runtime_key".to_string();
        store
            .set(&runtime_key, &"runtime".to_string(), &SetOptions::new())
            .await
            .unwrap();

        notifier.notify(snapshot(&[("k1", "v1_new")])).await.unwrap();

        assert_eq!(store.get(&"k1".to_string()).await.unwrap(), "v1_new");
        assert!(matches!(
            store.get(&"k2".to_string()).await,
            Err(KvError::KeyNotFound)
        ));
        assert!(matches!(store.get(&runtime_key).await, Err(KvError::KeyNotFound)));
    }

    #[tokio::test]
    async fn test_replace_ignores_delete_records() {
        let (store, notifier) = seeded_store(LoadStrategy::Replace, &[]).await;

        let stream: MemoryStream<String, String> = vec![
            (ChangeType::Add, "a".to_string(), "1".to_string()),
            (ChangeType::Delete, "a".to_string(), String::new()),
            (ChangeType::Unknown, "b".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();
        notifier.notify(stream).await.unwrap();

        assert_eq!(store.get(&"a".to_string()).await.unwrap(), "1");
        assert_eq!(store.get(&"b".to_string()).await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_in_place_applies_delta() {
        let (store, notifier) =
            seeded_store(LoadStrategy::InPlace, &[("k1", "v1"), ("k2", "v2"), ("k3", "v3")]).await;

        let runtime_key = "runtime_key".to_string();
        store
            .set(&runtime_key, &"runtime".to_string(), &SetOptions::new())
            .await
            .unwrap();

        let stream: MemoryStream<String, String> = vec![
            (ChangeType::Update, "k1".to_string(), "v1_new".to_string()),
            (ChangeType::Delete, "k2".to_string(), String::new()),
            (ChangeType::Unknown, "k4".to_string(), "v4".to_string()),
        ]
        .into_iter()
        .collect();
        notifier.notify(stream).await.unwrap();

        assert_eq!(store.get(&"k1".to_string()).await.unwrap(), "v1_new");
        assert!(matches!(
            store.get(&"k2".to_string()).await,
            Err(KvError::KeyNotFound)
        ));
        // 增量中没有出现的键保持不变
        assert_eq!(store.get(&"k3".to_string()).await.unwrap(), "v3");
        assert_eq!(store.get(&"k4".to_string()).await.unwrap(), "v4");
        assert_eq!(store.get(&runtime_key).await.unwrap(), "runtime");
    }

    #[tokio::test]
    async fn test_replace_failure_keeps_active_store() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        // 初始 store 和第一次加载成功，之后新建 store 失败
        let factory: StoreFactory<String, String> = Arc::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) >= 2 {
                return Err(KvError::Backend("out of memory".to_string()));
            }
            Ok(Arc::new(SyncMapStore::<String, String>::default()) as Arc<dyn Store<String, String>>)
        });

        let loader = MemoryLoader::new(snapshot(&[("k", "v")]));
        let notifier = loader.notifier();
        let store = LoadableStore::from_parts(
            factory,
            Box::new(loader),
            LoadStrategy::Replace,
            Duration::from_millis(10),
        )
        .await
        .unwrap();

        let result = notifier.notify(snapshot(&[("k", "v_new")])).await;
        assert!(matches!(result, Err(LoaderError::Store(KvError::Backend(_)))));
        assert_eq!(store.get(&"k".to_string()).await.unwrap(), "v");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_initial_load_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory: StoreFactory<String, String> = Arc::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) >= 1 {
                return Err(KvError::Backend("out of memory".to_string()));
            }
            Ok(Arc::new(MapStore::<String, String>::default()) as Arc<dyn Store<String, String>>)
        });

        let result = LoadableStore::from_parts(
            factory,
            Box::new(MemoryLoader::new(snapshot(&[("k", "v")]))),
            LoadStrategy::Replace,
            Duration::from_millis(10),
        )
        .await;
        assert!(matches!(result, Err(KvError::LoadFailed(_))));
    }

    #[tokio::test]
    async fn test_every_operation_fails_after_close() {
        let (store, notifier) = seeded_store(LoadStrategy::Replace, &[("k", "v")]).await;
        store.close().await.unwrap();
        assert!(store.is_closed());

        let key = "k".to_string();
        let value = "v".to_string();
        assert!(matches!(store.get(&key).await, Err(KvError::StoreClosed)));
        assert!(matches!(
            store.set(&key, &value, &SetOptions::new()).await,
            Err(KvError::StoreClosed)
        ));
        assert!(matches!(store.del(&key).await, Err(KvError::StoreClosed)));
        assert!(matches!(
            store.batch_set(&[key.clone()], &[value.clone()], &SetOptions::new()).await,
            Err(KvError::StoreClosed)
        ));
        assert!(matches!(
            store.batch_get(&[key.clone()]).await,
            Err(KvError::StoreClosed)
        ));
        assert!(matches!(
            store.batch_del(&[key.clone()]).await,
            Err(KvError::StoreClosed)
        ));
        assert!(matches!(store.close().await, Err(KvError::StoreClosed)));

        // 加载器已关闭，推送被忽略
        notifier.notify(snapshot(&[("k2", "v2")])).await.unwrap();
    }

    #[tokio::test]
    async fn test_call_queued_behind_close_returns_store_closed() {
        let (store, _notifier) = seeded_store(LoadStrategy::Replace, &[("k", "v")]).await;
        let store = Arc::new(store);

        let gate = store.shared.swap_gate.write().await;
        let pending = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get(&"k".to_string()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        store.shared.closed.store(true, Ordering::SeqCst);
        drop(gate);

        assert!(matches!(pending.await.unwrap(), Err(KvError::StoreClosed)));
    }

    #[derive(Default)]
    struct CloseRecorder {
        closed: std::sync::Mutex<Vec<String>>,
    }

    impl Observer for CloseRecorder {
        fn observe(&self, store: &str, operation: &'static str, _: Duration, _: Option<&KvError>) {
            if operation == "close" {
                self.closed.lock().unwrap().push(store.to_string());
            }
        }
    }

    #[tokio::test]
    async fn test_replaced_store_closed_after_delay() {
        let recorder = Arc::new(CloseRecorder::default());
        let observer = recorder.clone();
        let generation = Arc::new(AtomicUsize::new(0));
        let factory: StoreFactory<String, String> = Arc::new(move || {
            let name = format!("gen{}", generation.fetch_add(1, Ordering::SeqCst));
            Ok(Arc::new(ObservableStore::<String, String>::from_parts(
                name,
                Arc::new(MapStore::<String, String>::default()),
                vec![observer.clone() as Arc<dyn Observer>],
                false,
            )) as Arc<dyn Store<String, String>>)
        });

        let loader = MemoryLoader::new(snapshot(&[("k", "v1")]));
        let notifier = loader.notifier();
        let store = LoadableStore::from_parts(
            factory,
            Box::new(loader),
            LoadStrategy::Replace,
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        // gen0 为初始空 store，gen1 为第一次加载
        notifier.notify(snapshot(&[("k", "v2")])).await.unwrap();
        assert!(!recorder.closed.lock().unwrap().contains(&"gen1".to_string()));
        assert_eq!(store.get(&"k".to_string()).await.unwrap(), "v2");

        tokio::time::sleep(Duration::from_millis(300)).await;
        let closed = recorder.closed.lock().unwrap().clone();
        assert!(closed.contains(&"gen0".to_string()));
        assert!(closed.contains(&"gen1".to_string()));
        assert!(!closed.contains(&"gen2".to_string()));

        store.close().await.unwrap();
        assert!(recorder.closed.lock().unwrap().contains(&"gen2".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_during_replace_never_see_partial_snapshot() {
        let entries: Vec<(String, String)> = (0..200)
            .map(|i| (format!("k{}", i), "a".to_string()))
            .collect();
        let loader = MemoryLoader::new(MemoryStream::snapshot(entries));
        let notifier = loader.notifier();
        let store = Arc::new(
            LoadableStore::from_parts(
                map_factory::<String>(),
                Box::new(loader),
                LoadStrategy::Replace,
                Duration::from_millis(10),
            )
            .await
            .unwrap(),
        );

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..200 {
                    let keys: Vec<String> = (0..200).map(|i| format!("k{}", i)).collect();
                    let results = store.batch_get(&keys).await.unwrap();
                    let first = results[0].as_ref().unwrap().clone();
                    assert!(results.iter().all(|r| r.as_ref().unwrap() == &first));
                    tokio::task::yield_now().await;
                }
            })
        };

        for generation in ["b", "c", "d"] {
            let entries: Vec<(String, String)> = (0..200)
                .map(|i| (format!("k{}", i), generation.to_string()))
                .collect();
            notifier.notify(MemoryStream::snapshot(entries)).await.unwrap();
        }

        reader.await.unwrap();
        assert_eq!(store.get(&"k0".to_string()).await.unwrap(), "d");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn test_config_json5() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "k1\tv1").unwrap();
        writeln!(file, "k2\tv2").unwrap();
        file.flush().unwrap();

        let config: LoadableStoreConfig = json5::from_str(&format!(
            r#"{{
                store: {{ type: "SliceMapStore", options: {{}} }},
                loader: {{
                    type: "KvFileLoader",
                    options: {{
                        file_path: "{}",
                        parser: {{ type: "LineParser", options: {{ separator: "\t" }} }},
                    }},
                }},
                load_strategy: "replace",
                close_delay: "200ms",
            }}"#,
            file.path().display()
        ))
        .unwrap();
        assert_eq!(config.load_strategy, LoadStrategy::Replace);
        assert_eq!(config.close_delay, Duration::from_millis(200));

        let store = LoadableStore::<String, String>::new(config).await.unwrap();
        assert_eq!(store.load_strategy(), LoadStrategy::Replace);
        assert_eq!(store.get(&"k1".to_string()).await.unwrap(), "v1");
        assert_eq!(store.get(&"k2".to_string()).await.unwrap(), "v2");
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_fails_construction() {
        let config = LoadableStoreConfig {
            loader: json5::from_str(
                r#"{ type: "KvFileLoader", options: { file_path: "/nonexistent/kvx/data.txt" } }"#,
            )
            .unwrap(),
            ..Default::default()
        };

        let result = LoadableStore::<String, String>::new(config).await;
        assert!(matches!(result, Err(KvError::LoadFailed(_))));
    }
}
