//! 可观测 Store 装饰器
//!
//! 为每个操作计时，把结果交给 Observer（指标、日志），可选地在 tracing span 中执行。
//! 不修改返回值和错误类型。

use async_trait::async_trait;
use garde::Validate;
use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::Instrument;

use super::builder::{StoreConfig, StoreKey, StoreValue};
use super::core::{KvError, SetOptions, Store};

/// ObservableStore 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, SmartDefault, Validate)]
#[serde(default)]
pub struct ObservableStoreConfig {
    /// store 名称，作为指标和日志中的 `store` 标签
    #[default = "default"]
    #[garde(length(min = 1))]
    pub name: String,

    /// 被装饰的 store
    #[garde(skip)]
    pub store: Box<StoreConfig>,

    /// 是否上报 prometheus 指标
    #[default = true]
    #[garde(skip)]
    pub metrics: bool,

    /// 是否输出操作日志
    #[garde(skip)]
    pub logging: bool,

    /// 是否为每个操作创建 tracing span
    #[garde(skip)]
    pub tracing: bool,
}

/// 操作观察者
pub trait Observer: Send + Sync {
    /// 每次操作结束后调用，`error` 为 None 表示成功
    fn observe(&self, store: &str, operation: &'static str, duration: Duration, error: Option<&KvError>);
}

static GLOBAL_REGISTRY: Lazy<Arc<RwLock<Registry>>> =
    Lazy::new(|| Arc::new(RwLock::new(Registry::default())));

/// 全局 Prometheus Registry，所有 ObservableStore 的指标都注册在 `kv` 前缀下
pub fn global_registry() -> Arc<RwLock<Registry>> {
    Arc::clone(&GLOBAL_REGISTRY)
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OperationLabels {
    store: String,
    operation: String,
    status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DurationLabels {
    store: String,
    operation: String,
}

fn duration_histogram() -> Histogram {
    // 0.1ms ~ 3.2s
    Histogram::new(exponential_buckets(0.0001, 2.0, 16))
}

struct StoreMetrics {
    requests: Family<OperationLabels, Counter>,
    durations: Family<DurationLabels, Histogram, fn() -> Histogram>,
}

/// 指标只注册一次，不同 store 通过 `store` 标签区分
static STORE_METRICS: Lazy<StoreMetrics> = Lazy::new(|| {
    let metrics = StoreMetrics {
        requests: Family::default(),
        durations: Family::new_with_constructor(duration_histogram as fn() -> Histogram),
    };

    match GLOBAL_REGISTRY.write() {
        Ok(mut registry) => {
            let registry = registry.sub_registry_with_prefix("kv");
            registry.register(
                "store_requests",
                "Number of kv store operations",
                metrics.requests.clone(),
            );
            registry.register(
                "store_duration_seconds",
                "Duration of kv store operations in seconds",
                metrics.durations.clone(),
            );
        }
        Err(e) => log::warn!("failed to register kv store metrics: {}", e),
    }

    metrics
});

/// prometheus 指标观察者
///
/// - `kv_store_requests_total{store, operation, status}`，status 为 success 或 error
/// - `kv_store_duration_seconds{store, operation}`
#[derive(Debug, Default, Clone)]
pub struct MetricsObserver;

impl Observer for MetricsObserver {
    fn observe(&self, store: &str, operation: &'static str, duration: Duration, error: Option<&KvError>) {
        let status = if error.is_some() { "error" } else { "success" };
        STORE_METRICS
            .requests
            .get_or_create(&OperationLabels {
                store: store.to_string(),
                operation: operation.to_string(),
                status: status.to_string(),
            })
            .inc();
        STORE_METRICS
            .durations
            .get_or_create(&DurationLabels {
                store: store.to_string(),
                operation: operation.to_string(),
            })
            .observe(duration.as_secs_f64());
    }
}

/// 日志观察者，成功和 KeyNotFound 为 debug 级别，其他错误为 warn 级别
#[derive(Debug, Default, Clone)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(&self, store: &str, operation: &'static str, duration: Duration, error: Option<&KvError>) {
        match error {
            None => log::debug!(
                "store={} operation={} status=success duration={:?}",
                store,
                operation,
                duration
            ),
            Some(KvError::KeyNotFound) => log::debug!(
                "store={} operation={} status=error error=\"{}\" duration={:?}",
                store,
                operation,
                KvError::KeyNotFound,
                duration
            ),
            Some(e) => log::warn!(
                "store={} operation={} status=error error=\"{}\" duration={:?}",
                store,
                operation,
                e,
                duration
            ),
        }
    }
}

/// 可观测 Store 装饰器
pub struct ObservableStore<K, V> {
    name: String,
    store: Arc<dyn Store<K, V>>,
    observers: Vec<Arc<dyn Observer>>,
    tracing: bool,
}

impl<K, V> ObservableStore<K, V>
where
    K: StoreKey,
    V: StoreValue,
{
    pub fn new(config: ObservableStoreConfig) -> Result<Self, KvError> {
        config.validate().map_err(|e| {
            KvError::InvalidArgument(format!("invalid ObservableStore config: {}", e))
        })?;

        let store = config.store.build::<K, V>()?;
        let mut observers: Vec<Arc<dyn Observer>> = Vec::new();
        if config.metrics {
            observers.push(Arc::new(MetricsObserver));
        }
        if config.logging {
            observers.push(Arc::new(LogObserver));
        }

        Ok(Self::from_parts(config.name, store, observers, config.tracing))
    }
}

impl<K, V> ObservableStore<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// 从已有的 store 和观察者创建
    pub fn from_parts(
        name: impl Into<String>,
        store: Arc<dyn Store<K, V>>,
        observers: Vec<Arc<dyn Observer>>,
        tracing: bool,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            observers,
            tracing,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> Result<T, KvError>
    where
        F: Future<Output = Result<T, KvError>> + Send,
    {
        let start = Instant::now();
        let result = if self.tracing {
            let span = tracing::info_span!("kv_store", store = %self.name, operation = operation);
            fut.instrument(span).await
        } else {
            fut.await
        };
        let elapsed = start.elapsed();

        let error = result.as_ref().err();
        for observer in &self.observers {
            observer.observe(&self.name, operation, elapsed, error);
        }

        result
    }
}

#[async_trait]
impl<K, V> Store<K, V> for ObservableStore<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        self.observe("set", self.store.set(key, value, options)).await
    }

    async fn get(&self, key: &K) -> Result<V, KvError> {
        self.observe("get", self.store.get(key)).await
    }

    async fn del(&self, key: &K) -> Result<(), KvError> {
        self.observe("del", self.store.del(key)).await
    }

    async fn batch_set(
        &self,
        keys: &[K],
        vals: &[V],
        options: &SetOptions,
    ) -> Result<Vec<Result<(), KvError>>, KvError> {
        self.observe("batch_set", self.store.batch_set(keys, vals, options))
            .await
    }

    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError> {
        self.observe("batch_get", self.store.batch_get(keys)).await
    }

    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError> {
        self.observe("batch_del", self.store.batch_del(keys)).await
    }

    async fn close(&self) -> Result<(), KvError> {
        self.observe("close", self.store.close()).await
    }
}
