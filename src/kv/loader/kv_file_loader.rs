use async_trait::async_trait;
use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::fs::{self, FileEvent, WatchId};
use crate::kv::loader::core::{KvStream, Listener, Loader, LoaderError};
use crate::kv::loader::kv_file_stream::KvFileStream;
use crate::kv::parser::{ParseValue, Parser, ParserConfig};

/// KvFileLoader 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct KvFileLoaderConfig {
    /// 文件路径
    #[garde(length(min = 1))]
    pub file_path: String,

    /// 行解析器配置，默认 LineParser（制表符分隔）
    #[garde(skip)]
    pub parser: ParserConfig,

    /// 是否跳过脏数据，默认遇到脏数据时整次加载失败
    #[garde(skip)]
    pub skip_dirty_rows: bool,
}

/// KV 文件加载器
///
/// 文件每行一条记录，格式由 Parser 定义。注册监听器时同步完成首次加载，
/// 之后通过全局文件监听器感知变化，在注册时所在的 tokio 运行时上重新加载。
pub struct KvFileLoader<K, V> {
    file_path: PathBuf,
    parser: Arc<dyn Parser<K, V>>,
    skip_dirty_rows: bool,
    is_running: Arc<AtomicBool>,
    watch_id: Option<WatchId>,
}

impl<K, V> KvFileLoader<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: KvFileLoaderConfig) -> Result<Self, LoaderError>
    where
        K: ParseValue,
        V: ParseValue,
    {
        config
            .validate()
            .map_err(|e| LoaderError::LoadFailed(format!("invalid KvFileLoader config: {}", e)))?;

        Ok(Self::with_parser(
            &config.file_path,
            Arc::from(config.parser.build::<K, V>()),
            config.skip_dirty_rows,
        ))
    }

    /// 使用自定义解析器创建
    pub fn with_parser(
        file_path: impl AsRef<Path>,
        parser: Arc<dyn Parser<K, V>>,
        skip_dirty_rows: bool,
    ) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            parser,
            skip_dirty_rows,
            is_running: Arc::new(AtomicBool::new(false)),
            watch_id: None,
        }
    }

    fn stream(&self) -> Arc<dyn KvStream<K, V>> {
        Arc::new(KvFileStream::new(
            &self.file_path,
            self.parser.clone(),
            self.skip_dirty_rows,
        ))
    }
}

#[async_trait]
impl<K, V> Loader<K, V> for KvFileLoader<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn on_change(&mut self, listener: Listener<K, V>) -> Result<(), LoaderError> {
        if self.watch_id.is_some() {
            return Err(LoaderError::LoadFailed(
                "listener already registered".to_string(),
            ));
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| LoaderError::LoadFailed(format!("no tokio runtime: {}", e)))?;

        listener(self.stream()).await?;
        self.is_running.store(true, Ordering::SeqCst);

        let file_path = self.file_path.clone();
        let parser = self.parser.clone();
        let skip_dirty_rows = self.skip_dirty_rows;
        let is_running = self.is_running.clone();

        // 回调运行在监听器的工作线程上，不在 tokio 线程中，可以 block_on
        let id = fs::watch(&self.file_path, move |event| {
            if !is_running.load(Ordering::SeqCst) {
                return;
            }

            match event {
                FileEvent::Created(_) | FileEvent::Modified(_) => {
                    log::debug!("file changed, reloading: {}", file_path.display());
                    let stream: Arc<dyn KvStream<K, V>> = Arc::new(KvFileStream::new(
                        &file_path,
                        parser.clone(),
                        skip_dirty_rows,
                    ));
                    if let Err(e) = handle.block_on(listener(stream)) {
                        log::warn!("reload failed: path={}, error={}", file_path.display(), e);
                    }
                }
                FileEvent::Deleted(path) => {
                    log::warn!("file deleted: {}", path.display());
                }
                FileEvent::Error(err) => {
                    log::warn!("watcher error: path={}, error={}", file_path.display(), err);
                }
            }
        })
        .map_err(|e| LoaderError::Watcher(e.to_string()))?;

        self.watch_id = Some(id);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LoaderError> {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(id) = self.watch_id.take() {
            fs::unwatch(id).map_err(|e| LoaderError::Watcher(e.to_string()))?;
        }
        Ok(())
    }
}
