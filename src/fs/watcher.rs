//! 文件监听器
//!
//! 监听文件所在目录的事件，按文件路径防抖后分发给注册的回调

use anyhow::{anyhow, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use garde::Validate;
use notify::{RecursiveMode, Watcher};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::cfg::HumanDur;

/// 文件事件
#[derive(Debug, Clone, PartialEq)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Error(String),
}

/// 文件监听器配置
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct FileWatcherConfig {
    /// 执行回调的工作线程数
    #[default = 1]
    #[garde(range(min = 1))]
    pub worker_threads: usize,

    /// 防抖延迟，同一文件在该时间内的多次事件只分发最后一次
    #[serde_as(as = "HumanDur")]
    #[default(Duration::from_millis(100))]
    #[garde(skip)]
    pub debounce: Duration,
}

/// 监听句柄，用于取消单个回调
pub type WatchId = u64;

type HandlerFn = dyn Fn(FileEvent) + Send + Sync;

enum Command {
    Watch {
        id: WatchId,
        path: PathBuf,
        handler: Arc<HandlerFn>,
    },
    Unwatch(WatchId),
    UnwatchAll,
}

/// 文件监听器
///
/// - 一个 notify watcher 监听所有文件的父目录，目录按引用计数共享
/// - 一个事件循环线程负责注册请求和防抖
/// - 回调在 rayon 线程池中执行，不同文件的回调可以并行
///
/// 同一个文件可以注册多个回调，drop 后事件循环线程退出。
pub struct FileWatcher {
    commands: Sender<Command>,
    next_id: AtomicU64,
    _event_thread: thread::JoinHandle<()>,
}

impl FileWatcher {
    pub fn new(config: FileWatcherConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("invalid file watcher config: {}", e))?;

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("kvx-watch-{}", i))
            .build()?;

        let (notify_tx, notify_rx) = unbounded();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = notify_tx.send(res);
        })?;

        let (commands, command_rx) = unbounded();
        let event_loop = EventLoop {
            watcher,
            thread_pool,
            debounce: config.debounce,
            handlers: HashMap::new(),
            dirs: HashMap::new(),
            pending: HashMap::new(),
        };
        let event_thread = thread::Builder::new()
            .name("kvx-watch-loop".to_string())
            .spawn(move || event_loop.run(command_rx, notify_rx))?;

        Ok(Self {
            commands,
            next_id: AtomicU64::new(1),
            _event_thread: event_thread,
        })
    }

    /// 监听文件，文件可以暂时不存在，但父目录必须存在
    pub fn watch<F>(&self, filepath: impl AsRef<Path>, handler: F) -> Result<WatchId>
    where
        F: Fn(FileEvent) + Send + Sync + 'static,
    {
        let path = normalize(filepath.as_ref())?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.commands
            .send(Command::Watch {
                id,
                path,
                handler: Arc::new(handler),
            })
            .map_err(|e| anyhow!("failed to send watch request: {}", e))?;

        Ok(id)
    }

    /// 取消单个回调，已经在执行的回调不受影响
    pub fn unwatch(&self, id: WatchId) -> Result<()> {
        self.commands
            .send(Command::Unwatch(id))
            .map_err(|e| anyhow!("failed to send unwatch request: {}", e))
    }

    pub fn unwatch_all(&self) -> Result<()> {
        self.commands
            .send(Command::UnwatchAll)
            .map_err(|e| anyhow!("failed to send unwatch request: {}", e))
    }
}

/// 规范化文件路径：父目录 canonicalize 后拼接文件名，
/// 与监听父目录时 notify 上报的路径一致
fn normalize(path: &Path) -> Result<PathBuf> {
    if path.exists() && !path.is_file() {
        return Err(anyhow!("not a file: {}", path.display()));
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let parent = dunce::canonicalize(&parent)
        .map_err(|e| anyhow!("parent directory unavailable: {}: {}", parent.display(), e))?;

    Ok(parent.join(file_name))
}

struct EventLoop {
    watcher: notify::RecommendedWatcher,
    thread_pool: rayon::ThreadPool,
    debounce: Duration,
    handlers: HashMap<PathBuf, Vec<(WatchId, Arc<HandlerFn>)>>,
    /// 被监听的目录及其引用计数
    dirs: HashMap<PathBuf, usize>,
    pending: HashMap<PathBuf, (FileEvent, Instant)>,
}

impl EventLoop {
    fn run(mut self, commands: Receiver<Command>, events: Receiver<notify::Result<notify::Event>>) {
        let tick = (self.debounce / 2).max(Duration::from_millis(10));
        loop {
            crossbeam::select! {
                recv(commands) -> command => match command {
                    Ok(command) => self.apply(command),
                    Err(_) => break,
                },
                recv(events) -> event => match event {
                    Ok(Ok(event)) => self.record(event),
                    Ok(Err(e)) => self.broadcast(FileEvent::Error(e.to_string())),
                    Err(_) => break,
                },
                default(tick) => {}
            }
            self.flush();
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Watch { id, path, handler } => {
                if let Some(dir) = path.parent().map(Path::to_path_buf) {
                    let count = self.dirs.entry(dir.clone()).or_insert(0);
                    if *count == 0 {
                        if let Err(e) = self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
                            log::warn!("failed to watch directory {}: {}", dir.display(), e);
                        }
                    }
                    *count += 1;
                }
                self.handlers.entry(path).or_default().push((id, handler));
            }
            Command::Unwatch(id) => {
                let Some(path) = self
                    .handlers
                    .iter()
                    .find(|(_, hs)| hs.iter().any(|(hid, _)| *hid == id))
                    .map(|(path, _)| path.clone())
                else {
                    return;
                };
                if let Some(handlers) = self.handlers.get_mut(&path) {
                    handlers.retain(|(hid, _)| *hid != id);
                    if handlers.is_empty() {
                        self.handlers.remove(&path);
                    }
                }
                self.release_dir(path.parent().map(Path::to_path_buf));
            }
            Command::UnwatchAll => {
                for dir in self.dirs.keys() {
                    let _ = self.watcher.unwatch(dir);
                }
                self.dirs.clear();
                self.handlers.clear();
                self.pending.clear();
            }
        }
    }

    fn release_dir(&mut self, dir: Option<PathBuf>) {
        let Some(dir) = dir else { return };
        if let Some(count) = self.dirs.get_mut(&dir) {
            *count -= 1;
            if *count == 0 {
                self.dirs.remove(&dir);
                let _ = self.watcher.unwatch(&dir);
            }
        }
    }

    fn record(&mut self, event: notify::Event) {
        for path in &event.paths {
            let path = if event.kind.is_remove() {
                path.clone()
            } else {
                dunce::canonicalize(path).unwrap_or_else(|_| path.clone())
            };
            if !self.handlers.contains_key(&path) {
                continue;
            }

            let file_event = if event.kind.is_create() {
                FileEvent::Created(path.clone())
            } else if event.kind.is_modify() {
                FileEvent::Modified(path.clone())
            } else if event.kind.is_remove() {
                FileEvent::Deleted(path.clone())
            } else {
                continue;
            };
            self.pending.insert(path, (file_event, Instant::now()));
        }
    }

    /// 分发超过防抖延迟没有新事件的文件
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let now = Instant::now();
        let debounce = self.debounce;
        let mut ready = Vec::new();
        self.pending.retain(|path, (event, at)| {
            if now.duration_since(*at) >= debounce {
                ready.push((path.clone(), event.clone()));
                false
            } else {
                true
            }
        });

        let jobs: Vec<(Vec<Arc<HandlerFn>>, FileEvent)> = ready
            .into_iter()
            .filter_map(|(path, event)| {
                self.handlers
                    .get(&path)
                    .map(|hs| (hs.iter().map(|(_, h)| Arc::clone(h)).collect(), event))
            })
            .collect();
        self.dispatch(jobs);
    }

    fn broadcast(&self, event: FileEvent) {
        let handlers = self
            .handlers
            .values()
            .flat_map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)))
            .collect();
        self.dispatch(vec![(handlers, event)]);
    }

    fn dispatch(&self, jobs: Vec<(Vec<Arc<HandlerFn>>, FileEvent)>) {
        if jobs.is_empty() {
            return;
        }
        self.thread_pool.install(|| {
            jobs.into_par_iter().for_each(|(handlers, event)| {
                for handler in handlers {
                    handler(event.clone());
                }
            });
        });
    }
}
