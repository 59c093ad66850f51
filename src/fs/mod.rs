//! 文件监听

pub mod global;
pub mod watcher;

pub use global::{unwatch, unwatch_all, watch};
pub use watcher::{FileEvent, FileWatcher, FileWatcherConfig, WatchId};
