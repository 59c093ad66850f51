//! 进程级共享的文件监听器

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::path::Path;

use crate::fs::watcher::{FileEvent, FileWatcher, FileWatcherConfig, WatchId};

static GLOBAL_WATCHER: OnceCell<FileWatcher> = OnceCell::new();

fn global() -> Result<&'static FileWatcher> {
    GLOBAL_WATCHER.get_or_try_init(|| FileWatcher::new(FileWatcherConfig::default()))
}

/// 使用全局监听器监听文件，回调在共享的单个工作线程上执行
pub fn watch<F>(filepath: impl AsRef<Path>, handler: F) -> Result<WatchId>
where
    F: Fn(FileEvent) + Send + Sync + 'static,
{
    global()?.watch(filepath, handler)
}

pub fn unwatch(id: WatchId) -> Result<()> {
    global()?.unwatch(id)
}

pub fn unwatch_all() -> Result<()> {
    global()?.unwatch_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_global_watch() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file_path = temp_dir.path().join("global_test.txt");
        fs::write(&file_path, "initial content")?;

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let id = watch(&file_path, move |event| sink.lock().unwrap().push(event))?;
        thread::sleep(Duration::from_millis(200));

        fs::write(&file_path, "modified content")?;
        thread::sleep(Duration::from_millis(1000));

        assert!(!events.lock().unwrap().is_empty());
        unwatch(id)
    }

    #[test]
    #[serial]
    fn test_multiple_global_watches() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file1 = temp_dir.path().join("global_multi_1.txt");
        let file2 = temp_dir.path().join("global_multi_2.txt");
        fs::write(&file1, "content1")?;
        fs::write(&file2, "content2")?;

        let count = Arc::new(Mutex::new(0));
        let c1 = count.clone();
        let id1 = watch(&file1, move |_| *c1.lock().unwrap() += 1)?;
        let c2 = count.clone();
        let id2 = watch(&file2, move |_| *c2.lock().unwrap() += 1)?;
        thread::sleep(Duration::from_millis(200));

        fs::write(&file1, "modified1")?;
        fs::write(&file2, "modified2")?;
        thread::sleep(Duration::from_millis(1000));

        assert!(*count.lock().unwrap() >= 2);
        unwatch(id1)?;
        unwatch(id2)
    }
}
