use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::kv::loader::core::{HandlerFuture, KvStream, LoaderError};
use crate::kv::parser::{ChangeType, Parser};

/// KV 文件数据流：逐行读取文本文件并解析
///
/// 每次 `each` 都重新打开文件，空行跳过。
pub struct KvFileStream<K, V> {
    file_path: PathBuf,
    parser: Arc<dyn Parser<K, V>>,
    /// 解析失败或处理失败的行是否跳过
    skip_dirty_rows: bool,
}

impl<K, V> KvFileStream<K, V> {
    pub fn new(
        file_path: impl AsRef<Path>,
        parser: Arc<dyn Parser<K, V>>,
        skip_dirty_rows: bool,
    ) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            parser,
            skip_dirty_rows,
        }
    }
}

#[async_trait]
impl<K, V> KvStream<K, V> for KvFileStream<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn each(
        &self,
        handler: &mut (dyn FnMut(ChangeType, K, V) -> HandlerFuture + Send),
    ) -> Result<(), LoaderError> {
        let file = tokio::fs::File::open(&self.file_path).await.map_err(|e| {
            LoaderError::LoadFailed(format!(
                "failed to open file '{}': {}",
                self.file_path.display(),
                e
            ))
        })?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();

        let mut row_count = 0usize;
        let mut dirty_row_count = 0usize;

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await.map_err(|e| {
                LoaderError::LoadFailed(format!(
                    "{}:{}: {}",
                    self.file_path.display(),
                    row_count + 1,
                    e
                ))
            })?;
            if n == 0 {
                break;
            }

            row_count += 1;
            let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let result = match self.parser.parse(line) {
                Ok((change_type, key, value)) => handler(change_type, key, value).await,
                Err(e) => Err(LoaderError::Parser(e)),
            };

            if let Err(e) = result {
                if !self.skip_dirty_rows {
                    return Err(LoaderError::LoadFailed(format!(
                        "{}:{}: {}",
                        self.file_path.display(),
                        row_count,
                        e
                    )));
                }
                dirty_row_count += 1;
                log::warn!(
                    "skip dirty row {}:{}: {}",
                    self.file_path.display(),
                    row_count,
                    e
                );
            }
        }

        log::debug!(
            "file loaded: path={}, rows={}, dirty_rows={}",
            self.file_path.display(),
            row_count,
            dirty_row_count
        );
        Ok(())
    }
}
