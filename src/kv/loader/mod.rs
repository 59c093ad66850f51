pub mod core;
pub mod kv_file_loader;
pub mod kv_file_stream;
pub mod memory_loader;

pub use core::{HandlerFuture, KvStream, Listener, LoadStrategy, Loader, LoaderConfig, LoaderError};
pub use kv_file_loader::{KvFileLoader, KvFileLoaderConfig};
pub use kv_file_stream::KvFileStream;
pub use memory_loader::{MemoryLoader, MemoryNotifier, MemoryStream};
