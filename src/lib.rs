// FerroDB storage kernel: block storage, buffer pool, write-ahead log and
// undo-only transaction recovery. No query, schema or index layer.

pub mod common;
pub mod db;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use common::types::{BlockId, Lsn, TxNum};
pub use db::{DbConfig, FerroDB};
pub use storage::buffer::{BufferError, BufferManager};
pub use storage::disk::{FileManager, FileManagerError};
pub use storage::page::Page;
pub use transaction::wal::{LogManager, LogRecord, LogRecordType};
pub use transaction::{Transaction, TransactionError};
