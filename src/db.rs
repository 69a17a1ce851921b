use std::path::PathBuf;
use std::sync::Arc;

use crate::storage::buffer::BufferManager;
use crate::storage::disk::FileManager;
use crate::transaction::transaction::{Result, Transaction};
use crate::transaction::wal::LogManager;

/// Startup knobs for the storage kernel.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Data directory; all block files and the log live here.
    pub db_dir: PathBuf,

    /// Block size in bytes, shared by every file.
    pub block_size: usize,

    /// Number of frames in the buffer pool.
    pub pool_size: usize,

    /// Name of the write-ahead log file.
    pub log_file: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from("ferrodb"),
            block_size: 400,
            pool_size: 8,
            log_file: "ferrodb.log".to_string(),
        }
    }
}

/// Wires the file manager, log manager and buffer pool together and hands
/// out transactions.
pub struct FerroDB {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    bm: Arc<BufferManager>,
}

impl FerroDB {
    pub fn new(config: DbConfig) -> Result<Self> {
        let fm = Arc::new(FileManager::new(&config.db_dir, config.block_size)?);
        let lm = Arc::new(LogManager::new(fm.clone(), config.log_file)?);
        let bm = Arc::new(BufferManager::new(
            fm.clone(),
            lm.clone(),
            config.pool_size,
        ));
        Ok(Self { fm, lm, bm })
    }

    pub fn new_tx(&self) -> Result<Transaction> {
        Transaction::new(self.fm.clone(), self.lm.clone(), self.bm.clone())
    }

    /// Run restart recovery. Call once at startup, before handing out any
    /// other transaction.
    pub fn recover(&self) -> Result<()> {
        let mut tx = self.new_tx()?;
        tx.recover()
    }

    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.fm
    }

    pub fn log_manager(&self) -> &Arc<LogManager> {
        &self.lm
    }

    pub fn buffer_manager(&self) -> &Arc<BufferManager> {
        &self.bm
    }
}
