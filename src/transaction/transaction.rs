use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;
use thiserror::Error;

use crate::common::types::{BlockId, TxNum};
use crate::storage::buffer::BufferManager;
use crate::storage::buffer::error::BufferError;
use crate::storage::disk::{FileManager, FileManagerError};
use crate::transaction::buffer_list::BufferList;
use crate::transaction::recovery::RecoveryManager;
use crate::transaction::wal::{LogError, LogManager, LogRecordError};

// Transaction numbers are process-wide, never reused and never persisted
// across restarts.
static NEXT_TX_NUM: AtomicU64 = AtomicU64::new(1);

fn next_tx_num() -> TxNum {
    NEXT_TX_NUM.fetch_add(1, Ordering::SeqCst)
}

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("no buffer pinned for block {0}")]
    BlockNotPinned(BlockId),

    #[error("buffer is not assigned to a block")]
    BufferNotAssigned,

    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("file manager error: {0}")]
    FileManager(#[from] FileManagerError),

    #[error("log error: {0}")]
    Log(#[from] LogError),

    #[error("log record error: {0}")]
    LogRecord(#[from] LogRecordError),
}

pub type Result<T> = std::result::Result<T, TransactionError>;

/// One unit of work against the storage kernel.
///
/// All reads and writes go through blocks the transaction has pinned via its
/// private [`BufferList`]. Every logged mutation first appends a
/// before-image record, then updates the page in place and stamps the buffer
/// with this transaction's number and the protecting LSN. Commit and
/// rollback flush the transaction's buffers, append a terminal record and
/// release every pin.
///
/// There is no lock-based isolation: concurrent transactions touching the
/// same block coordinate only through pin bookkeeping.
pub struct Transaction {
    fm: Arc<FileManager>,
    bm: Arc<BufferManager>,
    recovery: RecoveryManager,
    buffers: BufferList,
    tx_num: TxNum,
}

impl Transaction {
    /// Start a new transaction; its START record is appended immediately.
    pub fn new(
        fm: Arc<FileManager>,
        lm: Arc<LogManager>,
        bm: Arc<BufferManager>,
    ) -> Result<Self> {
        let tx_num = next_tx_num();
        let recovery = RecoveryManager::new(tx_num, lm, bm.clone())?;
        Ok(Self {
            fm,
            bm: bm.clone(),
            recovery,
            buffers: BufferList::new(bm),
            tx_num,
        })
    }

    pub fn tx_num(&self) -> TxNum {
        self.tx_num
    }

    pub fn pin(&mut self, blk: &BlockId) -> Result<()> {
        self.buffers.pin(blk)?;
        Ok(())
    }

    pub fn unpin(&mut self, blk: &BlockId) {
        self.buffers.unpin(blk);
    }

    /// Make this transaction's work durable and release all pins.
    pub fn commit(&mut self) -> Result<()> {
        self.recovery.commit()?;
        info!("transaction {} committed", self.tx_num);
        self.buffers.unpin_all();
        Ok(())
    }

    /// Undo this transaction's writes and release all pins.
    pub fn rollback(&mut self) -> Result<()> {
        let recovery = self.recovery.clone();
        recovery.rollback(self)?;
        info!("transaction {} rolled back", self.tx_num);
        self.buffers.unpin_all();
        Ok(())
    }

    /// Restart recovery. Run once at startup, before any other transaction
    /// begins; operates purely on the log, no live transaction objects are
    /// needed for the crashed work.
    pub fn recover(&mut self) -> Result<()> {
        self.bm.flush_all(self.tx_num)?;
        let recovery = self.recovery.clone();
        recovery.recover(self)?;
        info!("recovery complete");
        Ok(())
    }

    pub fn get_int(&self, blk: &BlockId, offset: usize) -> Result<u64> {
        let buf = self.pinned_buffer(blk)?;
        let val = buf.read().contents().get_int(offset);
        Ok(val)
    }

    pub fn get_string(&self, blk: &BlockId, offset: usize) -> Result<String> {
        let buf = self.pinned_buffer(blk)?;
        let val = buf.read().contents().get_string(offset);
        Ok(val)
    }

    /// Write an integer at `offset`. With `ok_to_log`, the old value is
    /// first captured in a SETINT record; pass `false` only for the initial
    /// write to freshly allocated space where no undo can ever be needed.
    pub fn set_int(
        &mut self,
        blk: &BlockId,
        offset: usize,
        val: u64,
        ok_to_log: bool,
    ) -> Result<()> {
        let buf = self.pinned_buffer(blk)?;
        let mut lsn = 0;
        if ok_to_log {
            lsn = self.recovery.set_int(&buf.read(), offset)?;
        }
        let mut buffer = buf.write();
        buffer.contents_mut().set_int(offset, val);
        buffer.set_modified(self.tx_num, lsn);
        Ok(())
    }

    /// Write a string at `offset`; see [`Transaction::set_int`] for the
    /// `ok_to_log` contract.
    pub fn set_string(
        &mut self,
        blk: &BlockId,
        offset: usize,
        val: &str,
        ok_to_log: bool,
    ) -> Result<()> {
        let buf = self.pinned_buffer(blk)?;
        let mut lsn = 0;
        if ok_to_log {
            lsn = self.recovery.set_string(&buf.read(), offset)?;
        }
        let mut buffer = buf.write();
        buffer.contents_mut().set_string(offset, val);
        buffer.set_modified(self.tx_num, lsn);
        Ok(())
    }

    /// Number of blocks currently in `file_name`.
    pub fn size(&self, file_name: &str) -> Result<u64> {
        Ok(self.fm.size(file_name)?)
    }

    /// Extend `file_name` by one zero-filled block.
    pub fn append(&self, file_name: &str) -> Result<BlockId> {
        Ok(self.fm.append(file_name)?)
    }

    pub fn block_size(&self) -> usize {
        self.fm.block_size()
    }

    pub fn available_buffers(&self) -> usize {
        self.bm.available()
    }

    fn pinned_buffer(&self, blk: &BlockId) -> Result<crate::storage::buffer::BufferPtr> {
        self.buffers
            .get_buffer(blk)
            .cloned()
            .ok_or_else(|| TransactionError::BlockNotPinned(blk.clone()))
    }
}
