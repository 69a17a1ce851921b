use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{BlockId, INT_BYTES, Lsn};
use crate::storage::disk::{FileManager, FileManagerError};
use crate::storage::page::Page;
use crate::transaction::wal::log_iterator::LogIterator;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("file manager error: {0}")]
    FileManager(#[from] FileManagerError),

    #[error("log record of {0} bytes does not fit in a {1}-byte block")]
    RecordTooLarge(usize, usize),
}

pub type Result<T> = std::result::Result<T, LogError>;

/// Append-only log over one block file.
///
/// Records fill each block back-to-front: offset 0 holds an 8-byte boundary,
/// the lowest offset currently in use, so the newest record in a block sits
/// at the boundary. A fresh block has boundary == block size. Record
/// boundaries are recovered during iteration purely from the boundary pointer
/// plus each record's length prefix.
///
/// Appends and flushes are serialized under one lock; the boundary
/// bookkeeping is not atomic on its own.
pub struct LogManager {
    fm: Arc<FileManager>,
    log_file: String,
    inner: Mutex<LogInner>,
}

struct LogInner {
    log_page: Page,
    current_blk: BlockId,
    latest_lsn: Lsn,
    last_saved_lsn: Lsn,
}

impl LogManager {
    /// Open the log file, positioning on its last block (or allocating the
    /// first block of an empty log).
    pub fn new(fm: Arc<FileManager>, log_file: impl Into<String>) -> Result<Self> {
        let log_file = log_file.into();
        let mut log_page = Page::new(fm.block_size());

        let log_size = fm.size(&log_file)?;
        let current_blk = if log_size == 0 {
            Self::append_new_block(&fm, &log_file, &mut log_page)?
        } else {
            let blk = BlockId::new(log_file.clone(), log_size - 1);
            fm.read(&blk, &mut log_page)?;
            blk
        };

        Ok(Self {
            fm,
            log_file,
            inner: Mutex::new(LogInner {
                log_page,
                current_blk,
                latest_lsn: 0,
                last_saved_lsn: 0,
            }),
        })
    }

    /// Append a record and return its LSN. Rolls over to a freshly appended
    /// block when the current one cannot hold the record.
    pub fn append(&self, record: &[u8]) -> Result<Lsn> {
        let mut inner = self.inner.lock();

        let bytes_needed = record.len() + INT_BYTES;
        if bytes_needed + INT_BYTES > self.fm.block_size() {
            return Err(LogError::RecordTooLarge(record.len(), self.fm.block_size()));
        }

        let mut boundary = inner.log_page.get_int(0) as usize;
        if boundary < bytes_needed + INT_BYTES {
            // No room left: flush the full block and start a new one.
            self.write_current(&mut inner)?;
            inner.current_blk =
                Self::append_new_block(&self.fm, &self.log_file, &mut inner.log_page)?;
            boundary = inner.log_page.get_int(0) as usize;
        }

        let record_pos = boundary - bytes_needed;
        inner.log_page.set_bytes(record_pos, record);
        inner.log_page.set_int(0, record_pos as u64);
        inner.latest_lsn += 1;
        Ok(inner.latest_lsn)
    }

    /// Durably flush the in-memory log block iff `lsn` has not been saved
    /// yet. Because a block holds many records, this also persists any
    /// higher-numbered records already buffered in the same block.
    pub fn flush_lsn(&self, lsn: Lsn) -> Result<()> {
        let mut inner = self.inner.lock();
        if lsn > inner.last_saved_lsn {
            self.write_current(&mut inner)?;
            inner.last_saved_lsn = lsn;
        }
        Ok(())
    }

    /// Unconditionally write the current log block to disk.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.write_current(&mut inner)
    }

    /// Flush, then iterate all records newest-first.
    pub fn iterator(&self) -> Result<LogIterator> {
        let current_blk = {
            let mut inner = self.inner.lock();
            self.write_current(&mut inner)?;
            inner.current_blk.clone()
        };
        LogIterator::new(self.fm.clone(), current_blk)
    }

    fn write_current(&self, inner: &mut LogInner) -> Result<()> {
        self.fm.write(&inner.current_blk, &inner.log_page)?;
        Ok(())
    }

    // Extend the log file by one block and reset the page to empty
    // (boundary == block size).
    fn append_new_block(
        fm: &FileManager,
        log_file: &str,
        log_page: &mut Page,
    ) -> Result<BlockId> {
        let blk = fm.append(log_file)?;
        log_page.set_int(0, fm.block_size() as u64);
        fm.write(&blk, log_page)?;
        Ok(blk)
    }
}
