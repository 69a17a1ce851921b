use std::sync::Arc;

use log::debug;

use crate::common::types::{BlockId, Lsn, TxNum};
use crate::storage::buffer::error::Result;
use crate::storage::disk::FileManager;
use crate::storage::page::Page;
use crate::transaction::wal::LogManager;

/// One frame of the buffer pool: a page, its current block binding, a pin
/// count, and the dirty marker (the modifying transaction plus the LSN of
/// the log record protecting the latest unflushed change).
///
/// Frames are created once at pool construction and rebound to different
/// blocks over their lifetime. Pin-count changes are serialized by the pool
/// lock in [`super::BufferManager`].
pub struct Buffer {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    contents: Page,
    blk: Option<BlockId>,
    pins: u32,
    tx_num: Option<TxNum>,
    lsn: Lsn,
}

impl Buffer {
    pub(crate) fn new(fm: Arc<FileManager>, lm: Arc<LogManager>) -> Self {
        let contents = Page::new(fm.block_size());
        Self {
            fm,
            lm,
            contents,
            blk: None,
            pins: 0,
            tx_num: None,
            lsn: 0,
        }
    }

    pub fn contents(&self) -> &Page {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Page {
        &mut self.contents
    }

    /// The block this frame currently holds, if any.
    pub fn block(&self) -> Option<&BlockId> {
        self.blk.as_ref()
    }

    /// Callers that modify the page must report the owning transaction and
    /// the LSN of the record protecting the change (0 when logging was
    /// skipped).
    pub fn set_modified(&mut self, tx_num: TxNum, lsn: Lsn) {
        self.tx_num = Some(tx_num);
        if lsn > 0 {
            self.lsn = lsn;
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    pub fn modifying_tx(&self) -> Option<TxNum> {
        self.tx_num
    }

    /// Rebind this frame to `blk`: flush any dirty content, then read the
    /// new block's bytes in. Resets the pin count.
    pub(crate) fn assign_to_block(&mut self, blk: BlockId) -> Result<()> {
        self.flush()?;
        self.fm.read(&blk, &mut self.contents)?;
        self.blk = Some(blk);
        self.pins = 0;
        Ok(())
    }

    /// Write the page back to its block if dirty. The log is flushed up to
    /// the protecting LSN strictly before the page write; reordering these
    /// two steps would break crash recovery.
    pub(crate) fn flush(&mut self) -> Result<()> {
        if let (Some(tx_num), Some(blk)) = (self.tx_num, self.blk.as_ref()) {
            debug!("flushing block {} modified by tx {}", blk, tx_num);
            self.lm.flush_lsn(self.lsn)?;
            self.fm.write(blk, &self.contents)?;
            self.tx_num = None;
        }
        Ok(())
    }

    pub(crate) fn pin(&mut self) {
        self.pins += 1;
    }

    pub(crate) fn unpin(&mut self) {
        self.pins = self.pins.saturating_sub(1);
    }
}
