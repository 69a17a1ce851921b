use std::sync::Arc;

use crate::common::types::{BlockId, INT_BYTES};
use crate::storage::disk::FileManager;
use crate::storage::page::Page;
use crate::transaction::wal::log_manager::Result;

/// Single-pass iterator over raw log records in reverse chronological order.
///
/// Within a block, records run from the boundary offset upward, newest first;
/// when a block is exhausted the iterator steps to block number − 1 and
/// repeats, ending after block 0.
pub struct LogIterator {
    fm: Arc<FileManager>,
    blk: BlockId,
    page: Page,
    current_pos: usize,
}

impl LogIterator {
    pub(crate) fn new(fm: Arc<FileManager>, blk: BlockId) -> Result<Self> {
        let mut it = Self {
            page: Page::new(fm.block_size()),
            fm,
            blk,
            current_pos: 0,
        };
        it.move_to_block()?;
        Ok(it)
    }

    // Load the current block and position at its newest record.
    fn move_to_block(&mut self) -> Result<()> {
        self.fm.read(&self.blk, &mut self.page)?;
        self.current_pos = self.page.get_int(0) as usize;
        Ok(())
    }
}

impl Iterator for LogIterator {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_pos >= self.fm.block_size() {
            if self.blk.number() == 0 {
                return None;
            }
            self.blk = BlockId::new(self.blk.file_name(), self.blk.number() - 1);
            if let Err(e) = self.move_to_block() {
                return Some(Err(e));
            }
        }

        let record = self.page.get_bytes(self.current_pos);
        self.current_pos += INT_BYTES + record.len();
        Some(Ok(record))
    }
}
