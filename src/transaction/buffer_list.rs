use std::collections::HashMap;
use std::sync::Arc;

use crate::common::types::BlockId;
use crate::storage::buffer::error::Result;
use crate::storage::buffer::{BufferManager, BufferPtr};

/// Tracks the buffers one transaction has pinned, in pin order. Owned
/// exclusively by its transaction; all sharing goes through the buffer
/// manager underneath.
pub struct BufferList {
    buffers: HashMap<BlockId, BufferPtr>,
    pins: Vec<BlockId>,
    bm: Arc<BufferManager>,
}

impl BufferList {
    pub fn new(bm: Arc<BufferManager>) -> Self {
        Self {
            buffers: HashMap::new(),
            pins: Vec::new(),
            bm,
        }
    }

    pub fn get_buffer(&self, blk: &BlockId) -> Option<&BufferPtr> {
        self.buffers.get(blk)
    }

    pub fn pin(&mut self, blk: &BlockId) -> Result<()> {
        let buf = self.bm.pin(blk)?;
        self.buffers.insert(blk.clone(), buf);
        self.pins.push(blk.clone());
        Ok(())
    }

    /// Release one pin of `blk`; the map entry stays while other pins of the
    /// same block remain. No-op for a block this transaction never pinned.
    pub fn unpin(&mut self, blk: &BlockId) {
        let Some(buf) = self.buffers.get(blk) else {
            return;
        };
        self.bm.unpin(buf);
        if let Some(pos) = self.pins.iter().position(|b| b == blk) {
            self.pins.remove(pos);
        }
        if !self.pins.iter().any(|b| b == blk) {
            self.buffers.remove(blk);
        }
    }

    /// Release every pin this transaction holds (commit/rollback epilogue).
    pub fn unpin_all(&mut self) {
        for blk in self.pins.drain(..) {
            if let Some(buf) = self.buffers.get(&blk) {
                self.bm.unpin(buf);
            }
        }
        self.buffers.clear();
    }
}
