use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex, RwLock};

use crate::common::types::{BlockId, TxNum};
use crate::storage::buffer::buffer::Buffer;
use crate::storage::buffer::error::{BufferError, Result};
use crate::storage::disk::FileManager;
use crate::transaction::wal::LogManager;

/// Shared handle to one pool frame.
pub type BufferPtr = Arc<RwLock<Buffer>>;

/// Default upper bound on how long `pin` waits for a frame to free up.
pub const MAX_PIN_WAIT: Duration = Duration::from_secs(3);

struct PoolState {
    num_available: usize,
}

/// Fixed pool of buffers shared by all transactions.
///
/// One pool-wide lock serializes pin, unpin, eviction and flush-all; frame
/// pin counts and bindings only change under it. `pin` blocks on a condition
/// variable signalled by `unpin` when no unpinned frame exists, up to a
/// timeout. Victim selection is simply the first unpinned frame found.
pub struct BufferManager {
    pool: Vec<BufferPtr>,
    state: Mutex<PoolState>,
    available_cond: Condvar,
    max_wait: Duration,
}

impl BufferManager {
    pub fn new(fm: Arc<FileManager>, lm: Arc<LogManager>, num_buffers: usize) -> Self {
        Self::with_max_wait(fm, lm, num_buffers, MAX_PIN_WAIT)
    }

    pub fn with_max_wait(
        fm: Arc<FileManager>,
        lm: Arc<LogManager>,
        num_buffers: usize,
        max_wait: Duration,
    ) -> Self {
        let pool = (0..num_buffers)
            .map(|_| Arc::new(RwLock::new(Buffer::new(fm.clone(), lm.clone()))))
            .collect();
        Self {
            pool,
            state: Mutex::new(PoolState {
                num_available: num_buffers,
            }),
            available_cond: Condvar::new(),
            max_wait,
        }
    }

    /// Number of currently unpinned buffers.
    pub fn available(&self) -> usize {
        self.state.lock().num_available
    }

    /// Pin the frame holding `blk`, binding a free frame to it first if
    /// necessary (which flushes the victim's dirty content before the read).
    /// Blocks until a frame frees up, surfacing
    /// [`BufferError::NoAvailableBuffer`] after the wait timeout.
    pub fn pin(&self, blk: &BlockId) -> Result<BufferPtr> {
        let deadline = Instant::now() + self.max_wait;
        let mut state = self.state.lock();
        loop {
            if let Some(buf) = self.try_pin(&mut state, blk)? {
                return Ok(buf);
            }
            if Instant::now() >= deadline
                || self
                    .available_cond
                    .wait_until(&mut state, deadline)
                    .timed_out()
            {
                return Err(BufferError::NoAvailableBuffer);
            }
        }
    }

    /// Release one pin. A frame whose pin count reaches zero becomes
    /// available again and any waiting pinners are woken.
    pub fn unpin(&self, buf: &BufferPtr) {
        let mut state = self.state.lock();
        let mut buffer = buf.write();
        buffer.unpin();
        if !buffer.is_pinned() {
            state.num_available += 1;
            self.available_cond.notify_all();
        }
    }

    /// Flush every buffer stamped with `tx_num`, pinned or not.
    pub fn flush_all(&self, tx_num: TxNum) -> Result<()> {
        let _state = self.state.lock();
        for buf in &self.pool {
            let mut buffer = buf.write();
            if buffer.modifying_tx() == Some(tx_num) {
                buffer.flush()?;
            }
        }
        Ok(())
    }

    fn try_pin(&self, state: &mut PoolState, blk: &BlockId) -> Result<Option<BufferPtr>> {
        let buf = match self.find_existing(blk) {
            Some(buf) => buf,
            None => {
                let Some(victim) = self.choose_unpinned() else {
                    return Ok(None);
                };
                debug!("assigning block {} to an unpinned buffer", blk);
                victim.write().assign_to_block(blk.clone())?;
                victim
            }
        };

        let mut buffer = buf.write();
        if !buffer.is_pinned() {
            state.num_available -= 1;
        }
        buffer.pin();
        drop(buffer);
        Ok(Some(buf))
    }

    fn find_existing(&self, blk: &BlockId) -> Option<BufferPtr> {
        self.pool
            .iter()
            .find(|buf| buf.read().block() == Some(blk))
            .cloned()
    }

    fn choose_unpinned(&self) -> Option<BufferPtr> {
        self.pool
            .iter()
            .find(|buf| !buf.read().is_pinned())
            .cloned()
    }
}
