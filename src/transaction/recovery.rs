use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};

use crate::common::types::{Lsn, TxNum};
use crate::storage::buffer::{Buffer, BufferManager};
use crate::transaction::transaction::{Result, Transaction, TransactionError};
use crate::transaction::wal::{LogManager, LogRecord, LogRecordType};

/// Drives undo-only logging for one transaction: before-image records on
/// every mutation, terminal COMMIT/ROLLBACK records, and backward log
/// replay for rollback and restart recovery.
///
/// Recovery assumes the WAL invariant held at all times: since modified
/// pages may reach disk before commit (steal) and commit does not force
/// them out, undoing every unfinished transaction is exactly what restores
/// a consistent state.
#[derive(Clone)]
pub struct RecoveryManager {
    lm: Arc<LogManager>,
    bm: Arc<BufferManager>,
    tx_num: TxNum,
}

impl RecoveryManager {
    /// Appends the transaction's START record (not yet flushed).
    pub fn new(tx_num: TxNum, lm: Arc<LogManager>, bm: Arc<BufferManager>) -> Result<Self> {
        lm.append(&LogRecord::Start { tx_num }.encode())?;
        Ok(Self { lm, bm, tx_num })
    }

    /// Flush the transaction's dirty buffers, append COMMIT, and make the
    /// log durable up to it.
    pub fn commit(&self) -> Result<()> {
        self.bm.flush_all(self.tx_num)?;
        let lsn = self
            .lm
            .append(&LogRecord::Commit { tx_num: self.tx_num }.encode())?;
        self.lm.flush_lsn(lsn)?;
        Ok(())
    }

    /// Undo this transaction's writes newest-first, then flush its buffers,
    /// append ROLLBACK and make the log durable up to it.
    pub fn rollback(&self, tx: &mut Transaction) -> Result<()> {
        self.do_rollback(tx)?;
        self.bm.flush_all(self.tx_num)?;
        let lsn = self
            .lm
            .append(&LogRecord::Rollback { tx_num: self.tx_num }.encode())?;
        self.lm.flush_lsn(lsn)?;
        Ok(())
    }

    /// Restart recovery: undo every transaction that never reached COMMIT or
    /// ROLLBACK, then flush and append a CHECKPOINT so later recoveries can
    /// stop here.
    pub fn recover(&self, tx: &mut Transaction) -> Result<()> {
        self.do_recover(tx)?;
        self.bm.flush_all(self.tx_num)?;
        let lsn = self.lm.append(&LogRecord::Checkpoint.encode())?;
        self.lm.flush_lsn(lsn)?;
        Ok(())
    }

    /// Capture the integer currently at `offset` into a SETINT record and
    /// return its LSN. The page write itself is the caller's job.
    pub fn set_int(&self, buffer: &Buffer, offset: usize) -> Result<Lsn> {
        let old_val = buffer.contents().get_int(offset);
        let blk = buffer
            .block()
            .cloned()
            .ok_or(TransactionError::BufferNotAssigned)?;
        let record = LogRecord::SetInt {
            tx_num: self.tx_num,
            blk,
            offset,
            old_val,
        };
        Ok(self.lm.append(&record.encode())?)
    }

    /// Capture the string currently at `offset` into a SETSTRING record and
    /// return its LSN.
    pub fn set_string(&self, buffer: &Buffer, offset: usize) -> Result<Lsn> {
        let old_val = buffer.contents().get_string(offset);
        let blk = buffer
            .block()
            .cloned()
            .ok_or(TransactionError::BufferNotAssigned)?;
        let record = LogRecord::SetString {
            tx_num: self.tx_num,
            blk,
            offset,
            old_val,
        };
        Ok(self.lm.append(&record.encode())?)
    }

    // Scan backward, undoing this transaction's records until its START.
    fn do_rollback(&self, tx: &mut Transaction) -> Result<()> {
        for bytes in self.lm.iterator()? {
            let record = LogRecord::decode(&bytes?)?;
            if record.tx_number() != Some(self.tx_num) {
                continue;
            }
            if record.op() == LogRecordType::Start {
                return Ok(());
            }
            debug!("undoing {record}");
            record.undo(tx)?;
        }
        Ok(())
    }

    // Scan backward, tracking finished transactions and undoing everything
    // that belongs to an unfinished one; a CHECKPOINT bounds the scan.
    fn do_recover(&self, tx: &mut Transaction) -> Result<()> {
        let mut finished: HashSet<TxNum> = HashSet::new();
        for bytes in self.lm.iterator()? {
            let record = LogRecord::decode(&bytes?)?;
            if record.op() == LogRecordType::Checkpoint {
                return Ok(());
            }
            let Some(tx_num) = record.tx_number() else {
                continue;
            };
            match record.op() {
                LogRecordType::Commit | LogRecordType::Rollback => {
                    finished.insert(tx_num);
                }
                _ if !finished.contains(&tx_num) => {
                    info!("recovery undoing {record}");
                    record.undo(tx)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
