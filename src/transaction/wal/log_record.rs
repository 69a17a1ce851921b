use std::fmt;

use thiserror::Error;

use crate::common::types::{BlockId, INT_BYTES, TxNum};
use crate::storage::page::Page;
use crate::transaction::transaction::{Result as TxResult, Transaction};

/// Type tags as stored in the first 8 bytes of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRecordType {
    Checkpoint = 0,
    Start = 1,
    Commit = 2,
    Rollback = 3,
    SetInt = 4,
    SetString = 5,
}

#[derive(Error, Debug)]
pub enum LogRecordError {
    /// Fatal for a recovery scan: once the tag is unrecognized, record
    /// boundaries can no longer be trusted.
    #[error("unknown log record type tag {0}")]
    UnknownRecordType(u64),

    #[error("log record too short: {0} bytes")]
    Truncated(usize),
}

/// One write-ahead log record. SETINT/SETSTRING carry the before-image of a
/// page write, which is all undo-only recovery ever needs; the remaining
/// variants are transaction/checkpoint markers with no undo action.
///
/// Records are immutable once appended; the log only ever grows.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Checkpoint,
    Start {
        tx_num: TxNum,
    },
    Commit {
        tx_num: TxNum,
    },
    Rollback {
        tx_num: TxNum,
    },
    SetInt {
        tx_num: TxNum,
        blk: BlockId,
        offset: usize,
        old_val: u64,
    },
    SetString {
        tx_num: TxNum,
        blk: BlockId,
        offset: usize,
        old_val: String,
    },
}

impl LogRecord {
    pub fn op(&self) -> LogRecordType {
        match self {
            LogRecord::Checkpoint => LogRecordType::Checkpoint,
            LogRecord::Start { .. } => LogRecordType::Start,
            LogRecord::Commit { .. } => LogRecordType::Commit,
            LogRecord::Rollback { .. } => LogRecordType::Rollback,
            LogRecord::SetInt { .. } => LogRecordType::SetInt,
            LogRecord::SetString { .. } => LogRecordType::SetString,
        }
    }

    /// Owning transaction; CHECKPOINT has none.
    pub fn tx_number(&self) -> Option<TxNum> {
        match self {
            LogRecord::Checkpoint => None,
            LogRecord::Start { tx_num }
            | LogRecord::Commit { tx_num }
            | LogRecord::Rollback { tx_num } => Some(*tx_num),
            LogRecord::SetInt { tx_num, .. } | LogRecord::SetString { tx_num, .. } => {
                Some(*tx_num)
            }
        }
    }

    /// Replay the before-image into `tx`. The write is re-pinned and applied
    /// with logging disabled: undo itself never needs undoing. Marker
    /// records are no-ops.
    pub fn undo(&self, tx: &mut Transaction) -> TxResult<()> {
        match self {
            LogRecord::SetInt {
                blk,
                offset,
                old_val,
                ..
            } => {
                tx.pin(blk)?;
                tx.set_int(blk, *offset, *old_val, false)?;
                tx.unpin(blk);
                Ok(())
            }
            LogRecord::SetString {
                blk,
                offset,
                old_val,
                ..
            } => {
                tx.pin(blk)?;
                tx.set_string(blk, *offset, old_val, false)?;
                tx.unpin(blk);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Serialize with the page codec: tag, then (except for CHECKPOINT) the
    /// transaction number; SETINT/SETSTRING add filename, block number,
    /// offset and old value.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            LogRecord::Checkpoint => {
                let mut page = Page::new(INT_BYTES);
                page.set_int(0, LogRecordType::Checkpoint as u64);
                page.contents().to_vec()
            }
            LogRecord::Start { tx_num } => encode_marker(LogRecordType::Start, *tx_num),
            LogRecord::Commit { tx_num } => encode_marker(LogRecordType::Commit, *tx_num),
            LogRecord::Rollback { tx_num } => encode_marker(LogRecordType::Rollback, *tx_num),
            LogRecord::SetInt {
                tx_num,
                blk,
                offset,
                old_val,
            } => {
                let (mut page, value_pos) = encode_update_prefix(
                    LogRecordType::SetInt,
                    *tx_num,
                    blk,
                    *offset,
                    INT_BYTES,
                );
                page.set_int(value_pos, *old_val);
                page.contents().to_vec()
            }
            LogRecord::SetString {
                tx_num,
                blk,
                offset,
                old_val,
            } => {
                let (mut page, value_pos) = encode_update_prefix(
                    LogRecordType::SetString,
                    *tx_num,
                    blk,
                    *offset,
                    Page::max_length_for_string(old_val),
                );
                page.set_string(value_pos, old_val);
                page.contents().to_vec()
            }
        }
    }

    /// Decode a record previously produced by [`LogRecord::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, LogRecordError> {
        if bytes.len() < INT_BYTES {
            return Err(LogRecordError::Truncated(bytes.len()));
        }
        let page = Page::from_bytes(bytes.to_vec());
        let tag = page.get_int(0);
        match tag {
            t if t == LogRecordType::Checkpoint as u64 => Ok(LogRecord::Checkpoint),
            t if t == LogRecordType::Start as u64 => Ok(LogRecord::Start {
                tx_num: page.get_int(INT_BYTES),
            }),
            t if t == LogRecordType::Commit as u64 => Ok(LogRecord::Commit {
                tx_num: page.get_int(INT_BYTES),
            }),
            t if t == LogRecordType::Rollback as u64 => Ok(LogRecord::Rollback {
                tx_num: page.get_int(INT_BYTES),
            }),
            t if t == LogRecordType::SetInt as u64 => {
                let (tx_num, blk, offset, value_pos) = decode_update_prefix(&page);
                Ok(LogRecord::SetInt {
                    tx_num,
                    blk,
                    offset,
                    old_val: page.get_int(value_pos),
                })
            }
            t if t == LogRecordType::SetString as u64 => {
                let (tx_num, blk, offset, value_pos) = decode_update_prefix(&page);
                Ok(LogRecord::SetString {
                    tx_num,
                    blk,
                    offset,
                    old_val: page.get_string(value_pos),
                })
            }
            other => Err(LogRecordError::UnknownRecordType(other)),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRecord::Checkpoint => write!(f, "<CHECKPOINT>"),
            LogRecord::Start { tx_num } => write!(f, "<START {tx_num}>"),
            LogRecord::Commit { tx_num } => write!(f, "<COMMIT {tx_num}>"),
            LogRecord::Rollback { tx_num } => write!(f, "<ROLLBACK {tx_num}>"),
            LogRecord::SetInt {
                tx_num,
                blk,
                offset,
                old_val,
            } => write!(f, "<SETINT {} {} {} {}>", tx_num, blk.number(), offset, old_val),
            LogRecord::SetString {
                tx_num,
                blk,
                offset,
                old_val,
            } => write!(
                f,
                "<SETSTRING {} {} {} {}>",
                tx_num,
                blk.number(),
                offset,
                old_val
            ),
        }
    }
}

fn encode_marker(op: LogRecordType, tx_num: TxNum) -> Vec<u8> {
    let mut page = Page::new(2 * INT_BYTES);
    page.set_int(0, op as u64);
    page.set_int(INT_BYTES, tx_num);
    page.contents().to_vec()
}

// Lay out tag, tx number, filename, block number and offset; returns the
// page and the position where the old value goes.
fn encode_update_prefix(
    op: LogRecordType,
    tx_num: TxNum,
    blk: &BlockId,
    offset: usize,
    value_len: usize,
) -> (Page, usize) {
    let tx_pos = INT_BYTES;
    let file_pos = tx_pos + INT_BYTES;
    let blk_pos = file_pos + Page::max_length_for_string(blk.file_name());
    let offset_pos = blk_pos + INT_BYTES;
    let value_pos = offset_pos + INT_BYTES;

    let mut page = Page::new(value_pos + value_len);
    page.set_int(0, op as u64);
    page.set_int(tx_pos, tx_num);
    page.set_string(file_pos, blk.file_name());
    page.set_int(blk_pos, blk.number());
    page.set_int(offset_pos, offset as u64);
    (page, value_pos)
}

fn decode_update_prefix(page: &Page) -> (TxNum, BlockId, usize, usize) {
    let tx_pos = INT_BYTES;
    let tx_num = page.get_int(tx_pos);
    let file_pos = tx_pos + INT_BYTES;
    let file_name = page.get_string(file_pos);
    let blk_pos = file_pos + Page::max_length_for_string(&file_name);
    let blk_num = page.get_int(blk_pos);
    let offset_pos = blk_pos + INT_BYTES;
    let offset = page.get_int(offset_pos) as usize;
    let value_pos = offset_pos + INT_BYTES;
    (tx_num, BlockId::new(file_name, blk_num), offset, value_pos)
}
