pub mod buffer_list;
pub mod recovery;
pub mod transaction;
pub mod wal;

pub use recovery::RecoveryManager;
pub use transaction::{Transaction, TransactionError};
pub use wal::{LogManager, LogRecord, LogRecordType};
