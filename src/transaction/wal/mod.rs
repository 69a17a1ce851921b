pub mod log_iterator;
pub mod log_manager;
pub mod log_record;

pub use log_iterator::LogIterator;
pub use log_manager::{LogError, LogManager};
pub use log_record::{LogRecord, LogRecordError, LogRecordType};
