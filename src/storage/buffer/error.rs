use thiserror::Error;

use crate::storage::disk::FileManagerError;
use crate::transaction::wal::log_manager::LogError;

#[derive(Error, Debug)]
pub enum BufferError {
    /// Pin waited past the timeout with every buffer pinned. Usually a
    /// symptom of transactions holding too many concurrent pins; there is no
    /// deadlock detection.
    #[error("no buffer available within the wait timeout (possible deadlock)")]
    NoAvailableBuffer,

    #[error("file manager error: {0}")]
    FileManager(#[from] FileManagerError),

    #[error("log error: {0}")]
    Log(#[from] LogError),
}

pub type Result<T> = std::result::Result<T, BufferError>;
