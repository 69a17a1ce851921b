use std::fmt;

/// Log Sequence Number: strictly increasing per process lifetime, starting at 1.
pub type Lsn = u64;

/// Transaction number, assigned from a process-wide counter.
pub type TxNum = u64;

/// Width of an integer in the page codec (8 bytes, little-endian).
pub const INT_BYTES: usize = 8;

/// Identifies one fixed-size block inside a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId {
    file_name: String,
    block_num: u64,
}

impl BlockId {
    pub fn new(file_name: impl Into<String>, block_num: u64) -> Self {
        Self {
            file_name: file_name.into(),
            block_num,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn number(&self) -> u64 {
        self.block_num
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.file_name, self.block_num)
    }
}
