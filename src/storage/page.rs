use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::INT_BYTES;

/// A fixed-size byte buffer holding the in-memory image of one disk block.
///
/// Two value encodings are supported:
/// - integers: 8 bytes, little-endian, occupying `[offset, offset + 8)`;
/// - byte/string values: an 8-byte little-endian length prefix followed by
///   that many raw bytes. Strings are stored as their UTF-8 bytes.
///
/// Writes past the end of the buffer are silently truncated; callers are
/// responsible for staying within bounds (use [`Page::max_length_for_string`]
/// to pre-size buffers and compute field offsets). Reads past the end panic.
#[derive(Debug, Clone)]
pub struct Page {
    data: Vec<u8>,
}

impl Page {
    /// Create a zeroed page of the given size (normally the block size;
    /// log-record construction uses variable-size buffers).
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Wrap an existing byte buffer without copying.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn get_int(&self, offset: usize) -> u64 {
        LittleEndian::read_u64(&self.data[offset..offset + INT_BYTES])
    }

    pub fn set_int(&mut self, offset: usize, val: u64) {
        let mut buf = [0u8; INT_BYTES];
        LittleEndian::write_u64(&mut buf, val);
        self.copy_in(offset, &buf);
    }

    /// Read a length-prefixed byte value. If the stored length runs past the
    /// end of the buffer, the missing tail reads as zeroes.
    pub fn get_bytes(&self, offset: usize) -> Vec<u8> {
        let len = self.get_int(offset) as usize;
        let start = offset + INT_BYTES;
        let mut out = vec![0; len];
        let available = self.data.len().saturating_sub(start);
        let n = len.min(available);
        out[..n].copy_from_slice(&self.data[start..start + n]);
        out
    }

    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.set_int(offset, bytes.len() as u64);
        self.copy_in(offset + INT_BYTES, bytes);
    }

    pub fn get_string(&self, offset: usize) -> String {
        String::from_utf8_lossy(&self.get_bytes(offset)).into_owned()
    }

    pub fn set_string(&mut self, offset: usize, s: &str) {
        self.set_bytes(offset, s.as_bytes());
    }

    /// Number of bytes `s` occupies under the length-prefixed encoding.
    pub fn max_length_for_string(s: &str) -> usize {
        INT_BYTES + s.len()
    }

    pub(crate) fn contents(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    // Truncating copy: bytes that would land past the end are dropped.
    fn copy_in(&mut self, offset: usize, bytes: &[u8]) {
        if offset >= self.data.len() {
            return;
        }
        let n = bytes.len().min(self.data.len() - offset);
        self.data[offset..offset + n].copy_from_slice(&bytes[..n]);
    }
}
