//! Bounded byte strings backed by fixed-capacity buffers.
//!
//! Every string that crosses an on-disk layout (titles, authors, chapter
//! names, filenames, tags) has a hard limit defined by the format. `StrBuf`
//! keeps the raw bytes plus a length and never allocates; oversized input is
//! truncated at the documented limit.

use heapless::Vec;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrBuf<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> StrBuf<N> {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Copies `bytes`, truncating at capacity.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut out = Self::new();
        out.set(bytes);
        out
    }

    /// Reads a NUL-padded fixed field: the effective length is the index of
    /// the first NUL, or the field length if none is found.
    pub fn from_nul_padded(field: &[u8]) -> Self {
        let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        Self::from_bytes(&field[..len])
    }

    pub fn set(&mut self, bytes: &[u8]) {
        self.buf.clear();
        let take = bytes.len().min(N);
        // Capacity was just checked.
        let _ = self.buf.extend_from_slice(&bytes[..take]);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Lossy view for display purposes; non-UTF-8 content renders as a
    /// placeholder rather than panicking.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf).unwrap_or("<invalid>")
    }
}

impl<const N: usize> core::fmt::Display for StrBuf<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
