//! Deduplicating string block.
//!
//! Strings live back to back in one byte buffer, each followed by a NUL.
//! Records refer to them by the byte offset of their first character.
//! Identical strings are stored once; the first copy wins.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{DbcError, Result};

#[derive(Debug, Clone, Default)]
pub struct StringPool {
    bytes:   Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an existing string block verbatim.
    ///
    /// Every NUL-terminated entry is indexed so later interning reuses it.
    /// An unterminated tail is closed with a NUL so appended strings cannot
    /// run into it.
    pub fn from_block(mut bytes: Vec<u8>) -> Self {
        if bytes.last().is_some_and(|&b| b != 0) {
            warn!(block_len = bytes.len(), "string block lacks a final NUL, terminating it");
            bytes.push(0);
        }
        let mut offsets = HashMap::new();
        let mut pos = 0usize;
        while pos < bytes.len() {
            let Some(len) = bytes[pos..].iter().position(|&b| b == 0) else { break };
            if let Ok(s) = std::str::from_utf8(&bytes[pos..pos + len]) {
                offsets.entry(s.to_owned()).or_insert(pos as u32);
            }
            pos += len + 1;
        }
        Self { bytes, offsets }
    }

    /// Return the offset of `s`, appending it if this is its first use.
    ///
    /// The first string interned into an empty pool is always preceded by
    /// the empty string, so `""` resolves to offset 0 in any non-empty pool.
    /// A string is stored only up to its first NUL.
    pub fn intern(&mut self, s: &str) -> u32 {
        let s = match s.find('\0') {
            Some(end) => &s[..end],
            None      => s,
        };
        if self.bytes.is_empty() && !s.is_empty() {
            self.insert("");
        }
        match self.offsets.get(s) {
            Some(&offset) => offset,
            None          => self.insert(s),
        }
    }

    fn insert(&mut self, s: &str) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(s.to_owned(), offset);
        offset
    }

    pub fn offset_of(&self, s: &str) -> Option<u32> {
        self.offsets.get(s).copied()
    }

    /// Number of distinct indexed strings.
    pub fn string_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read the NUL-terminated string starting at `offset` in `buffer`.
///
/// Offset 0 of an empty block reads as `""`.  Any other offset outside the
/// block, or a string that runs into the end of the block without a NUL,
/// is `StringBlockOverrun`.
pub fn decode_cstr(buffer: &[u8], offset: u32) -> Result<String> {
    let start = offset as usize;
    if buffer.is_empty() && start == 0 {
        return Ok(String::new());
    }
    let overrun = || DbcError::StringBlockOverrun { offset, block_len: buffer.len() };
    let tail = buffer.get(start..).filter(|t| !t.is_empty()).ok_or_else(overrun)?;
    let len = tail.iter().position(|&b| b == 0).ok_or_else(overrun)?;
    Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
}
