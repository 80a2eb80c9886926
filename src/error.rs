//! Error taxonomy for table loading, encoding and saving.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbcError {
    #[error("Invalid magic {found:02x?}, expected \"WDBC\"")]
    BadMagic { found: [u8; 4] },

    #[error("Truncated table: need {needed} bytes, {available} available")]
    Truncated { needed: u64, available: u64 },

    #[error("Header declares {record_count} records of zero bytes")]
    ZeroRecordSize { record_count: u32 },

    #[error("Table has no file name to save under")]
    MissingFileName,

    #[error("Table file not found: {0}")]
    FileNotFound(PathBuf),

    /// A typed row encoded to a width other than the table's record size.
    #[error("Row {row} encodes to {encoded} bytes but record size is {record_size}")]
    SchemaMismatch { row: usize, encoded: usize, record_size: u32 },

    #[error("Row {row} carries raw bytes and cannot take typed fields")]
    MixedRowKind { row: usize },

    #[error("String offset {offset} overruns string block of {block_len} bytes")]
    StringBlockOverrun { offset: u32, block_len: usize },

    #[error("Read of {width} bytes at cursor {cursor} overruns record of {len} bytes")]
    RecordOverrun { cursor: usize, width: usize, len: usize },

    /// A reinterpretation pass stopped before consuming the whole record.
    #[error("Row {row} decoded {consumed} of {record_size} bytes")]
    IncompleteDecode { row: usize, consumed: usize, record_size: u32 },

    #[error("Row index {index} out of range ({len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DbcError {
    /// `FileNotFound` is the only condition callers are expected to branch on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbcError::FileNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, DbcError>;
