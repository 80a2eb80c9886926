//! The fixed 20-byte table preamble.
//!
//! ```text
//! offset 0   char[4]  magic = "WDBC"
//! offset 4   u32      record_count
//! offset 8   u32      field_count
//! offset 12  u32      record_size
//! offset 16  u32      string_block_size
//! ```
//!
//! All integers are little-endian.  `field_count` is informational only;
//! `record_size` is what slices the record block.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Read, Write};

use crate::error::{DbcError, Result};

pub const MAGIC: &[u8; 4] = b"WDBC";
pub const HEADER_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableHeader {
    pub record_count:      u32,
    pub field_count:       u32,
    pub record_size:       u32,
    pub string_block_size: u32,
}

impl TableHeader {
    pub fn new(field_count: u32, record_size: u32) -> Self {
        Self { record_count: 0, field_count, record_size, string_block_size: 0 }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DbcError::Truncated {
                needed:    HEADER_SIZE as u64,
                available: bytes.len() as u64,
            });
        }
        Self::read(&bytes[..HEADER_SIZE])
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(DbcError::BadMagic { found: magic });
        }
        Ok(Self {
            record_count:      reader.read_u32::<LittleEndian>()?,
            field_count:       reader.read_u32::<LittleEndian>()?,
            record_size:       reader.read_u32::<LittleEndian>()?,
            string_block_size: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(self.record_count)?;
        writer.write_u32::<LittleEndian>(self.field_count)?;
        writer.write_u32::<LittleEndian>(self.record_size)?;
        writer.write_u32::<LittleEndian>(self.string_block_size)?;
        Ok(())
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(MAGIC);
        out[4..8].copy_from_slice(&self.record_count.to_le_bytes());
        out[8..12].copy_from_slice(&self.field_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.record_size.to_le_bytes());
        out[16..20].copy_from_slice(&self.string_block_size.to_le_bytes());
        out
    }

    /// Byte length of a file described by this header.
    pub fn file_len(&self) -> u64 {
        HEADER_SIZE as u64
            + self.record_count as u64 * self.record_size as u64
            + self.string_block_size as u64
    }
}
