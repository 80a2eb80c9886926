//! Records: untouched raw bytes, or a full list of typed fields.
//!
//! A [`Row::Raw`] is carried through from a loaded file byte for byte.  A
//! [`Row::Typed`] describes every column of the record; there is no partial
//! form, so raw bytes can never be silently dropped by adding a field.
//!
//! Raw rows can be re-read column by column with the `decode_*_at` helpers
//! or, more conveniently, a [`RowReader`] that records each decoded value
//! and yields a complete [`TypedRow`].

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DbcError, Result};
use crate::field::{FieldValue, LOCALE_SLOTS};
use crate::string_pool::{decode_cstr, StringPool};

// ── Sort keys ────────────────────────────────────────────────────────────────

/// Optional ordering keys, compared in field order.  Unset keys sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct SortKeys {
    pub sort_1: Option<i32>,
    pub sort_2: Option<i32>,
    pub sort_3: Option<i32>,
}

// ── TypedRow ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedRow {
    fields:        Vec<FieldValue>,
    pub sort_keys: SortKeys,
}

impl TypedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<FieldValue>) -> Self {
        Self { fields, sort_keys: SortKeys::default() }
    }

    pub fn push(&mut self, value: FieldValue) -> &mut Self {
        self.fields.push(value);
        self
    }

    pub fn add_int32(&mut self, value: i32) -> &mut Self {
        self.push(FieldValue::Int32(value))
    }

    pub fn add_uint32(&mut self, value: u32) -> &mut Self {
        self.push(FieldValue::UInt32(value))
    }

    pub fn add_int64(&mut self, value: i64) -> &mut Self {
        self.push(FieldValue::Int64(value))
    }

    pub fn add_uint64(&mut self, value: u64) -> &mut Self {
        self.push(FieldValue::UInt64(value))
    }

    pub fn add_float(&mut self, value: f32) -> &mut Self {
        self.push(FieldValue::Float(value))
    }

    pub fn add_packed_flags(&mut self, value: i32) -> &mut Self {
        self.push(FieldValue::PackedFlags(value))
    }

    pub fn add_string(&mut self, value: impl Into<String>) -> &mut Self {
        self.push(FieldValue::Str(value.into()))
    }

    pub fn add_string_lang(&mut self, value: impl Into<String>) -> &mut Self {
        self.push(FieldValue::StrLang(value.into()))
    }

    pub fn sort_value_1(&mut self, value: i32) -> &mut Self {
        self.sort_keys.sort_1 = Some(value);
        self
    }

    pub fn sort_value_2(&mut self, value: i32) -> &mut Self {
        self.sort_keys.sort_2 = Some(value);
        self
    }

    pub fn sort_value_3(&mut self, value: i32) -> &mut Self {
        self.sort_keys.sort_3 = Some(value);
        self
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FieldValue] {
        &mut self.fields
    }

    /// Replace one existing column in place.  Returns the old value.
    pub fn set(&mut self, column: usize, value: FieldValue) -> Option<FieldValue> {
        self.fields.get_mut(column).map(|slot| std::mem::replace(slot, value))
    }

    /// Encoded width in bytes; independent of string contents.
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(FieldValue::width).sum()
    }
}

// ── Row ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Raw(Vec<u8>),
    Typed(TypedRow),
}

impl Row {
    /// Slice `width` bytes at `*cursor` into a raw row and advance the cursor.
    pub fn decode_raw(source: &[u8], cursor: &mut usize, width: u32) -> Result<Row> {
        let start = *cursor;
        let end = start.checked_add(width as usize);
        match end.and_then(|end| source.get(start..end)) {
            Some(bytes) => {
                *cursor += width as usize;
                Ok(Row::Raw(bytes.to_vec()))
            }
            None => Err(DbcError::Truncated {
                needed:    start as u64 + width as u64,
                available: source.len() as u64,
            }),
        }
    }

    /// Append this row's wire bytes to `out`, returning how many were written.
    pub fn encode_into(&self, out: &mut Vec<u8>, pool: &mut StringPool) -> usize {
        let before = out.len();
        match self {
            Row::Raw(bytes) => out.extend_from_slice(bytes),
            Row::Typed(row) => {
                for field in &row.fields {
                    field.encode_into(out, pool);
                }
            }
        }
        out.len() - before
    }

    pub fn encode(&self, pool: &mut StringPool) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out, pool);
        out
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Row::Raw(bytes) => bytes.len(),
            Row::Typed(row) => row.encoded_len(),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Row::Raw(_))
    }

    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match self {
            Row::Raw(bytes) => Some(bytes),
            Row::Typed(_)   => None,
        }
    }

    pub fn as_typed(&self) -> Option<&TypedRow> {
        match self {
            Row::Typed(row) => Some(row),
            Row::Raw(_)     => None,
        }
    }

    pub fn as_typed_mut(&mut self) -> Option<&mut TypedRow> {
        match self {
            Row::Typed(row) => Some(row),
            Row::Raw(_)     => None,
        }
    }

    pub fn sort_keys(&self) -> SortKeys {
        match self {
            Row::Typed(row) => row.sort_keys,
            Row::Raw(_)     => SortKeys::default(),
        }
    }

    /// Value of column 0, which holds the record ID in every client table.
    pub fn id(&self) -> Option<i32> {
        match self {
            Row::Raw(bytes) => bytes.get(..4).map(LittleEndian::read_i32),
            Row::Typed(row) => match row.fields.first()? {
                FieldValue::UInt32(v) => Some(*v as i32),
                field => field.as_i32(),
            },
        }
    }
}

impl From<TypedRow> for Row {
    fn from(row: TypedRow) -> Self {
        Row::Typed(row)
    }
}

// ── Column decoding ──────────────────────────────────────────────────────────

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, width: usize) -> Result<&'a [u8]> {
    let start = *cursor;
    let slice = start
        .checked_add(width)
        .and_then(|end| bytes.get(start..end))
        .ok_or(DbcError::RecordOverrun { cursor: start, width, len: bytes.len() })?;
    *cursor += width;
    Ok(slice)
}

pub fn decode_i32_at(bytes: &[u8], cursor: &mut usize) -> Result<i32> {
    take(bytes, cursor, 4).map(LittleEndian::read_i32)
}

pub fn decode_u32_at(bytes: &[u8], cursor: &mut usize) -> Result<u32> {
    take(bytes, cursor, 4).map(LittleEndian::read_u32)
}

pub fn decode_i64_at(bytes: &[u8], cursor: &mut usize) -> Result<i64> {
    take(bytes, cursor, 8).map(LittleEndian::read_i64)
}

pub fn decode_u64_at(bytes: &[u8], cursor: &mut usize) -> Result<u64> {
    take(bytes, cursor, 8).map(LittleEndian::read_u64)
}

pub fn decode_f32_at(bytes: &[u8], cursor: &mut usize) -> Result<f32> {
    take(bytes, cursor, 4).map(LittleEndian::read_f32)
}

pub fn decode_string_at(bytes: &[u8], cursor: &mut usize, string_block: &[u8]) -> Result<String> {
    let offset = decode_u32_at(bytes, cursor)?;
    decode_cstr(string_block, offset)
}

/// Read a localized string column (68 bytes) and resolve only the primary
/// locale slot.  The other slots and the locale flags are skipped.
pub fn decode_string_lang_at(bytes: &[u8], cursor: &mut usize, string_block: &[u8]) -> Result<String> {
    let slots = take(bytes, cursor, (LOCALE_SLOTS + 1) * 4)?;
    decode_cstr(string_block, LittleEndian::read_u32(&slots[..4]))
}

// ── RowReader ────────────────────────────────────────────────────────────────

/// Sequential re-reader over one raw record.
///
/// Every call decodes the next column, records it as a typed field, and
/// returns the value so the caller can derive sort keys or patch it.
pub struct RowReader<'a> {
    bytes:        &'a [u8],
    string_block: &'a [u8],
    cursor:       usize,
    row:          TypedRow,
}

impl<'a> RowReader<'a> {
    pub fn new(bytes: &'a [u8], string_block: &'a [u8]) -> Self {
        Self { bytes, string_block, cursor: 0, row: TypedRow::new() }
    }

    pub fn int32(&mut self) -> Result<i32> {
        let v = decode_i32_at(self.bytes, &mut self.cursor)?;
        self.row.add_int32(v);
        Ok(v)
    }

    pub fn uint32(&mut self) -> Result<u32> {
        let v = decode_u32_at(self.bytes, &mut self.cursor)?;
        self.row.add_uint32(v);
        Ok(v)
    }

    pub fn int64(&mut self) -> Result<i64> {
        let v = decode_i64_at(self.bytes, &mut self.cursor)?;
        self.row.add_int64(v);
        Ok(v)
    }

    pub fn uint64(&mut self) -> Result<u64> {
        let v = decode_u64_at(self.bytes, &mut self.cursor)?;
        self.row.add_uint64(v);
        Ok(v)
    }

    pub fn float(&mut self) -> Result<f32> {
        let v = decode_f32_at(self.bytes, &mut self.cursor)?;
        self.row.add_float(v);
        Ok(v)
    }

    pub fn packed_flags(&mut self) -> Result<i32> {
        let v = decode_i32_at(self.bytes, &mut self.cursor)?;
        self.row.add_packed_flags(v);
        Ok(v)
    }

    pub fn string(&mut self) -> Result<String> {
        let v = decode_string_at(self.bytes, &mut self.cursor, self.string_block)?;
        self.row.add_string(v.clone());
        Ok(v)
    }

    pub fn string_lang(&mut self) -> Result<String> {
        let v = decode_string_lang_at(self.bytes, &mut self.cursor, self.string_block)?;
        self.row.add_string_lang(v.clone());
        Ok(v)
    }

    pub fn sort_value_1(&mut self, value: i32) {
        self.row.sort_value_1(value);
    }

    pub fn sort_value_2(&mut self, value: i32) {
        self.row.sort_value_2(value);
    }

    pub fn sort_value_3(&mut self, value: i32) {
        self.row.sort_value_3(value);
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    /// Hand back the typed row; the whole record must have been consumed.
    pub fn finish(self, row_index: usize) -> Result<TypedRow> {
        if self.cursor != self.bytes.len() {
            return Err(DbcError::IncompleteDecode {
                row:         row_index,
                consumed:    self.cursor,
                record_size: self.bytes.len() as u32,
            });
        }
        Ok(self.row)
    }
}
