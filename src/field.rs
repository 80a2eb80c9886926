//! Column value types and their wire encodings.
//!
//! | Kind | Wire width | Columns |
//! |------|-----------|---------|
//! | `Int32`, `UInt32`, `PackedFlags`, `Float` | 4 | 1 |
//! | `Int64`, `UInt64` | 8 | 2 |
//! | `Str` | 4 (offset into string block) | 1 |
//! | `StrLang` | 68 (16 offsets + locale flags) | 17 |
//!
//! All values are little-endian.

use crate::string_pool::StringPool;

/// Number of per-locale string slots in a localized string column.
pub const LOCALE_SLOTS: usize = 16;

/// Locale mask written after every localized string.
///
/// Opaque client constant; it is written as-is and never derived from
/// which slots are populated.
pub const LOCALE_FLAGS: u32 = 16_712_190;

/// Wire width of a localized string column.
pub const STR_LANG_WIDTH: usize = (LOCALE_SLOTS + 1) * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    PackedFlags,
    Str,
    StrLang,
}

impl FieldKind {
    #[inline]
    pub fn width(self) -> usize {
        match self {
            FieldKind::Int32
            | FieldKind::UInt32
            | FieldKind::Float
            | FieldKind::PackedFlags
            | FieldKind::Str     => 4,
            FieldKind::Int64
            | FieldKind::UInt64  => 8,
            FieldKind::StrLang   => STR_LANG_WIDTH,
        }
    }

    /// How many 4-byte columns this kind contributes to `field_count`.
    #[inline]
    pub fn columns(self) -> u32 {
        (self.width() / 4) as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Int32       => "int32",
            FieldKind::UInt32      => "uint32",
            FieldKind::Int64       => "int64",
            FieldKind::UInt64      => "uint64",
            FieldKind::Float       => "float",
            FieldKind::PackedFlags => "flags",
            FieldKind::Str         => "string",
            FieldKind::StrLang     => "string_lang",
        }
    }
}

/// One column value of a typed row.
///
/// String variants hold the text; the block offset is assigned when the
/// row is encoded against the table's pool.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    PackedFlags(i32),
    Str(String),
    StrLang(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Int32(_)       => FieldKind::Int32,
            FieldValue::UInt32(_)      => FieldKind::UInt32,
            FieldValue::Int64(_)       => FieldKind::Int64,
            FieldValue::UInt64(_)      => FieldKind::UInt64,
            FieldValue::Float(_)       => FieldKind::Float,
            FieldValue::PackedFlags(_) => FieldKind::PackedFlags,
            FieldValue::Str(_)         => FieldKind::Str,
            FieldValue::StrLang(_)     => FieldKind::StrLang,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.kind().width()
    }

    /// Append the wire encoding of this value to `out`, interning strings.
    pub fn encode_into(&self, out: &mut Vec<u8>, pool: &mut StringPool) {
        match self {
            FieldValue::Int32(v) | FieldValue::PackedFlags(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Int64(v)  => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::UInt64(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Float(v)  => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Str(s)    => out.extend_from_slice(&pool.intern(s).to_le_bytes()),
            FieldValue::StrLang(s) => {
                out.extend_from_slice(&pool.intern(s).to_le_bytes());
                for _ in 1..LOCALE_SLOTS {
                    out.extend_from_slice(&pool.intern("").to_le_bytes());
                }
                out.extend_from_slice(&LOCALE_FLAGS.to_le_bytes());
            }
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            FieldValue::Int32(v) | FieldValue::PackedFlags(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) | FieldValue::StrLang(s) => Some(s),
            _ => None,
        }
    }
}

/// `field_count` and `record_size` of a table, derived from its column kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub field_count: u32,
    pub record_size: u32,
}

impl TableLayout {
    pub fn from_kinds(kinds: &[FieldKind]) -> Self {
        Self {
            field_count: kinds.iter().map(|k| k.columns()).sum(),
            record_size: kinds.iter().map(|k| k.width() as u32).sum(),
        }
    }
}
