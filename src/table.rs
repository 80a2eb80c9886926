//! [`DbcTable`]: header + rows + string block, the surface every table
//! producer works against.
//!
//! ```no_run
//! use wdbc::{DbcTable, FieldKind, TableLayout, TypedRow};
//!
//! let layout = TableLayout::from_kinds(&[FieldKind::Int32, FieldKind::StrLang]);
//! let mut table = DbcTable::new("ZoneNames.dbc", layout);
//! let mut row = TypedRow::new();
//! row.add_int32(1).add_string_lang("Qeynos Hills");
//! table.add_row(row);
//! table.save("out")?;
//! # Ok::<(), wdbc::DbcError>(())
//! ```
//!
//! # Load
//! Records are sliced into [`Row::Raw`] in file order.  The trailing string
//! block is kept as a decode buffer for later column re-reads.  Loading an
//! already loaded table resets it first; any failure leaves it unloaded.
//!
//! # Save
//! Every row is encoded against one pool shared by the whole table.  While
//! raw rows remain, that pool starts as the loaded string block so their
//! offsets stay valid and an untouched table writes back byte-identical.
//! `record_count` and `string_block_size` are recomputed; `field_count` and
//! `record_size` are taken as set.  Width checks happen before any I/O.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{DbcError, Result};
use crate::field::{FieldValue, TableLayout};
use crate::header::{TableHeader, HEADER_SIZE};
use crate::row::{Row, RowReader, TypedRow};
use crate::string_pool::StringPool;

#[derive(Debug, Clone, Default)]
pub struct DbcTable {
    file_name:    String,
    header:       TableHeader,
    rows:         Vec<Row>,
    string_block: Vec<u8>,
    loaded:       bool,
}

impl DbcTable {
    // ── Construction ─────────────────────────────────────────────────────────

    pub fn new(file_name: impl Into<String>, layout: TableLayout) -> Self {
        Self {
            file_name: file_name.into(),
            header: TableHeader::new(layout.field_count, layout.record_size),
            ..Default::default()
        }
    }

    /// Decode a complete table image held in memory.
    pub fn from_bytes(file_name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let (header, rows, string_block) = decode_image(bytes)?;
        Ok(Self { file_name: file_name.into(), header, rows, string_block, loaded: true })
    }

    // ── Load ─────────────────────────────────────────────────────────────────

    /// Load `folder/file_name`, replacing any previously loaded content.
    ///
    /// A missing file is reported as [`DbcError::FileNotFound`], which
    /// callers treat as "optional table absent".
    pub fn load<P: AsRef<Path>>(&mut self, folder: P, file_name: &str) -> Result<()> {
        if self.loaded {
            info!(table = %self.file_name, "table already loaded, resetting");
            self.reset();
        }

        let path = folder.as_ref().join(file_name);
        if !path.is_file() {
            warn!(path = %path.display(), "table file does not exist");
            return Err(DbcError::FileNotFound(path));
        }

        debug!(path = %path.display(), "loading table");
        let bytes = fs::read(&path)?;
        let (header, rows, string_block) = decode_image(&bytes)?;

        self.file_name    = file_name.to_owned();
        self.header       = header;
        self.rows         = rows;
        self.string_block = string_block;
        self.loaded       = true;
        debug!(
            table = %self.file_name,
            records = header.record_count,
            record_size = header.record_size,
            string_block = header.string_block_size,
            "table loaded"
        );
        Ok(())
    }

    /// Load, then immediately re-read every raw row through `hook`.
    pub fn load_with<P, F>(&mut self, folder: P, file_name: &str, hook: F) -> Result<()>
    where
        P: AsRef<Path>,
        F: FnMut(&mut RowReader<'_>) -> Result<()>,
    {
        self.load(folder, file_name)?;
        self.reinterpret_rows(hook)
    }

    /// Replace every raw row with the typed row `hook` decodes from it.
    ///
    /// The hook must read the entire record.  On any error no row is
    /// replaced.
    pub fn reinterpret_rows<F>(&mut self, mut hook: F) -> Result<()>
    where
        F: FnMut(&mut RowReader<'_>) -> Result<()>,
    {
        let mut converted = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            match row {
                Row::Raw(bytes) => {
                    let mut reader = RowReader::new(bytes, &self.string_block);
                    hook(&mut reader)?;
                    converted.push(Row::Typed(reader.finish(index)?));
                }
                Row::Typed(_) => converted.push(row.clone()),
            }
        }
        self.rows = converted;
        debug!(table = %self.file_name, rows = self.rows.len(), "rows reinterpreted");
        Ok(())
    }

    fn reset(&mut self) {
        self.header = TableHeader::default();
        self.rows.clear();
        self.string_block.clear();
        self.loaded = false;
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Append a row; returns its index.
    pub fn add_row(&mut self, row: TypedRow) -> usize {
        self.rows.push(Row::Typed(row));
        self.rows.len() - 1
    }

    pub fn push_row(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Append one field to an existing typed row.
    ///
    /// A raw row is rejected with [`DbcError::MixedRowKind`]; re-read it
    /// through [`DbcTable::reinterpret_rows`] or replace it whole instead.
    pub fn append_field(&mut self, index: usize, value: FieldValue) -> Result<()> {
        match self.row_mut(index)? {
            Row::Typed(row) => {
                row.push(value);
                Ok(())
            }
            Row::Raw(_) => Err(DbcError::MixedRowKind { row: index }),
        }
    }

    /// Swap a row for a fully typed one, returning the previous row.
    pub fn replace_row(&mut self, index: usize, row: TypedRow) -> Result<Row> {
        let slot = self.row_mut(index)?;
        Ok(std::mem::replace(slot, Row::Typed(row)))
    }

    pub fn remove_row(&mut self, index: usize) -> Result<Row> {
        if index >= self.rows.len() {
            return Err(DbcError::RowOutOfRange { index, len: self.rows.len() });
        }
        Ok(self.rows.remove(index))
    }

    /// Stable sort by each row's sort keys; raw rows carry none and lead.
    pub fn sort_rows(&mut self) {
        self.rows.sort_by_key(Row::sort_keys);
    }

    pub fn set_layout(&mut self, layout: TableLayout) {
        self.header.field_count = layout.field_count;
        self.header.record_size = layout.record_size;
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    // ── Access ───────────────────────────────────────────────────────────────

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    pub fn layout(&self) -> TableLayout {
        TableLayout { field_count: self.header.field_count, record_size: self.header.record_size }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Result<&mut Row> {
        let len = self.rows.len();
        self.rows.get_mut(index).ok_or(DbcError::RowOutOfRange { index, len })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The loaded string block, used to resolve string columns of raw rows.
    pub fn string_block(&self) -> &[u8] {
        &self.string_block
    }

    /// Index of the first row whose column 0 equals `id`.
    pub fn find_row_by_id(&self, id: i32) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == Some(id))
    }

    // ── Save ─────────────────────────────────────────────────────────────────

    /// Check every row against `record_size` without encoding anything.
    pub fn validate(&self) -> Result<()> {
        let record_size = self.header.record_size;
        for (row, r) in self.rows.iter().enumerate() {
            let encoded = r.encoded_len();
            if encoded != record_size as usize {
                return Err(DbcError::SchemaMismatch { row, encoded, record_size });
            }
        }
        Ok(())
    }

    fn encode(&self) -> Result<(TableHeader, Vec<u8>, StringPool)> {
        self.validate()?;

        let mut pool = if self.rows.iter().any(Row::is_raw) {
            StringPool::from_block(self.string_block.clone())
        } else {
            StringPool::new()
        };

        let record_bytes = self.rows.len() * self.header.record_size as usize;
        let mut content = Vec::with_capacity(record_bytes);
        for row in &self.rows {
            row.encode_into(&mut content, &mut pool);
        }

        let header = TableHeader {
            record_count:      self.rows.len() as u32,
            string_block_size: pool.byte_length() as u32,
            ..self.header
        };
        let mut out = Vec::with_capacity(HEADER_SIZE + content.len() + pool.byte_length());
        header.write(&mut out)?;
        out.extend_from_slice(&content);
        out.extend_from_slice(pool.as_bytes());
        Ok((header, out, pool))
    }

    /// Encode the complete file image without touching the filesystem.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.encode().map(|(_, bytes, _)| bytes)
    }

    /// Write the table to `folder/<file_name>`, replacing any existing file.
    ///
    /// Nothing is written if any row has the wrong width.
    pub fn save<P: AsRef<Path>>(&mut self, folder: P) -> Result<PathBuf> {
        if self.file_name.is_empty() {
            return Err(DbcError::MissingFileName);
        }
        let path = folder.as_ref().join(&self.file_name);
        debug!(path = %path.display(), rows = self.rows.len(), "saving table");

        let (header, bytes, pool) = self.encode()?;

        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        fs::write(&partial, &bytes)?;
        if let Err(e) = replace_file(&partial, &path) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }

        self.header = header;
        self.string_block = pool.into_bytes();
        debug!(
            path = %path.display(),
            records = header.record_count,
            string_block = header.string_block_size,
            "table saved"
        );
        Ok(path)
    }
}

fn replace_file(partial: &Path, path: &Path) -> std::io::Result<()> {
    if path.exists() {
        debug!(path = %path.display(), "replacing existing file");
        fs::remove_file(path)?;
    }
    fs::rename(partial, path)
}

/// Split a file image into header, raw rows and string block.
fn decode_image(bytes: &[u8]) -> Result<(TableHeader, Vec<Row>, Vec<u8>)> {
    let header = TableHeader::decode(bytes)?;
    let needed = header.file_len();
    let available = bytes.len() as u64;
    if available < needed {
        return Err(DbcError::Truncated { needed, available });
    }
    if available > needed {
        warn!(extra = available - needed, "ignoring trailing bytes after string block");
    }

    if header.record_size == 0 && header.record_count > 0 {
        return Err(DbcError::ZeroRecordSize { record_count: header.record_count });
    }

    let mut cursor = HEADER_SIZE;
    let fits = (bytes.len() - HEADER_SIZE) / (header.record_size as usize).max(1);
    let mut rows = Vec::with_capacity((header.record_count as usize).min(fits));
    for _ in 0..header.record_count {
        rows.push(Row::decode_raw(bytes, &mut cursor, header.record_size)?);
    }
    let string_block = bytes[cursor..cursor + header.string_block_size as usize].to_vec();
    Ok((header, rows, string_block))
}
