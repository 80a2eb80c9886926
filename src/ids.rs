//! Monotonic identifier allocators.
//!
//! Producers mint record IDs before building rows so that rows in different
//! tables can reference each other.  An allocator walks an ordered list of
//! inclusive ranges; when one is used up it moves on to the next, and when
//! the last is used up every further call fails with [`IdError::Exhausted`].
//!
//! [`IdAllocator`] holds its position behind a mutex and may be shared
//! between worker threads.  [`LocalIdAllocator`] is the unlocked variant for
//! single-threaded producers.  Neither is global: an [`IdAllocators`]
//! registry is built per conversion run and passed to whoever needs it.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("ID allocator '{name}' has exhausted all of its ranges")]
    Exhausted { name: String },
    #[error("Invalid ID range {start}..={end}")]
    InvalidRange { start: i32, end: i32 },
    #[error("ID allocator '{0}' has no ranges")]
    NoRanges(String),
    #[error("Unknown ID allocator '{0}'")]
    UnknownAllocator(String),
    #[error("ID allocator '{0}' is already registered")]
    DuplicateAllocator(String),
}

/// Inclusive range of identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: i32,
    #[serde(default = "open_end")]
    pub end:   i32,
}

fn open_end() -> i32 {
    i32::MAX
}

impl IdRange {
    pub fn new(start: i32, end: i32) -> Result<Self, IdError> {
        if end < start {
            return Err(IdError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range that runs to `i32::MAX`.
    pub fn from_start(start: i32) -> Self {
        Self { start, end: open_end() }
    }

    pub fn contains(&self, id: i32) -> bool {
        (self.start..=self.end).contains(&id)
    }

    /// Number of identifiers in the range.
    pub fn size(&self) -> u64 {
        (self.end as i64 - self.start as i64 + 1) as u64
    }
}

// ── Shared cursor logic ──────────────────────────────────────────────────────

#[derive(Debug)]
struct RangeCursor {
    range: usize,
    next:  i64,
}

impl RangeCursor {
    fn start(ranges: &[IdRange]) -> Self {
        Self { range: 0, next: ranges.first().map_or(0, |r| r.start as i64) }
    }

    fn advance(&mut self, name: &str, ranges: &[IdRange]) -> Result<i32, IdError> {
        while let Some(range) = ranges.get(self.range) {
            if self.next <= range.end as i64 {
                let id = self.next as i32;
                self.next += 1;
                return Ok(id);
            }
            self.range += 1;
            if let Some(following) = ranges.get(self.range) {
                debug!(allocator = name, start = following.start, "moving to next ID range");
                self.next = following.start as i64;
            }
        }
        Err(IdError::Exhausted { name: name.to_owned() })
    }
}

fn check_ranges(name: &str, ranges: &[IdRange]) -> Result<(), IdError> {
    if ranges.is_empty() {
        return Err(IdError::NoRanges(name.to_owned()));
    }
    for r in ranges {
        IdRange::new(r.start, r.end)?;
    }
    Ok(())
}

// ── IdAllocator ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct IdAllocator {
    name:   String,
    ranges: Vec<IdRange>,
    cursor: Mutex<RangeCursor>,
}

impl IdAllocator {
    pub fn new(name: impl Into<String>, ranges: Vec<IdRange>) -> Result<Self, IdError> {
        let name = name.into();
        check_ranges(&name, &ranges)?;
        let cursor = Mutex::new(RangeCursor::start(&ranges));
        Ok(Self { name, ranges, cursor })
    }

    pub fn from_start(name: impl Into<String>, start: i32) -> Self {
        let ranges = vec![IdRange::from_start(start)];
        let cursor = Mutex::new(RangeCursor::start(&ranges));
        Self { name: name.into(), ranges, cursor }
    }

    /// Return the next unused identifier.
    pub fn next(&self) -> Result<i32, IdError> {
        // A panic elsewhere cannot leave the cursor half-updated.
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        cursor.advance(&self.name, &self.ranges)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ranges(&self) -> &[IdRange] {
        &self.ranges
    }
}

// ── LocalIdAllocator ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LocalIdAllocator {
    name:   String,
    ranges: Vec<IdRange>,
    cursor: RangeCursor,
}

impl LocalIdAllocator {
    pub fn new(name: impl Into<String>, ranges: Vec<IdRange>) -> Result<Self, IdError> {
        let name = name.into();
        check_ranges(&name, &ranges)?;
        let cursor = RangeCursor::start(&ranges);
        Ok(Self { name, ranges, cursor })
    }

    pub fn from_start(name: impl Into<String>, start: i32) -> Self {
        let ranges = vec![IdRange::from_start(start)];
        let cursor = RangeCursor::start(&ranges);
        Self { name: name.into(), ranges, cursor }
    }

    pub fn next(&mut self) -> Result<i32, IdError> {
        self.cursor.advance(&self.name, &self.ranges)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Named allocators for one conversion run.
#[derive(Debug, Default)]
pub struct IdAllocators {
    allocators: BTreeMap<String, IdAllocator>,
}

impl IdAllocators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, allocator: IdAllocator) -> Result<(), IdError> {
        if self.allocators.contains_key(allocator.name()) {
            return Err(IdError::DuplicateAllocator(allocator.name.clone()));
        }
        self.allocators.insert(allocator.name.clone(), allocator);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&IdAllocator, IdError> {
        self.allocators
            .get(name)
            .ok_or_else(|| IdError::UnknownAllocator(name.to_owned()))
    }

    pub fn next(&self, name: &str) -> Result<i32, IdError> {
        self.get(name)?.next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IdAllocator> {
        self.allocators.values()
    }

    pub fn len(&self) -> usize {
        self.allocators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocators.is_empty()
    }
}
