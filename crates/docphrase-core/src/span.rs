//! Source spans, buffer identity and snapshot generations.
//!
//! Every text run in a comment tree carries a [`TextSpan`]: a byte range into
//! the original source buffer, stamped with the buffer it belongs to and the
//! tree generation it was computed from. Rewriting a tree bumps its
//! [`Generation`], which turns every span handed out for the previous
//! generation into a stale span that the rewrite builder refuses to apply.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given text, returning the hex-encoded digest.
    pub fn compute(data: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the source buffer (usually one file) a comment was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer_{}", self.0)
    }
}

/// Version stamp distinguishing snapshots of the same comment.
///
/// Generation 0 is the snapshot supplied by the host; every applied rewrite
/// produces the next generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation that follows this one.
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen_{}", self.0)
    }
}

/// Byte range into a source buffer, scoped to one tree generation.
///
/// Spans are half-open intervals: `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    /// Buffer the offsets refer to.
    pub buffer: BufferId,
    /// Tree generation the span was computed from.
    pub generation: Generation,
    /// Start byte offset (inclusive).
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

impl TextSpan {
    /// Create a span in the given buffer and generation.
    pub fn new(buffer: BufferId, generation: Generation, start: usize, len: usize) -> Self {
        TextSpan {
            buffer,
            generation,
            start,
            len,
        }
    }

    /// Create a span from a `[start, end)` range.
    ///
    /// An `end` before `start` yields an empty span at `start`.
    pub fn from_range(buffer: BufferId, generation: Generation, start: usize, end: usize) -> Self {
        TextSpan::new(buffer, generation, start, end.saturating_sub(start))
    }

    /// End byte offset (exclusive).
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if this span overlaps with another.
    ///
    /// Two spans overlap if they share any byte positions. Adjacent spans do
    /// NOT overlap, and an empty span overlaps nothing.
    pub fn overlaps(&self, other: &TextSpan) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.buffer == other.buffer
            && self.start < other.end()
            && other.start < self.end()
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &TextSpan) -> bool {
        self.buffer == other.buffer && self.start <= other.start && other.end() <= self.end()
    }

    /// Same range, re-stamped with another generation.
    pub fn with_generation(self, generation: Generation) -> Self {
        TextSpan { generation, ..self }
    }

    /// Sub-span at `[offset, offset + len)` relative to this span's start.
    pub fn sub(&self, offset: usize, len: usize) -> Self {
        TextSpan::new(self.buffer, self.generation, self.start + offset, len)
    }

    /// Slice the buffer text covered by this span.
    ///
    /// Returns `None` if the span is out of bounds or splits a UTF-8 sequence.
    pub fn slice<'a>(&self, buffer: &'a str) -> Option<&'a str> {
        buffer.get(self.start..self.end())
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}[{}, {})",
            self.buffer,
            self.generation,
            self.start,
            self.end()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
