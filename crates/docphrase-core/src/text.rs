//! Byte offset <-> line:column conversion for reporting findings.
//!
//! Lines and columns are 1-indexed; byte offsets are 0-indexed. Columns count
//! Unicode scalar values, so a finding after `é` reports the column an editor
//! shows.

/// Precomputed line starts of one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex {
            starts,
            len: content.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// 1-indexed line containing `offset` (clamped to the end of the text).
    pub fn line_of(&self, offset: usize) -> u32 {
        let offset = offset.min(self.len);
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        line as u32 + 1
    }

    /// `(line, col)` of `offset` in `content`, which must be the text the
    /// index was built from.
    pub fn position(&self, content: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);
        let start = self.starts[line as usize - 1];
        let col = content
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line, col as u32 + 1)
    }

    /// Byte offset of `(line, col)`; positions past a line end clamp to it.
    pub fn offset(&self, content: &str, line: u32, col: u32) -> usize {
        let line = line.max(1) as usize;
        let Some(&start) = self.starts.get(line - 1) else {
            return self.len;
        };
        let end = self.starts.get(line).map(|s| s - 1).unwrap_or(self.len);
        content[start..end]
            .char_indices()
            .nth(col.max(1) as usize - 1)
            .map(|(i, _)| start + i)
            .unwrap_or(end)
    }
}

/// `(line, col)` of `offset` without keeping an index around.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    LineIndex::new(content).position(content, offset)
}

// ============================================================================
// Tests
// ============================================================================
