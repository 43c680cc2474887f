//! Incremental write planning. The planner is a pure iterator over the
//! sequence of row states a chunked write will pass through; pacing and the
//! actual store writes stay with the caller.

/// One step of a chunked write: the cumulative content to store, 1-based
/// progress counters, and whether this is the closing write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWrite {
    pub content: String,
    pub current: u32,
    pub total: u32,
    pub is_final: bool,
}

pub struct ChunkPlan<'a> {
    text: &'a str,
    chunk_size: usize,
    offset: usize,
    current: u32,
    total: u32,
}

/// Splits `text` into `chunk_size`-character slices. Always yields at least
/// one write so the closing write (complete text, `is_final`) happens even
/// for empty content. Slicing respects character boundaries.
pub fn plan(text: &str, chunk_size: usize) -> ChunkPlan<'_> {
    let chunk_size = chunk_size.max(1);
    let chars = text.chars().count();
    let total = (chars.div_ceil(chunk_size)).max(1) as u32;
    ChunkPlan {
        text,
        chunk_size,
        offset: 0,
        current: 0,
        total,
    }
}

impl Iterator for ChunkPlan<'_> {
    type Item = ChunkWrite;

    fn next(&mut self) -> Option<ChunkWrite> {
        if self.current >= self.total {
            return None;
        }
        self.current += 1;
        let remainder = &self.text[self.offset..];
        let advance = remainder
            .char_indices()
            .nth(self.chunk_size)
            .map(|(index, _)| index)
            .unwrap_or(remainder.len());
        self.offset += advance;

        let is_final = self.current == self.total;
        // The closing write carries the input verbatim, so chunk-boundary
        // arithmetic can never truncate the stored result.
        let content = if is_final {
            self.text.to_string()
        } else {
            self.text[..self.offset].to_string()
        };
        Some(ChunkWrite {
            content,
            current: self.current,
            total: self.total,
            is_final,
        })
    }
}
