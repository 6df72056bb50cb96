//! Memory-bounded chunk planning
//!
//! Partitions a dataset into contiguous, ordered row batches sized to a byte
//! budget. The plan is a lazy iterator; because datasets are immutable per
//! call it can be regenerated freely.

use crate::dataset::Dataset;

const BYTES_PER_MB: usize = 1024 * 1024;

/// A contiguous, non-owning row range `[start, end)` over a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// First row of the range (inclusive)
    pub start: usize,
    /// One past the last row of the range
    pub end: usize,
    /// Byte budget the range was sized against
    pub budget_bytes: usize,
}

impl Chunk {
    /// Number of rows in this chunk
    pub fn rows(&self) -> usize {
        self.end - self.start
    }
}

/// Lazy, ordered sequence of chunks covering `[0, N)`.
///
/// Every row appears in exactly one chunk, chunk order matches row order, and
/// only the final chunk may hold fewer than `rows_per_chunk` rows. A zero-row
/// dataset yields zero chunks.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    total_rows: usize,
    rows_per_chunk: usize,
    budget_bytes: usize,
    cursor: usize,
}

impl ChunkPlan {
    /// Plan chunks for a dataset against a budget in megabytes.
    ///
    /// Rows per chunk derive from the dataset's average estimated row width:
    /// `max(1, floor(budget_bytes / avg_row_bytes))` with a real-valued
    /// average, computed as `budget_bytes * N / total_bytes` so the average
    /// is never floored first.
    pub fn new(dataset: &Dataset, chunk_size_mb: usize) -> Self {
        let total_rows = dataset.rows();
        let budget_bytes = chunk_size_mb * BYTES_PER_MB;
        let total_bytes = dataset.estimated_size();
        let rows_per_chunk = if total_rows == 0 {
            0
        } else if total_bytes == 0 {
            total_rows
        } else {
            (budget_bytes * total_rows / total_bytes).max(1)
        };
        Self {
            total_rows,
            rows_per_chunk,
            budget_bytes,
            cursor: 0,
        }
    }

    /// Rows per full chunk (0 for an empty dataset)
    pub fn rows_per_chunk(&self) -> usize {
        self.rows_per_chunk
    }

    /// Total number of chunks the plan will yield
    pub fn total_chunks(&self) -> usize {
        if self.total_rows == 0 {
            0
        } else {
            self.total_rows.div_ceil(self.rows_per_chunk)
        }
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.cursor >= self.total_rows {
            return None;
        }
        let start = self.cursor;
        let end = (start + self.rows_per_chunk).min(self.total_rows);
        self.cursor = end;
        Some(Chunk {
            start,
            end,
            budget_bytes: self.budget_bytes,
        })
    }
}
