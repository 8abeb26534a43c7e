//! Cost matrix assembly from batched distance provider calls.

use std::borrow::Borrow;
use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DistanceProviderError, InvalidInputError};
use crate::stop::{LocationKey, Stop};
use crate::traits::DistanceProvider;

/// Dense N x N travel cost in minutes, row-major.
///
/// `get(i, j)` is the travel time from `i` to `j` plus the service time at
/// `i`. Diagonal entries are zero and never consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrix {
    data: Vec<i64>,
    size: usize,
}

impl CostMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size * size],
            size,
        }
    }

    /// Builds a matrix from explicit rows, rejecting ragged or negative input.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, InvalidInputError> {
        let size = rows.len();
        let mut matrix = Self::new(size);
        for (from, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(InvalidInputError::MatrixNotSquare);
            }
            for (to, value) in row.into_iter().enumerate() {
                if from != to && value < 0 {
                    return Err(InvalidInputError::NegativeCost { from, to, value });
                }
                matrix.set(from, to, value);
            }
        }
        Ok(matrix)
    }

    pub fn get(&self, from: usize, to: usize) -> i64 {
        self.data[from * self.size + to]
    }

    pub fn set(&mut self, from: usize, to: usize, cost: i64) {
        self.data[from * self.size + to] = cost;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn rows(&self) -> Vec<Vec<i64>> {
        if self.size == 0 {
            return Vec::new();
        }
        self.data.chunks(self.size).map(<[i64]>::to_vec).collect()
    }
}

/// One provider call: a block of origins by destinations placed at
/// `(row_offset, col_offset)` of the global matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchBlock {
    pub row_offset: usize,
    pub col_offset: usize,
    pub rows: usize,
    pub cols: usize,
}

impl BatchBlock {
    pub fn row_range(&self) -> Range<usize> {
        self.row_offset..self.row_offset + self.rows
    }

    pub fn col_range(&self) -> Range<usize> {
        self.col_offset..self.col_offset + self.cols
    }
}

/// Splits `n` items into `ceil(n / max_chunk)` consecutive chunks whose
/// sizes differ by at most one.
pub fn plan_chunks(n: usize, max_chunk: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let max_chunk = max_chunk.max(1);
    let parts = n.div_ceil(max_chunk);
    let base = n / parts;
    let extra = n % parts;

    let mut chunks = Vec::with_capacity(parts);
    let mut start = 0;
    for part in 0..parts {
        let len = base + usize::from(part < extra);
        chunks.push(start..start + len);
        start += len;
    }
    chunks
}

/// Every (row chunk, column chunk) pair, row-major.
pub fn plan_batches(n: usize, max_chunk: usize) -> Vec<BatchBlock> {
    let chunks = plan_chunks(n, max_chunk);
    let mut blocks = Vec::with_capacity(chunks.len() * chunks.len());
    for rows in &chunks {
        for cols in &chunks {
            blocks.push(BatchBlock {
                row_offset: rows.start,
                col_offset: cols.start,
                rows: rows.len(),
                cols: cols.len(),
            });
        }
    }
    blocks
}

/// Turns stops into a [`CostMatrix`] by issuing one provider call per block.
#[derive(Debug, Clone)]
pub struct TimeMatrixBuilder<'a, P> {
    provider: &'a P,
    batch_size: usize,
    parallel: bool,
}

impl<'a, P> TimeMatrixBuilder<'a, P>
where
    P: DistanceProvider + Sync,
{
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            batch_size: provider.max_batch_size(),
            parallel: false,
        }
    }

    /// Caps the block edge; the provider's own limit still applies.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, self.provider.max_batch_size().max(1));
        self
    }

    /// Fetch blocks concurrently. Assembly order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Node `i` of the matrix is `stops[i]`.
    pub fn build<S: Borrow<Stop>>(&self, stops: &[S]) -> Result<CostMatrix, DistanceProviderError> {
        let keys: Vec<LocationKey> = stops.iter().map(|stop| stop.borrow().location.clone()).collect();
        let blocks = plan_batches(stops.len(), self.batch_size);
        debug!(
            stops = stops.len(),
            batch_size = self.batch_size,
            blocks = blocks.len(),
            "building time matrix"
        );

        let fetched: Vec<Vec<Vec<u64>>> = if self.parallel {
            blocks
                .par_iter()
                .map(|block| self.fetch(&keys, block))
                .collect::<Result<_, _>>()?
        } else {
            blocks
                .iter()
                .map(|block| self.fetch(&keys, block))
                .collect::<Result<_, _>>()?
        };

        let mut matrix = CostMatrix::new(stops.len());
        for (block, durations) in blocks.iter().zip(fetched) {
            for (local_row, row) in durations.into_iter().enumerate() {
                let p = block.row_offset + local_row;
                for (local_col, seconds) in row.into_iter().enumerate() {
                    let q = block.col_offset + local_col;
                    if p == q {
                        continue;
                    }
                    let service = i64::from(stops[p].borrow().service_minutes);
                    matrix.set(p, q, service + seconds_to_minutes(seconds));
                }
            }
        }

        Ok(matrix)
    }

    fn fetch(&self, keys: &[LocationKey], block: &BatchBlock) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        debug!(
            row_offset = block.row_offset,
            col_offset = block.col_offset,
            rows = block.rows,
            cols = block.cols,
            "requesting duration block"
        );
        let durations = self
            .provider
            .batch_durations(&keys[block.row_range()], &keys[block.col_range()])?;

        if durations.len() != block.rows || durations.iter().any(|row| row.len() != block.cols) {
            return Err(DistanceProviderError::MalformedResponse(format!(
                "expected a {}x{} block at ({}, {})",
                block.rows, block.cols, block.row_offset, block.col_offset
            )));
        }
        Ok(durations)
    }
}

fn seconds_to_minutes(seconds: u64) -> i64 {
    i64::try_from(seconds / 60).unwrap_or(i64::MAX)
}
