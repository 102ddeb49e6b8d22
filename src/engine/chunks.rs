//! Chunk-aligned coordinate grid.
//!
//! Transfers over chunked datasets must issue one I/O op per chunk, never per
//! scalar element, so the grid is a first-class iterator over chunk start
//! offsets with the per-chunk count clamped at the array edges. The number of
//! spans equals the product of ceil(dim / chunk_dim) over all dimensions.

/// One chunk-aligned hyperslab: start offset plus clamped extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub offset: Vec<u64>,
    pub count: Vec<u64>,
}

/// Iterator over the chunk-aligned spans covering `shape` exactly once.
#[derive(Debug, Clone)]
pub struct ChunkGrid {
    shape: Vec<u64>,
    chunk: Vec<u64>,
    next: Option<Vec<u64>>,
}

impl ChunkGrid {
    /// Panics if ranks differ or any chunk dimension is zero; both are
    /// construction bugs, not runtime conditions.
    pub fn new(shape: &[u64], chunk: &[u64]) -> ChunkGrid {
        assert_eq!(shape.len(), chunk.len(), "shape/chunk rank mismatch");
        assert!(
            chunk.iter().all(|&c| c > 0),
            "chunk dimensions must be nonzero"
        );
        let next = if shape.contains(&0) {
            None
        } else {
            Some(vec![0u64; shape.len()])
        };
        ChunkGrid {
            shape: shape.to_vec(),
            chunk: chunk.to_vec(),
            next,
        }
    }

    /// Total number of spans: product of ceil(dim / chunk_dim).
    pub fn span_count(&self) -> u64 {
        self.shape
            .iter()
            .zip(&self.chunk)
            .map(|(&s, &c)| s.div_ceil(c))
            .product()
    }
}

impl Iterator for ChunkGrid {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<ChunkSpan> {
        let offset = self.next.take()?;
        let count: Vec<u64> = offset
            .iter()
            .zip(self.shape.iter().zip(&self.chunk))
            .map(|(&o, (&s, &c))| c.min(s - o))
            .collect();

        // Advance: rightmost axis first, stepping by the chunk extent.
        let mut succ = offset.clone();
        let mut axis = self.shape.len();
        loop {
            if axis == 0 {
                // Rank-0 dataset or odometer wrapped: iteration is done.
                break;
            }
            axis -= 1;
            succ[axis] += self.chunk[axis];
            if succ[axis] < self.shape[axis] {
                self.next = Some(succ);
                break;
            }
            succ[axis] = 0;
        }

        Some(ChunkSpan { offset, count })
    }
}
