//! Input chunking.

use crate::error::PipelineError;
use crate::record::RECORD_SIZE;

const RECORD_WIDTH: u64 = RECORD_SIZE as u64;

/// Contiguous byte range of the input handled by one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset of the first record.
    pub offset: u64,
    /// Byte length, a multiple of the record width except possibly for the last chunk
    /// of a truncated input.
    pub len: u64,
}

/// Split of an input into record aligned chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunk_size: u64,
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Splits the input into at most `chunk_count` chunks of equal size.
    /// The chunk size is ⌈total_len / chunk_count⌉ rounded up to the record width,
    /// so small inputs may produce fewer chunks than requested.
    ///
    /// # Arguments
    /// * `total_len` - Input length in bytes
    /// * `chunk_count` - Desired number of chunks
    pub fn by_count(total_len: u64, chunk_count: usize) -> Result<Self, PipelineError> {
        if chunk_count == 0 {
            return Err(PipelineError::InvalidChunkCount(chunk_count));
        }

        let chunk_size = div_ceil(total_len, chunk_count as u64);
        let chunk_size = div_ceil(chunk_size, RECORD_WIDTH).max(1).saturating_mul(RECORD_WIDTH);

        return Self::by_size(total_len, chunk_size);
    }

    /// Splits the input into chunks of `chunk_size` bytes, the last one may be shorter.
    ///
    /// # Arguments
    /// * `total_len` - Input length in bytes
    /// * `chunk_size` - Chunk size in bytes, must be a positive multiple of the record width
    pub fn by_size(total_len: u64, chunk_size: u64) -> Result<Self, PipelineError> {
        if chunk_size == 0 || chunk_size % RECORD_WIDTH != 0 {
            return Err(PipelineError::MisalignedChunk(chunk_size));
        }
        if total_len % RECORD_WIDTH != 0 {
            log::warn!(
                "input length {} is not a multiple of the record width, the last record is truncated",
                total_len
            );
        }

        let chunks = Vec::from_iter(
            (0..div_ceil(total_len, chunk_size))
                .map(|idx| idx * chunk_size)
                .map(|offset| Chunk {
                    offset,
                    len: chunk_size.min(total_len - offset),
                }),
        );
        log::info!("input of {} bytes split into {} chunks of {} bytes", total_len, chunks.len(), chunk_size);

        return Ok(ChunkPlan { chunk_size, chunks });
    }

    /// Returns the nominal chunk size.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Returns the chunks in input order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn div_ceil(value: u64, divisor: u64) -> u64 {
    value / divisor + u64::from(value % divisor != 0)
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::{Chunk, ChunkPlan};
    use crate::error::PipelineError;

    #[rstest]
    #[case(400, 4, 104, vec![(0, 104), (104, 104), (208, 104), (312, 88)])]
    #[case(64, 4, 16, vec![(0, 16), (16, 16), (32, 16), (48, 16)])]
    #[case(64, 1, 64, vec![(0, 64)])]
    #[case(16, 4, 8, vec![(0, 8), (8, 8)])]
    #[case(0, 3, 8, vec![])]
    #[case(20, 2, 16, vec![(0, 16), (16, 4)])]
    fn test_plan_by_count(
        #[case] total_len: u64,
        #[case] chunk_count: usize,
        #[case] chunk_size: u64,
        #[case] expected: Vec<(u64, u64)>,
    ) {
        let plan = ChunkPlan::by_count(total_len, chunk_count).unwrap();

        assert_eq!(plan.chunk_size(), chunk_size);
        assert!(plan.len() <= chunk_count);
        let expected = Vec::from_iter(expected.into_iter().map(|(offset, len)| Chunk { offset, len }));
        assert_eq!(plan.chunks(), expected.as_slice());
    }

    #[rstest]
    #[case(80, 32, vec![(0, 32), (32, 32), (64, 16)])]
    #[case(32, 64, vec![(0, 32)])]
    #[case(0, 8, vec![])]
    #[case(100, u64::MAX - 7, vec![(0, 100)])]
    #[case(u64::MAX - 7, u64::MAX - 7, vec![(0, u64::MAX - 7)])]
    fn test_plan_by_size(#[case] total_len: u64, #[case] chunk_size: u64, #[case] expected: Vec<(u64, u64)>) {
        let plan = ChunkPlan::by_size(total_len, chunk_size).unwrap();

        let expected = Vec::from_iter(expected.into_iter().map(|(offset, len)| Chunk { offset, len }));
        assert_eq!(plan.chunks(), expected.as_slice());
        assert_eq!(plan.is_empty(), expected.is_empty());
    }

    #[rstest]
    #[case(0)]
    #[case(12)]
    #[case(1)]
    fn test_plan_misaligned(#[case] chunk_size: u64) {
        match ChunkPlan::by_size(64, chunk_size) {
            Err(PipelineError::MisalignedChunk(size)) => assert_eq!(size, chunk_size),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[rstest]
    #[case(0, 1, 0)]
    #[case(7, 8, 1)]
    #[case(8, 8, 1)]
    #[case(9, 8, 2)]
    #[case(u64::MAX, 8, u64::MAX / 8 + 1)]
    #[case(100, u64::MAX, 1)]
    fn test_div_ceil(#[case] value: u64, #[case] divisor: u64, #[case] expected: u64) {
        assert_eq!(super::div_ceil(value, divisor), expected);
    }

    #[test]
    fn test_plan_zero_chunks() {
        assert!(matches!(
            ChunkPlan::by_count(64, 0),
            Err(PipelineError::InvalidChunkCount(0))
        ));
    }
}
