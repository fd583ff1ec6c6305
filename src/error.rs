//! Pipeline error.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;

/// Pipeline error.
#[derive(Debug)]
pub enum PipelineError {
    /// Input or output resource opening/creation error.
    Resource(io::Error),
    /// Read or write error on an already opened resource.
    IO(io::Error),
    /// Listen, accept or dial error.
    Connection(io::Error),
    /// Chunk size is zero or not a multiple of the record width.
    MisalignedChunk(u64),
    /// Chunk count is zero.
    InvalidChunkCount(usize),
    /// Sorting thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
    /// A stage thread panicked.
    StagePanicked(&'static str),
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            PipelineError::Resource(err) => Some(err),
            PipelineError::IO(err) => Some(err),
            PipelineError::Connection(err) => Some(err),
            PipelineError::ThreadPoolBuildError(err) => Some(err),
            PipelineError::MisalignedChunk(_) => None,
            PipelineError::InvalidChunkCount(_) => None,
            PipelineError::StagePanicked(_) => None,
        }
    }
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            PipelineError::Resource(err) => write!(f, "resource not opened: {}", err),
            PipelineError::IO(err) => write!(f, "I/O operation failed: {}", err),
            PipelineError::Connection(err) => write!(f, "connection failed: {}", err),
            PipelineError::MisalignedChunk(size) => {
                write!(f, "chunk size {} is not a positive multiple of the record width", size)
            }
            PipelineError::InvalidChunkCount(count) => write!(f, "invalid chunk count: {}", count),
            PipelineError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
            PipelineError::StagePanicked(stage) => write!(f, "{} stage panicked", stage),
        }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::io::{self, ErrorKind};

    use rstest::*;

    use super::PipelineError;

    #[rstest]
    #[case(
        PipelineError::MisalignedChunk(12),
        "chunk size 12 is not a positive multiple of the record width",
        false
    )]
    #[case(
        PipelineError::Connection(io::Error::new(ErrorKind::ConnectionRefused, "refused")),
        "connection failed: refused",
        true
    )]
    #[case(PipelineError::StagePanicked("merge"), "merge stage panicked", false)]
    fn test_error_display(#[case] err: PipelineError, #[case] expected: &str, #[case] has_source: bool) {
        assert_eq!(err.to_string(), expected);
        assert_eq!(err.source().is_some(), has_source);
    }
}
