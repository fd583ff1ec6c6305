//! `pipe-sort` is an external sort of 64-bit integer records built from channel-connected pipeline stages.
//!
//! The input is split into chunks small enough to be sorted in memory. Every chunk gets its own source and
//! in-memory sort stage, then the sorted chunks are combined by a balanced tree of binary merge stages.
//! Each stage runs on its own thread and talks to its neighbours through bounded queues only, so a slow
//! consumer throttles the whole upstream tree. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Fixed record layout:**
//!   records are signed 64-bit integers stored as 8-byte big-endian words with no framing,
//!   both on disk and on the wire.
//! * **Streaming merge:**
//!   merge stages never collect their inputs, only in-memory sort stages do.
//! * **Network edges:**
//!   any pipeline edge can cross a process or machine boundary through a TCP connection
//!   ([`Pipeline::network_sink`] / [`Pipeline::network_source`]) without changing the stages around it.
//! * **Explicit faults:**
//!   I/O and connection errors travel downstream as `Err` items and stage panics surface when the
//!   sequence is joined.
//!
//! # Example
//!
//! ```no_run
//! use std::fs;
//! use std::path::Path;
//!
//! use pipe_sort::{ChunkPlan, Pipeline, PipelineBuilder};
//!
//! fn main() {
//!     let input = Path::new("large.in");
//!     let plan = ChunkPlan::by_count(fs::metadata(input).unwrap().len(), 4).unwrap();
//!
//!     let pipeline: Pipeline = PipelineBuilder::new().with_queue_capacity(1024).build().unwrap();
//!     let sorted = pipeline.sort_file(input, &plan).unwrap();
//!
//!     pipeline.write_file(Path::new("large.out"), sorted).unwrap();
//! }
//! ```

pub mod chunk;
pub mod error;
pub mod merge;
pub mod net;
pub mod pipeline;
pub mod record;
pub mod sequence;
pub mod sink;
pub mod sort;
pub mod source;

pub use chunk::{Chunk, ChunkPlan};
pub use error::PipelineError;
pub use net::NetworkSink;
pub use pipeline::{Pipeline, PipelineBuilder, Stopwatch};
pub use record::{Record, RECORD_SIZE};
pub use sequence::{Sequence, Stage};
