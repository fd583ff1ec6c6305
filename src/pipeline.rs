//! Pipeline assembly.

use std::fs;
use std::io::{self, prelude::*};
use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chunk::{Chunk, ChunkPlan};
use crate::error::PipelineError;
use crate::merge;
use crate::net::{self, NetworkSink};
use crate::record::Record;
use crate::sequence::Sequence;
use crate::sink;
use crate::sort;
use crate::source;

/// Default capacity of buffered pipeline queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default host network sinks are bound to.
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";

/// Elapsed time reference shared by the stages of one pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Stopwatch { started: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Pipeline builder. Provides methods for [`Pipeline`] initialization.
#[derive(Clone)]
pub struct PipelineBuilder {
    /// Number of threads to be used to sort chunks in parallel.
    threads_number: Option<usize>,
    /// Capacity of buffered queues.
    queue_capacity: usize,
    /// File and socket read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Host network sinks are bound to.
    bind_host: String,
}

impl PipelineBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        PipelineBuilder::default()
    }

    /// Builds a [`Pipeline`] instance using provided configuration.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        Pipeline::new(
            self.threads_number,
            self.queue_capacity,
            self.rw_buf_size,
            self.bind_host,
        )
    }

    /// Sets number of threads to be used to sort chunks in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> PipelineBuilder {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets capacity of buffered queues.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> PipelineBuilder {
        self.queue_capacity = queue_capacity;
        return self;
    }

    /// Sets file and socket read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> PipelineBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Sets host network sinks are bound to.
    pub fn with_bind_host(mut self, host: &str) -> PipelineBuilder {
        self.bind_host = host.to_string();
        return self;
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        PipelineBuilder {
            threads_number: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            rw_buf_size: None,
            bind_host: DEFAULT_BIND_HOST.to_string(),
        }
    }
}

/// Sorting pipeline factory.
///
/// Every method returning a [`Sequence`] spawns the corresponding stage immediately.
/// Stages run until their input is exhausted; there is no cancellation.
pub struct Pipeline {
    /// Thread pool used by in-memory sort stages.
    thread_pool: Arc<rayon::ThreadPool>,
    /// Capacity of buffered queues.
    queue_capacity: usize,
    /// File and socket read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Host network sinks are bound to.
    bind_host: String,
    /// Started when the pipeline is built.
    stopwatch: Stopwatch,
}

impl Pipeline {
    /// Creates a new pipeline instance.
    ///
    /// # Arguments
    /// * `threads_number` - Number of threads to be used to sort chunks in parallel. If the parameter is [`None`]
    ///   threads number will be selected based on available CPU core number.
    /// * `queue_capacity` - Capacity of buffered queues.
    /// * `rw_buf_size` - File and socket read/write buffer size.
    /// * `bind_host` - Host network sinks are bound to.
    pub fn new(
        threads_number: Option<usize>,
        queue_capacity: usize,
        rw_buf_size: Option<usize>,
        bind_host: String,
    ) -> Result<Self, PipelineError> {
        return Ok(Pipeline {
            thread_pool: Arc::new(Self::init_thread_pool(threads_number)?),
            queue_capacity,
            rw_buf_size,
            bind_host,
            stopwatch: Stopwatch::start(),
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, PipelineError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new();

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(PipelineError::ThreadPoolBuildError)?;

        return Ok(thread_pool);
    }

    /// Returns the pipeline stopwatch.
    pub fn stopwatch(&self) -> Stopwatch {
        self.stopwatch
    }

    /// Returns capacity of buffered queues.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Emits the given records.
    pub fn array_source<I>(&self, records: I) -> Sequence
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: Send + 'static,
    {
        source::array_source(records)
    }

    /// Emits `count` random records.
    pub fn random_source(&self, count: usize) -> Sequence {
        source::random_source(count)
    }

    /// Decodes records from a byte stream, reading at most `chunk_size` bytes if given.
    pub fn reader_source<R>(&self, reader: R, chunk_size: Option<u64>) -> Sequence
    where
        R: Read + Send + 'static,
    {
        source::reader_source(reader, chunk_size, self.queue_capacity)
    }

    /// Decodes records of a single input file chunk.
    pub fn file_source(&self, path: &Path, chunk: Chunk) -> Result<Sequence, PipelineError> {
        let mut file = fs::File::open(path).map_err(PipelineError::Resource)?;
        file.seek(io::SeekFrom::Start(chunk.offset))
            .map_err(PipelineError::IO)?;

        let reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(self.reader_source(reader, Some(chunk.len)));
    }

    /// Sorts the input in memory.
    pub fn sort(&self, input: Sequence) -> Sequence {
        sort::in_mem_sort(input, self.thread_pool.clone(), self.queue_capacity, self.stopwatch)
    }

    /// Merges two sorted inputs.
    pub fn merge(&self, left: Sequence, right: Sequence) -> Sequence {
        merge::merge(left, right, self.queue_capacity, self.stopwatch)
    }

    /// Merges sorted inputs through a balanced merge tree.
    pub fn merge_all(&self, inputs: Vec<Sequence>) -> Sequence {
        merge::merge_all(inputs, self.queue_capacity, self.stopwatch)
    }

    /// Drains the input into a writer. Blocks until the input is exhausted.
    pub fn write_sink<W: Write>(&self, writer: W, input: Sequence) -> Result<u64, PipelineError> {
        sink::write_sink(writer, input)
    }

    /// Drains the input into a newly created file. Blocks until the input is exhausted.
    pub fn write_file(&self, path: &Path, input: Sequence) -> Result<u64, PipelineError> {
        let file = fs::File::create(path).map_err(PipelineError::Resource)?;
        let writer = match self.rw_buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        let written = self.write_sink(writer, input)?;
        log::info!("{} records written to {}: {:?}", written, path.display(), self.stopwatch.elapsed());

        return Ok(written);
    }

    /// Serves the input to the first connection accepted on `addr`.
    pub fn network_sink<A: ToSocketAddrs>(&self, addr: A, input: Sequence) -> Result<NetworkSink, PipelineError> {
        net::network_sink(addr, input, self.rw_buf_size)
    }

    /// Receives a sequence from a network sink listening on `addr`.
    pub fn network_source<A: ToSocketAddrs>(&self, addr: A) -> Result<Sequence, PipelineError> {
        net::network_source(addr, self.queue_capacity, self.rw_buf_size)
    }

    /// Sorts a record file: every chunk is read and sorted on its own, then the sorted chunks
    /// are merged. Returns the sorted sequence.
    ///
    /// # Arguments
    /// * `path` - Input file
    /// * `plan` - Input chunking
    pub fn sort_file(&self, path: &Path, plan: &ChunkPlan) -> Result<Sequence, PipelineError> {
        let mut sorted_chunks = Vec::with_capacity(plan.len());
        for chunk in plan.chunks() {
            log::debug!("chunk at {} ({} bytes)", chunk.offset, chunk.len);
            sorted_chunks.push(self.sort(self.file_source(path, *chunk)?));
        }

        return Ok(self.merge_all(sorted_chunks));
    }

    /// Same as [`Pipeline::sort_file`] but every sorted chunk crosses a TCP connection
    /// before being merged.
    ///
    /// # Arguments
    /// * `path` - Input file
    /// * `plan` - Input chunking
    pub fn sort_file_over_network(&self, path: &Path, plan: &ChunkPlan) -> Result<Sequence, PipelineError> {
        let mut sinks = Vec::with_capacity(plan.len());
        for chunk in plan.chunks() {
            let sink = self
                .file_source(path, *chunk)
                .and_then(|records| self.network_sink((self.bind_host.as_str(), 0), self.sort(records)));
            match sink {
                Ok(sink) => sinks.push(sink),
                Err(err) => return Err(Self::release_sinks(&sinks, err)),
            }
        }

        let mut sources = Vec::with_capacity(sinks.len());
        for sink in sinks.iter() {
            match self.network_source(sink.local_addr()) {
                Ok(source) => sources.push(source),
                // dialed sinks see their source hang up once `sources` is dropped
                Err(err) => return Err(Self::release_sinks(&sinks[sources.len()..], err)),
            }
        }

        let mut merged = self.merge_all(sources);
        merged.extend_stages(sinks.into_iter().map(NetworkSink::into_stage));

        return Ok(merged);
    }

    fn release_sinks(sinks: &[NetworkSink], err: PipelineError) -> PipelineError {
        log::debug!("releasing {} network sinks: {}", sinks.len(), err);
        for sink in sinks {
            sink.release();
        }

        return err;
    }
}
