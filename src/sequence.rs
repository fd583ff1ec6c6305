//! Record sequences connecting pipeline stages.
//!
//! Every stage runs on its own thread and sends records through a single-producer/single-consumer
//! bounded queue. The producer closes the queue by dropping its sending half; the consumer observes
//! that as the end of the sequence. Faults travel through the same queue as an `Err` item.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{self, Receiver, Sender};

use crate::error::PipelineError;
use crate::record::Record;

/// Sequence item: a record or a fault raised by some upstream stage.
pub type Item = Result<Record, PipelineError>;

/// Sending half of a sequence, owned by the producing stage.
pub type RecordSender = Sender<Item>;

/// Handle of a running pipeline stage.
pub struct Stage {
    name: &'static str,
    handle: JoinHandle<Result<(), PipelineError>>,
}

impl Stage {
    /// Runs `body` on a new thread.
    pub fn spawn<F>(name: &'static str, body: F) -> Self
    where
        F: FnOnce() -> Result<(), PipelineError> + Send + 'static,
    {
        log::trace!("spawning {} stage", name);
        // spawn failure panics, as thread::spawn does
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .expect("failed to spawn stage thread");

        Stage { name, handle }
    }

    /// Returns the stage name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for the stage to finish.
    pub fn join(self) -> Result<(), PipelineError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(PipelineError::StagePanicked(self.name)),
        }
    }
}

/// Ordered stream of records with an explicit end.
///
/// A sequence also carries the handles of the stages feeding it, so whoever drains it last
/// can wait for the whole upstream tree with [`Sequence::join`].
pub struct Sequence {
    receiver: Receiver<Item>,
    stages: Vec<Stage>,
}

impl Sequence {
    /// Spawns a producing stage writing to a new queue.
    ///
    /// # Arguments
    /// * `name` - Stage name used in logs and panic reports
    /// * `capacity` - Queue capacity, `0` makes every send wait for a matching receive
    /// * `producer` - Stage body, the queue is closed when it returns
    pub fn spawn<F>(name: &'static str, capacity: usize, producer: F) -> Self
    where
        F: FnOnce(RecordSender) -> Result<(), PipelineError> + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let stage = Stage::spawn(name, move || producer(sender));

        return Sequence {
            receiver,
            stages: vec![stage],
        };
    }

    /// Creates an already closed sequence.
    pub fn empty() -> Self {
        let (_, receiver) = crossbeam_channel::bounded(0);

        return Sequence {
            receiver,
            stages: Vec::new(),
        };
    }

    /// Moves the upstream stage handles out of the sequence.
    /// Used by consuming stages that hand their input over to a worker thread.
    pub fn take_stages(&mut self) -> Vec<Stage> {
        std::mem::take(&mut self.stages)
    }

    /// Registers additional upstream stages.
    pub fn extend_stages(&mut self, stages: impl IntoIterator<Item = Stage>) {
        self.stages.extend(stages);
    }

    /// Number of stages registered as upstream of this sequence.
    pub fn stages_count(&self) -> usize {
        self.stages.len()
    }

    /// Stops consuming and waits for every upstream stage to finish.
    /// Returns the first stage error, all stages are joined regardless.
    pub fn join(self) -> Result<(), PipelineError> {
        let Sequence { receiver, stages } = self;
        // unblock producers still waiting on a full queue
        drop(receiver);

        let mut result = Ok(());
        for stage in stages {
            let name = stage.name();
            if let Err(err) = stage.join() {
                log::debug!("{} stage failed: {}", name, err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        return result;
    }
}

impl Iterator for Sequence {
    type Item = Item;

    /// Blocks until the next item is available. Returns [`None`] once the producer closed the queue
    /// and every item has been received.
    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

/// Sends a fault downstream.
/// If nobody listens anymore the fault is returned so that it surfaces on stage join instead.
pub(crate) fn forward_error(out: &RecordSender, err: PipelineError) -> Result<(), PipelineError> {
    match out.send(Err(err)) {
        Ok(()) => Ok(()),
        Err(crossbeam_channel::SendError(item)) => item.map(|_| ()),
    }
}
