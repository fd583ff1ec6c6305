//! In-memory sort stage.

use std::sync::Arc;

use rayon::slice::ParallelSliceMut;

use crate::pipeline::Stopwatch;
use crate::sequence::{forward_error, Sequence};

/// Collects the whole input, sorts it in ascending order and re-emits it.
/// Nothing is emitted before the input is closed, so the input must fit in memory.
///
/// # Arguments
/// * `input` - Sequence to be sorted
/// * `thread_pool` - Pool used to sort the collected records in parallel
/// * `capacity` - Output queue capacity
/// * `stopwatch` - Pipeline stopwatch used for timing reports
pub fn in_mem_sort(
    mut input: Sequence,
    thread_pool: Arc<rayon::ThreadPool>,
    capacity: usize,
    stopwatch: Stopwatch,
) -> Sequence {
    let upstream = input.take_stages();

    let mut output = Sequence::spawn("in-memory sort", capacity, move |out| {
        let mut records = Vec::new();
        for item in input {
            match item {
                Ok(record) => records.push(record),
                Err(err) => return forward_error(&out, err),
            }
        }
        log::info!("read done ({} records): {:?}", records.len(), stopwatch.elapsed());

        thread_pool.install(|| {
            records.par_sort_unstable();
        });
        log::info!("in-memory sort done: {:?}", stopwatch.elapsed());

        for record in records {
            if out.send(Ok(record)).is_err() {
                break;
            }
        }
        return Ok(());
    });
    output.extend_stages(upstream);

    return output;
}

#[cfg(test)]
mod test {
    use std::io::{self, ErrorKind};
    use std::sync::Arc;

    use rand::seq::SliceRandom;
    use rstest::*;

    use super::in_mem_sort;
    use crate::error::PipelineError;
    use crate::pipeline::Stopwatch;
    use crate::record::Record;
    use crate::sequence::Sequence;
    use crate::source::array_source;

    #[fixture]
    fn thread_pool() -> Arc<rayon::ThreadPool> {
        Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap())
    }

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![5, 6, 3, 4, 9, 8, 2], vec![2, 3, 4, 5, 6, 8, 9])]
    #[case(vec![3, 2, 6, 7, 4], vec![2, 3, 4, 6, 7])]
    #[case(vec![1, 1, -1, i64::MAX, i64::MIN, 0], vec![i64::MIN, -1, 0, 1, 1, i64::MAX])]
    fn test_in_mem_sort(
        thread_pool: Arc<rayon::ThreadPool>,
        #[case] input: Vec<Record>,
        #[case] expected: Vec<Record>,
    ) {
        let sorted = in_mem_sort(array_source(input), thread_pool, 1024, Stopwatch::start());

        let actual: Result<Vec<Record>, _> = sorted.collect();
        assert_eq!(actual.unwrap(), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(16)]
    fn test_in_mem_sort_permutation(thread_pool: Arc<rayon::ThreadPool>, #[case] capacity: usize) {
        let expected = Vec::from_iter(0..1000);
        let mut shuffled = expected.clone();
        shuffled.shuffle(&mut rand::thread_rng());

        let sorted = in_mem_sort(array_source(shuffled), thread_pool, capacity, Stopwatch::start());

        let actual: Result<Vec<Record>, _> = sorted.collect();
        assert_eq!(actual.unwrap(), expected);
    }

    #[rstest]
    fn test_in_mem_sort_keeps_upstream_stages(thread_pool: Arc<rayon::ThreadPool>) {
        let sorted = in_mem_sort(array_source(vec![2, 1]), thread_pool, 4, Stopwatch::start());

        assert_eq!(sorted.stages_count(), 2);
        assert!(sorted.join().is_ok());
    }

    #[rstest]
    fn test_in_mem_sort_forwards_error(thread_pool: Arc<rayon::ThreadPool>) {
        let input = Sequence::spawn("faulty", 0, |out| {
            out.send(Ok(2)).unwrap();
            out.send(Err(PipelineError::IO(io::Error::new(ErrorKind::Other, "test error"))))
                .unwrap();
            Ok(())
        });

        let mut sorted = in_mem_sort(input, thread_pool, 4, Stopwatch::start());

        match sorted.next() {
            Some(Err(err)) => assert_eq!(err.to_string(), "I/O operation failed: test error"),
            other => panic!("unexpected item: {:?}", other),
        }
        assert!(sorted.next().is_none());
    }
}
