//! Binary merge stage and merge tree.

use crate::pipeline::Stopwatch;
use crate::sequence::{forward_error, Sequence};

/// Merges two sorted inputs into a single sorted output without collecting them.
/// Inputs should be sorted in ascending order otherwise the result is undefined.
/// On equal records the left one is emitted first.
///
/// # Arguments
/// * `left` - Left sorted input
/// * `right` - Right sorted input
/// * `capacity` - Output queue capacity
/// * `stopwatch` - Pipeline stopwatch used for timing reports
pub fn merge(mut left: Sequence, mut right: Sequence, capacity: usize, stopwatch: Stopwatch) -> Sequence {
    let mut upstream = left.take_stages();
    upstream.extend(right.take_stages());

    let mut output = Sequence::spawn("merge", capacity, move |out| {
        let mut left_head = match left.next().transpose() {
            Ok(head) => head,
            Err(err) => return forward_error(&out, err),
        };
        let mut right_head = match right.next().transpose() {
            Ok(head) => head,
            Err(err) => return forward_error(&out, err),
        };

        loop {
            let (record, from_left) = match (left_head, right_head) {
                (None, None) => break,
                (Some(l), Some(r)) if l <= r => (l, true),
                (Some(l), None) => (l, true),
                (_, Some(r)) => (r, false),
            };

            if out.send(Ok(record)).is_err() {
                return Ok(());
            }

            let next = if from_left { left.next() } else { right.next() };
            let next = match next.transpose() {
                Ok(next) => next,
                Err(err) => return forward_error(&out, err),
            };
            if from_left {
                left_head = next;
            } else {
                right_head = next;
            }
        }

        log::debug!("merge done: {:?}", stopwatch.elapsed());
        return Ok(());
    });
    output.extend_stages(upstream);

    return output;
}

/// Merges any number of sorted inputs through a balanced tree of binary merges.
/// A single input is returned as is, no inputs give an empty sequence.
///
/// # Arguments
/// * `inputs` - Sorted inputs, ties between inputs resolve in list order
/// * `capacity` - Queue capacity of every merge stage
/// * `stopwatch` - Pipeline stopwatch used for timing reports
pub fn merge_all(mut inputs: Vec<Sequence>, capacity: usize, stopwatch: Stopwatch) -> Sequence {
    match inputs.len() {
        0 => Sequence::empty(),
        1 => inputs.remove(0),
        len => {
            let right = inputs.split_off(len / 2);
            merge(
                merge_all(inputs, capacity, stopwatch),
                merge_all(right, capacity, stopwatch),
                capacity,
                stopwatch,
            )
        }
    }
}
