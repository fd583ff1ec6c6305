//! Record sink.

use std::io::prelude::*;

use crate::error::PipelineError;
use crate::record;
use crate::sequence::Sequence;

/// Drains the input writing every record in arrival order, then flushes the writer
/// and waits for the upstream stages to finish.
/// Returns the number of written records.
///
/// # Arguments
/// * `writer` - Output byte stream
/// * `input` - Sequence to be drained
pub fn write_sink<W: Write>(mut writer: W, mut input: Sequence) -> Result<u64, PipelineError> {
    let mut written: u64 = 0;

    for item in &mut input {
        let record = item?;
        writer.write_all(&record::encode(record)).map_err(PipelineError::IO)?;
        written += 1;
    }
    writer.flush().map_err(PipelineError::IO)?;

    input.join()?;
    log::debug!("sink done ({} records)", written);

    return Ok(written);
}
