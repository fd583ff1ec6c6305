//! Record sources.

use std::io::{self, prelude::*};

use rand::Rng;

use crate::error::PipelineError;
use crate::record::{self, Record, RECORD_SIZE};
use crate::sequence::{forward_error, Sequence};

/// Emits the given records over an unbuffered queue.
pub fn array_source<I>(records: I) -> Sequence
where
    I: IntoIterator<Item = Record>,
    I::IntoIter: Send + 'static,
{
    let records = records.into_iter();

    Sequence::spawn("array source", 0, move |out| {
        for record in records {
            if out.send(Ok(record)).is_err() {
                break;
            }
        }
        Ok(())
    })
}

/// Emits `count` uniformly distributed random records over an unbuffered queue.
pub fn random_source(count: usize) -> Sequence {
    Sequence::spawn("random source", 0, move |out| {
        let mut rng = rand::thread_rng();
        for _ in 0..count {
            if out.send(Ok(rng.gen::<Record>())).is_err() {
                break;
            }
        }
        Ok(())
    })
}

/// Decodes records from a byte stream.
/// The sequence ends at the end of the stream or once `chunk_size` bytes have been read.
///
/// # Arguments
/// * `reader` - Byte stream positioned at the first record
/// * `chunk_size` - Read budget in bytes. If the parameter is [`None`] the stream is read to its end.
/// * `capacity` - Output queue capacity
pub fn reader_source<R>(reader: R, chunk_size: Option<u64>, capacity: usize) -> Sequence
where
    R: Read + Send + 'static,
{
    spawn_reader("reader source", reader, chunk_size, capacity)
}

pub(crate) fn spawn_reader<R>(name: &'static str, mut reader: R, chunk_size: Option<u64>, capacity: usize) -> Sequence
where
    R: Read + Send + 'static,
{
    Sequence::spawn(name, capacity, move |out| {
        // reused between reads: a trailing partial record is decoded over the previous record bytes
        let mut buffer = [0u8; RECORD_SIZE];
        let mut bytes_read: u64 = 0;
        let mut records: u64 = 0;

        loop {
            if let Some(chunk_size) = chunk_size {
                if bytes_read >= chunk_size {
                    break;
                }
            }

            let n = match read_word(&mut reader, &mut buffer) {
                Ok(n) => n,
                Err(err) => return forward_error(&out, PipelineError::IO(err)),
            };
            bytes_read += n as u64;

            if n > 0 {
                if n < RECORD_SIZE {
                    log::warn!("{}: trailing partial record of {} bytes", name, n);
                }
                if out.send(Ok(record::decode(buffer))).is_err() {
                    return Ok(());
                }
                records += 1;
            }

            if n < RECORD_SIZE {
                break;
            }
        }

        log::debug!("{} done ({} records, {} bytes)", name, records, bytes_read);
        return Ok(());
    })
}

/// Reads until the buffer is full or the stream ends. Returns the number of bytes read.
fn read_word<R: Read>(reader: &mut R, buffer: &mut [u8; RECORD_SIZE]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    return Ok(filled);
}

#[cfg(test)]
mod test {
    use std::io::{self, ErrorKind, Read};

    use rstest::*;

    use super::{array_source, random_source, reader_source};
    use crate::record::{encode, Record};

    fn encoded(records: &[Record]) -> Vec<u8> {
        records.iter().flat_map(|record| encode(*record)).collect()
    }

    /// Hands out at most `step` bytes per read call.
    struct Trickle {
        data: io::Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(self.step);
            self.data.read(&mut buf[..len])
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::Other, "test error"))
        }
    }

    #[test]
    fn test_array_source() {
        let actual: Result<Vec<Record>, _> = array_source(vec![3, 2, 6, 7, 4]).collect();
        assert_eq!(actual.unwrap(), vec![3, 2, 6, 7, 4]);
    }

    #[test]
    fn test_random_source() {
        let actual: Result<Vec<Record>, _> = random_source(50).collect();
        assert_eq!(actual.unwrap().len(), 50);
    }

    #[rstest]
    #[case(vec![], None, vec![])]
    #[case(vec![1, 2, 3], None, vec![1, 2, 3])]
    #[case(vec![1, 2, 3, 4], Some(16), vec![1, 2])]
    #[case(vec![1, 2, 3, 4], Some(12), vec![1, 2])]
    #[case(vec![1, 2, 3, 4], Some(64), vec![1, 2, 3, 4])]
    #[case(vec![1, 2, 3, 4], Some(0), vec![])]
    fn test_reader_source(
        #[case] records: Vec<Record>,
        #[case] chunk_size: Option<u64>,
        #[case] expected: Vec<Record>,
    ) {
        let reader = io::Cursor::new(encoded(&records));

        let actual: Result<Vec<Record>, _> = reader_source(reader, chunk_size, 4).collect();
        assert_eq!(actual.unwrap(), expected);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(7)]
    fn test_reader_source_short_reads(#[case] step: usize) {
        let records = vec![0, -1, i64::MAX, i64::MIN, 42];
        let reader = Trickle {
            data: io::Cursor::new(encoded(&records)),
            step,
        };

        let actual: Result<Vec<Record>, _> = reader_source(reader, None, 0).collect();
        assert_eq!(actual.unwrap(), records);
    }

    #[test]
    fn test_reader_source_trailing_partial_record() {
        let mut data = encoded(&[0x0102030405060708]);
        data.extend_from_slice(&[0xff, 0xff]);

        let actual: Result<Vec<Record>, _> = reader_source(io::Cursor::new(data), None, 4).collect();
        // the residual bytes overwrite the head of the previous word
        assert_eq!(actual.unwrap(), vec![0x0102030405060708, 0xffff030405060708u64 as i64]);
    }

    #[test]
    fn test_reader_source_error() {
        let mut sequence = reader_source(Broken, None, 4);

        match sequence.next() {
            Some(Err(err)) => assert_eq!(err.to_string(), "I/O operation failed: test error"),
            other => panic!("unexpected item: {:?}", other),
        }
        assert!(sequence.next().is_none());
        assert!(sequence.join().is_ok());
    }
}
