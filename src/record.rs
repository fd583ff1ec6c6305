//! Record codec.
//!
//! A record is a signed 64-bit integer stored on disk and on the wire as an 8-byte big-endian word.
//! There is no header, delimiter or length prefix, so concatenated record streams are valid record streams.

/// Sorting and transport unit.
pub type Record = i64;

/// Encoded record width in bytes.
pub const RECORD_SIZE: usize = 8;

/// Encodes a record as a big-endian two's-complement word.
pub fn encode(record: Record) -> [u8; RECORD_SIZE] {
    record.to_be_bytes()
}

/// Decodes a big-endian word. Any 8 bytes decode to some record, no validation is performed.
pub fn decode(bytes: [u8; RECORD_SIZE]) -> Record {
    Record::from_be_bytes(bytes)
}
