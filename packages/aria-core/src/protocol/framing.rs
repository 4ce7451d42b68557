//! Record framing for the parenthesized ASCII wire protocol.
//!
//! Record grammar: `'(' body ')'` followed by an optional `\r\n`. Bodies never
//! contain an unescaped `)`. Multiple records may be concatenated in one
//! segment. Bytes outside records are logged and discarded.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;

/// Longest record the framer will accumulate before giving up.
///
/// The configuration dump is the largest legitimate record stream, but each
/// individual record is short; this bound exists to shed garbage input.
const RECORD_LENGTH_MAX: usize = 512;

/// One complete wire record, stored without its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    body: Bytes,
}

impl Record {
    /// Wraps a record body (no parentheses, no trailing CRLF).
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    /// The raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8 text, or `None` for non-ASCII garbage.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Frames the record for transmission: `(body)\r\n`.
    pub fn frame(&self) -> Bytes {
        let mut framed = BytesMut::with_capacity(self.body.len() + 4);
        framed.extend_from_slice(b"(");
        framed.extend_from_slice(&self.body);
        framed.extend_from_slice(b")\r\n");
        framed.freeze()
    }
}

impl From<String> for Record {
    fn from(body: String) -> Self {
        Self::new(body)
    }
}

impl From<&str> for Record {
    fn from(body: &str) -> Self {
        Self::new(Bytes::copy_from_slice(body.as_bytes()))
    }
}

/// Streaming codec for parenthesized records.
#[derive(Debug, Default)]
pub struct RecordCodec {
    _private: (),
}

impl RecordCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RecordCodec {
    type Item = Record;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Record>, Self::Error> {
        // Discard anything ahead of the next record opener. Trailing CRLF
        // from the previous record lands here too.
        match src.iter().position(|&b| b == b'(') {
            Some(0) => {}
            Some(start) => {
                let skipped = &src[..start];
                if !skipped.iter().all(|&b| b == b'\r' || b == b'\n') {
                    log::warn!(
                        "[Framer] Discarding {} byte(s) outside any record",
                        start
                    );
                }
                src.advance(start);
            }
            None => {
                if !src.is_empty()
                    && !src.iter().all(|&b| b == b'\r' || b == b'\n')
                {
                    log::warn!(
                        "[Framer] Discarding {} byte(s) outside any record",
                        src.len()
                    );
                }
                src.clear();
                return Ok(None);
            }
        }

        match src.iter().position(|&b| b == b')') {
            Some(end) => {
                let mut record = src.split_to(end + 1);
                src.reserve(1);
                record.advance(1); // '('
                record.truncate(record.len() - 1); // ')'
                Ok(Some(Record { body: record.freeze() }))
            }
            None if src.len() > RECORD_LENGTH_MAX => {
                Err(FrameError::RecordTooLong(RECORD_LENGTH_MAX))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<&Record> for RecordCodec {
    type Error = FrameError;

    fn encode(&mut self, record: &Record, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&record.frame());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &str) -> Vec<String> {
        let mut codec = RecordCodec::new();
        let mut buffer = BytesMut::from(input.as_bytes());
        let mut bodies = Vec::new();
        while let Ok(Some(record)) = codec.decode(&mut buffer) {
            bodies.push(record.body_str().unwrap_or("<binary>").to_string());
        }
        bodies
    }

    #[test]
    fn decodes_a_single_record() {
        assert_eq!(decode_all("(MZ3)\r\n"), vec!["MZ3"]);
    }

    #[test]
    fn decodes_concatenated_records() {
        assert_eq!(
            decode_all("(VOL1,-10)\r\n(MUTE11)(QO1)\r\n"),
            vec!["VOL1,-10", "MUTE11", "QO1"]
        );
    }

    #[test]
    fn record_without_crlf_is_accepted() {
        assert_eq!(decode_all("(QX)"), vec!["QX"]);
    }

    #[test]
    fn bytes_outside_records_are_discarded() {
        assert_eq!(decode_all("garbage(VU2)\r\nnoise"), vec!["VU2"]);
    }

    #[test]
    fn partial_record_waits_for_more_bytes() {
        let mut codec = RecordCodec::new();
        let mut buffer = BytesMut::from(&b"(VOL1,"[..]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());
        buffer.extend_from_slice(b"-10)\r\n");
        let record = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(record.body_str(), Some("VOL1,-10"));
    }

    #[test]
    fn oversized_accumulation_errors() {
        let mut codec = RecordCodec::new();
        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(b"(");
        buffer.extend_from_slice(&vec![b'x'; RECORD_LENGTH_MAX + 1]);
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(FrameError::RecordTooLong(_))
        ));
    }

    #[test]
    fn frame_round_trips() {
        let record = Record::from("BAL3,L40");
        assert_eq!(&record.frame()[..], b"(BAL3,L40)\r\n");
        assert_eq!(decode_all("(BAL3,L40)\r\n"), vec!["BAL3,L40"]);
    }
}
