//! Streaming command reader.
//!
//! [`CommandReader`] pulls framed commands off a blocking byte stream one at
//! a time. The framing layer ([`CommandReader::next_raw`]) understands any
//! command name; [`CommandReader::next_open`] sits on top and yields only
//! `open` requests, logging and skipping everything else.

use std::io::BufRead;

use crate::error::ProtocolError;
use crate::types::{OpenRequest, RawCommand};

/// Line that terminates the whole command stream.
const STREAM_TERMINATOR: &str = ".";

pub struct CommandReader<R> {
    inner: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Next `open` request, or `None` once the stream ends (`.` or EOF).
    ///
    /// Commands with an unrecognized name are logged at `warn` and skipped;
    /// their whole frame (headers and payload, if any) is consumed.
    pub fn next_open(&mut self) -> Result<Option<OpenRequest>, ProtocolError> {
        loop {
            let Some(raw) = self.next_raw()? else {
                return Ok(None);
            };
            if raw.name == "open" {
                return OpenRequest::from_raw(raw).map(Some);
            }
            tracing::warn!(command = %raw.name, "skipping unknown command");
        }
    }

    /// Next framed command, or `None` once the stream ends.
    pub fn next_raw(&mut self) -> Result<Option<RawCommand>, ProtocolError> {
        // Command name: skip blank separator lines; `.` and EOF both end
        // the stream.
        let name = loop {
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            if line.is_empty() {
                continue;
            }
            if line == STREAM_TERMINATOR {
                return Ok(None);
            }
            break line;
        };

        let mut fields = Vec::new();
        let mut data = None;

        // Header block: ends at a blank line, or immediately after the
        // payload when a `data:` header appears. EOF here is truncation.
        loop {
            let line = self.read_line()?.ok_or(ProtocolError::TruncatedStream)?;
            if line.is_empty() {
                break;
            }
            let Some((key, value)) = line.split_once(": ") else {
                // Lines without a `key: value` shape are ignored.
                continue;
            };
            if key == "data" {
                let len: usize =
                    value
                        .parse()
                        .map_err(|_| ProtocolError::MalformedNumber {
                            value: value.to_owned(),
                        })?;
                data = Some(self.read_payload(len)?);
                break;
            }
            fields.push((key.to_owned(), value.to_owned()));
        }

        Ok(Some(RawCommand { name, fields, data }))
    }

    /// One line without its trailing `\n`; `None` at EOF.
    fn read_line(&mut self) -> Result<Option<String>, ProtocolError> {
        let mut buf = Vec::new();
        let n = self.inner.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Exactly `len` payload bytes plus the terminating newline.
    fn read_payload(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.inner.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(ProtocolError::ShortPayload {
                    expected: len,
                    got: filled,
                });
            }
            filled += n;
        }

        let mut terminator = [0u8; 1];
        match self.inner.read(&mut terminator)? {
            0 => Err(ProtocolError::TruncatedStream),
            _ if terminator[0] != b'\n' => Err(ProtocolError::UnterminatedPayload),
            _ => Ok(buf),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Token;

    fn reader(bytes: &[u8]) -> CommandReader<&[u8]> {
        CommandReader::new(bytes)
    }

    #[test]
    fn parses_open_with_payload() {
        let input = b"open\ndisplay-name: h:/f.txt\nreal-path: /f.txt\ntoken: T1\ndata-on-save: yes\ndata: 5\nhello\n.\n";
        let mut r = reader(input);
        let open = r.next_open().expect("parse").expect("one open");
        assert_eq!(open.token, Token::from("T1"));
        assert_eq!(open.real_path, "/f.txt");
        assert!(open.data_on_save);
        assert_eq!(open.data.as_deref(), Some(b"hello".as_slice()));
        assert!(r.next_open().expect("end of stream").is_none());
    }

    #[test]
    fn parses_open_without_data() {
        let input = b"open\ndisplay-name: h:/f\nreal-path: /f\ntoken: T\ndata-on-save: no\n\n.\n";
        let mut r = reader(input);
        let open = r.next_open().expect("parse").expect("one open");
        assert!(!open.data_on_save);
        assert!(open.data.is_none());
    }

    #[test]
    fn payload_may_end_with_newline_byte() {
        // 6 payload bytes, the last of which is itself '\n'; the framing
        // newline after the payload is separate.
        let input = b"open\ndisplay-name: h:/f\nreal-path: /f\ntoken: T\ndata: 6\nhello\n\n.\n";
        let mut r = reader(input);
        let open = r.next_open().expect("parse").expect("one open");
        assert_eq!(open.data.as_deref(), Some(b"hello\n".as_slice()));
        assert!(r.next_open().expect("end").is_none());
    }

    #[test]
    fn empty_payload_roundtrips() {
        let input = b"open\ndisplay-name: h:/f\nreal-path: /f\ntoken: T\ndata: 0\n\n.\n";
        let mut r = reader(input);
        let open = r.next_open().expect("parse").expect("one open");
        assert_eq!(open.data.as_deref(), Some(b"".as_slice()));
    }

    #[test]
    fn unknown_command_is_skipped() {
        let input = b"foo\nx: y\n\nopen\ndisplay-name: h:/f\nreal-path: /f\ntoken: T\n\n.\n";
        let mut r = reader(input);
        let open = r.next_open().expect("parse").expect("open after foo");
        assert_eq!(open.token, Token::from("T"));
    }

    #[test]
    fn blank_lines_between_commands_are_ignored() {
        let input = b"\n\nopen\ndisplay-name: h:/f\nreal-path: /f\ntoken: T\n\n\n.\n";
        let mut r = reader(input);
        assert!(r.next_open().expect("parse").is_some());
        assert!(r.next_open().expect("end").is_none());
    }

    #[test]
    fn eof_without_terminator_ends_stream() {
        let input = b"open\ndisplay-name: h:/f\nreal-path: /f\ntoken: T\n\n";
        let mut r = reader(input);
        assert!(r.next_open().expect("parse").is_some());
        assert!(r.next_open().expect("clean EOF").is_none());
    }

    #[test]
    fn eof_mid_command_is_truncated_stream() {
        let input = b"open\ndisplay-name: h:/f\n";
        let mut r = reader(input);
        let err = r.next_open().expect_err("must fail");
        assert!(matches!(err, ProtocolError::TruncatedStream));
    }

    #[test]
    fn bad_data_length_is_malformed_number() {
        let input = b"open\ntoken: T\ndata: x5\nhello\n";
        let mut r = reader(input);
        let err = r.next_open().expect_err("must fail");
        assert!(matches!(err, ProtocolError::MalformedNumber { .. }));
    }

    #[test]
    fn short_payload_reports_byte_counts() {
        let input = b"open\ntoken: T\ndata: 10\nhi";
        let mut r = reader(input);
        let err = r.next_open().expect_err("must fail");
        match err {
            ProtocolError::ShortPayload { expected, got } => {
                assert_eq!(expected, 10);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_mandatory_key_is_malformed_command() {
        let input = b"open\ndisplay-name: h:/f\ntoken: T\n\n.\n";
        let mut r = reader(input);
        let err = r.next_open().expect_err("must fail");
        assert!(matches!(
            err,
            ProtocolError::MalformedCommand {
                missing: "real-path"
            }
        ));
    }

    #[test]
    fn lines_without_colon_space_are_ignored() {
        let input =
            b"open\ngarbage line\ndisplay-name: h:/f\nreal-path: /f\ntoken: T\n\n.\n";
        let mut r = reader(input);
        let open = r.next_open().expect("parse").expect("open");
        assert_eq!(open.token, Token::from("T"));
    }

    #[test]
    fn two_opens_arrive_in_wire_order() {
        let input = b"open\ndisplay-name: h:/a\nreal-path: /a\ntoken: A\n\nopen\ndisplay-name: h:/b\nreal-path: /b\ntoken: B\n\n.\n";
        let mut r = reader(input);
        assert_eq!(
            r.next_open().expect("first").expect("first").token,
            Token::from("A")
        );
        assert_eq!(
            r.next_open().expect("second").expect("second").token,
            Token::from("B")
        );
        assert!(r.next_open().expect("end").is_none());
    }
}
