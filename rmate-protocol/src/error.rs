//! Error types for rmate-protocol.

use thiserror::Error;

/// All errors that can arise while reading the command stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Underlying socket or pipe read failure.
    #[error("I/O error reading command stream: {0}")]
    Io(#[from] std::io::Error),

    /// The reader hit EOF in the middle of a command.
    #[error("command stream truncated mid-command")]
    TruncatedStream,

    /// The `data:` header value did not parse as an unsigned decimal.
    #[error("malformed data length '{value}'")]
    MalformedNumber { value: String },

    /// Fewer payload bytes were available than the `data:` header declared.
    #[error("short payload: expected {expected} bytes, got {got}")]
    ShortPayload { expected: usize, got: usize },

    /// The byte after the payload was not the terminating newline.
    #[error("payload not followed by terminating newline")]
    UnterminatedPayload,

    /// A mandatory header was missing when the command ended.
    #[error("malformed command: missing mandatory key '{missing}'")]
    MalformedCommand { missing: &'static str },
}
