//! rmate wire protocol — command framing, parsing, serialization.
//!
//! The wire format is line-oriented text with one optional binary payload
//! per command:
//!
//! ```text
//! <command-name>\n
//! <key>: <value>\n
//! ...
//! data: <N>\n            (if present, always the last key)
//! <N bytes of payload>\n
//!                        (a blank line ends a command without data)
//! .\n                    (ends the command stream)
//! ```
//!
//! Public API surface:
//! - [`types`] — [`Token`], [`RawCommand`], [`OpenRequest`]
//! - [`reader`] — [`CommandReader`], the streaming parser
//! - [`writer`] — `save` / `close` / greeting serializers
//! - [`error`] — [`ProtocolError`]

pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::ProtocolError;
pub use reader::CommandReader;
pub use types::{OpenRequest, RawCommand, Token};
pub use writer::{write_close, write_greeting, write_save};
