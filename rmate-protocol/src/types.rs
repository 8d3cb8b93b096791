//! Wire-level types for the rmate protocol.
//!
//! [`RawCommand`] is the framing layer: any command name, headers in wire
//! order, optional payload. [`OpenRequest`] is the interpreted form of an
//! `open` command; it is the only client command the daemon understands.

use std::fmt;

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Opaque identifier chosen by the client to correlate an `open` with the
/// `save` and `close` frames the daemon sends back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(pub String);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// RawCommand
// ---------------------------------------------------------------------------

/// One framed command as it appeared on the wire, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    pub name: String,
    /// `key: value` headers in wire order. `data` is never listed here.
    pub fields: Vec<(String, String)>,
    /// Binary payload, present when the command carried a `data:` header.
    pub data: Option<Vec<u8>>,
}

impl RawCommand {
    /// First value for `key`, if any.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// OpenRequest
// ---------------------------------------------------------------------------

/// A parsed `open` command: one file the client wants edited locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    /// Label of the form `host:...`, or an arbitrary string.
    pub display_name: String,
    /// Absolute path of the file on the remote host.
    pub real_path: String,
    pub token: Token,
    /// Whether the client wants `save` frames for in-editor modifications.
    pub data_on_save: bool,
    /// Parsed and carried along, never consulted.
    pub re_activate: bool,
    pub selection: Option<String>,
    pub file_type: Option<String>,
    /// Initial file contents, when the client streamed them.
    pub data: Option<Vec<u8>>,
}

impl OpenRequest {
    /// Interpret a raw `open` frame. `display-name`, `real-path`, and
    /// `token` are mandatory; everything else has a default.
    pub fn from_raw(raw: RawCommand) -> Result<Self, ProtocolError> {
        let display_name = raw
            .field("display-name")
            .ok_or(ProtocolError::MalformedCommand {
                missing: "display-name",
            })?
            .to_owned();
        let real_path = raw
            .field("real-path")
            .ok_or(ProtocolError::MalformedCommand {
                missing: "real-path",
            })?
            .to_owned();
        let token = Token::from(
            raw.field("token")
                .ok_or(ProtocolError::MalformedCommand { missing: "token" })?,
        );

        Ok(Self {
            display_name,
            real_path,
            token,
            data_on_save: flag(raw.field("data-on-save")),
            re_activate: flag(raw.field("re-activate")),
            selection: raw.field("selection").map(str::to_owned),
            file_type: raw.field("file-type").map(str::to_owned),
            data: raw.data,
        })
    }

    /// Host component for the mirror path: the prefix of `display-name` up
    /// to the first `:` (the whole name when there is no colon), or
    /// `unknown` when that prefix is empty.
    pub fn host(&self) -> &str {
        let host = self
            .display_name
            .split_once(':')
            .map_or(self.display_name.as_str(), |(host, _)| host);
        if host.is_empty() {
            "unknown"
        } else {
            host
        }
    }
}

/// Boolean header convention: `yes` is true, anything else is false.
fn flag(value: Option<&str>) -> bool {
    value == Some("yes")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
