//! Serializers for the daemon-to-client side of the protocol.
//!
//! The daemon only ever sends three things: the greeting line on accept,
//! `save` frames, and `close` frames. Callers are responsible for holding
//! the per-connection write lock across each call; these functions write a
//! complete frame but do not serialize against other writers.

use std::io::{self, Write};

use crate::types::Token;

/// `save` frame: the current contents of a mirrored file.
pub fn write_save<W: Write>(w: &mut W, token: &Token, data: &[u8]) -> io::Result<()> {
    write!(w, "save\ntoken: {token}\ndata: {}\n", data.len())?;
    w.write_all(data)?;
    w.write_all(b"\n")?;
    w.flush()
}

/// `close` frame: the editor for `token` has exited.
pub fn write_close<W: Write>(w: &mut W, token: &Token) -> io::Result<()> {
    write!(w, "close\ntoken: {token}\n\n")?;
    w.flush()
}

/// Greeting line sent once per connection, before any other frame.
pub fn write_greeting<W: Write>(w: &mut W, version: &str) -> io::Result<()> {
    write!(w, "RMate Launcher {version}\n")?;
    w.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_frame_layout() {
        let mut out = Vec::new();
        write_save(&mut out, &Token::from("T1"), b"hello!").expect("write");
        assert_eq!(out, b"save\ntoken: T1\ndata: 6\nhello!\n");
    }

    #[test]
    fn close_frame_layout() {
        let mut out = Vec::new();
        write_close(&mut out, &Token::from("T1")).expect("write");
        assert_eq!(out, b"close\ntoken: T1\n\n");
    }

    #[test]
    fn greeting_layout() {
        let mut out = Vec::new();
        write_greeting(&mut out, "0.1.0").expect("write");
        assert_eq!(out, b"RMate Launcher 0.1.0\n");
    }

    #[test]
    fn empty_save_has_zero_length_payload() {
        let mut out = Vec::new();
        write_save(&mut out, &Token::from("T"), b"").expect("write");
        assert_eq!(out, b"save\ntoken: T\ndata: 0\n\n");
    }
}
