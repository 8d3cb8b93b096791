//! Round-trip laws: frames produced by the serializers parse back through
//! the framing layer with the same token and payload bytes.

use rmate_protocol::{write_close, write_save, CommandReader, Token};
use rstest::rstest;

#[rstest]
#[case::plain(b"hello!".as_slice())]
#[case::empty(b"".as_slice())]
#[case::trailing_newline(b"line one\nline two\n".as_slice())]
#[case::only_newlines(b"\n\n\n".as_slice())]
#[case::binary(&[0u8, 1, 2, 255, 10, 10, 0][..])]
fn save_roundtrips_token_and_payload(#[case] payload: &[u8]) {
    let token = Token::from("T-42");
    let mut wire = Vec::new();
    write_save(&mut wire, &token, payload).expect("serialize save");

    let mut reader = CommandReader::new(wire.as_slice());
    let raw = reader
        .next_raw()
        .expect("parse save frame")
        .expect("one frame");

    assert_eq!(raw.name, "save");
    assert_eq!(raw.field("token"), Some("T-42"));
    assert_eq!(raw.data.as_deref(), Some(payload));
    assert!(reader.next_raw().expect("stream end").is_none());
}

#[test]
fn close_roundtrips_token() {
    let token = Token::from("T-close");
    let mut wire = Vec::new();
    write_close(&mut wire, &token).expect("serialize close");

    let mut reader = CommandReader::new(wire.as_slice());
    let raw = reader
        .next_raw()
        .expect("parse close frame")
        .expect("one frame");

    assert_eq!(raw.name, "close");
    assert_eq!(raw.field("token"), Some("T-close"));
    assert!(raw.data.is_none());
}

#[test]
fn save_then_close_parse_in_order() {
    let token = Token::from("T");
    let mut wire = Vec::new();
    write_save(&mut wire, &token, b"v1").expect("save");
    write_save(&mut wire, &token, b"v2").expect("save");
    write_close(&mut wire, &token).expect("close");

    let mut reader = CommandReader::new(wire.as_slice());
    let names: Vec<String> = std::iter::from_fn(|| {
        reader.next_raw().expect("parse").map(|raw| raw.name)
    })
    .collect();
    assert_eq!(names, ["save", "save", "close"]);
}
