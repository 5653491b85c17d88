// crates/mpack-core/tests/stream_unpack.rs
//
// Stream-mode decoding across arbitrary byte boundaries: one-byte-per-call
// sources, exact source accounting, end-of-stream idempotence, recursive
// skip, and the raw payload sub-reader.

use std::io::Read;

use mpack_core::{pack, Kind, MpError, UnpackStream};

/// A source that hands out at most one byte per read call.
struct OneByte<'a> {
    data: &'a [u8],
    at: usize,
}

impl<'a> OneByte<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, at: 0 }
    }
}

impl Read for OneByte<'_> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.at == self.data.len() || out.is_empty() {
            return Ok(0);
        }
        out[0] = self.data[self.at];
        self.at += 1;
        Ok(1)
    }
}

fn scenario_doc() -> Vec<u8> {
    // [nil, 1, "Hi"]
    let mut doc = Vec::new();
    pack::write_array_len(&mut doc, 3).unwrap();
    pack::write_nil(&mut doc).unwrap();
    pack::write_int(&mut doc, 1).unwrap();
    pack::write_str(&mut doc, "Hi").unwrap();
    doc
}

#[test]
fn one_byte_at_a_time() {
    let doc = scenario_doc();
    assert_eq!(doc, [0x93, 0xc0, 0x01, 0xa2, b'H', b'i']);

    let mut src = OneByte::new(&doc);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    let header = un.next(&mut src).unwrap().expect("array header");
    assert_eq!(header.size, 3);

    let mut cur = un.open_array(&header).unwrap();

    let h = cur.next(&mut src).unwrap().expect("nil");
    cur.stream().as_nil(&mut src, &h).unwrap();

    let h = cur.next(&mut src).unwrap().expect("int");
    assert_eq!(cur.stream().as_int::<i64, _>(&mut src, &h).unwrap(), 1);

    let h = cur.next(&mut src).unwrap().expect("str");
    assert_eq!(h.kind, Kind::FixStr(2));
    let mut payload = Vec::new();
    cur.stream()
        .raw_reader(&mut src, &h)
        .unwrap()
        .read_to_end(&mut payload)
        .unwrap();
    assert_eq!(payload, b"Hi");

    assert!(cur.next(&mut src).unwrap().is_none());
    assert!(un.next(&mut src).unwrap().is_none());
    assert_eq!(un.bytes_read(), doc.len() as u64);
}

#[test]
fn no_over_read_past_a_value() {
    // A complete value followed by sentinel bytes that belong to whoever
    // owns the source next.
    let mut data = scenario_doc();
    let doc_len = data.len();
    data.extend_from_slice(b"TAIL");

    let mut src = std::io::Cursor::new(data);
    let mut buf = [0u8; 64];
    let mut un = UnpackStream::new(&mut buf);

    let header = un.next(&mut src).unwrap().unwrap();
    un.skip(&mut src, &header).unwrap();

    assert_eq!(un.bytes_read(), doc_len as u64);
    assert_eq!(un.buffered(), 0);

    // The sentinel is still the source's very next byte.
    let mut rest = Vec::new();
    src.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, b"TAIL");
}

#[test]
fn end_of_stream_is_idempotent() {
    let mut src = OneByte::new(&[]);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    // A source that is dry at a value boundary is a clean end, every time.
    for _ in 0..3 {
        assert!(un.next(&mut src).unwrap().is_none());
    }
    assert_eq!(un.bytes_read(), 0);

    // Dry in the middle of a header: an error, and still an error on retry
    // without anything being consumed.
    let truncated = [0xda, 0x01]; // str16 missing one length byte
    let mut src = OneByte::new(&truncated);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);
    for _ in 0..3 {
        match un.next(&mut src) {
            Err(MpError::EndOfStream) => {}
            other => panic!("expected EndOfStream, got {other:?}"),
        }
    }
}

#[test]
fn truncated_payload_surfaces_end_of_stream() {
    let mut doc = Vec::new();
    pack::write_u32(&mut doc, 0xdead_beef).unwrap();
    doc.truncate(3); // tag + 2 of 4 payload bytes

    let mut src = OneByte::new(&doc);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    match un.next(&mut src) {
        Err(MpError::EndOfStream) => {}
        other => panic!("expected EndOfStream, got {other:?}"),
    }
}

#[test]
fn skip_is_total_over_nested_containers() {
    // {"a": [1, 2, 3], "b": {"c": "deep"}} nil
    let mut doc = Vec::new();
    pack::write_map_len(&mut doc, 2).unwrap();
    pack::write_str(&mut doc, "a").unwrap();
    pack::write_array_len(&mut doc, 3).unwrap();
    for i in 1..=3 {
        pack::write_int(&mut doc, i).unwrap();
    }
    pack::write_str(&mut doc, "b").unwrap();
    pack::write_map_len(&mut doc, 1).unwrap();
    pack::write_str(&mut doc, "c").unwrap();
    pack::write_str(&mut doc, "deep").unwrap();
    let map_len = doc.len();
    pack::write_nil(&mut doc).unwrap();

    let mut src = OneByte::new(&doc);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    let header = un.next(&mut src).unwrap().unwrap();
    un.skip(&mut src, &header).unwrap();
    assert_eq!(un.bytes_read(), map_len as u64);

    // The nil after the skipped map is intact.
    let header = un.next(&mut src).unwrap().unwrap();
    assert_eq!(header.kind, Kind::Nil);
    assert!(un.next(&mut src).unwrap().is_none());
}

#[test]
fn skip_on_truncated_container_errors() {
    let mut doc = Vec::new();
    pack::write_array_len(&mut doc, 3).unwrap();
    pack::write_int(&mut doc, 1).unwrap();
    // two declared elements never arrive

    let mut src = OneByte::new(&doc);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    let header = un.next(&mut src).unwrap().unwrap();
    match un.skip(&mut src, &header) {
        Err(MpError::EndOfStream) => {}
        other => panic!("expected EndOfStream, got {other:?}"),
    }
}

#[test]
fn raw_reader_spans_window_and_source() {
    // Payload much larger than the refill buffer, so the reader has to
    // stitch the windowed prefix to the source tail.
    let payload: Vec<u8> = (0..100u8).collect();
    let mut doc = Vec::new();
    pack::write_bin(&mut doc, &payload).unwrap();

    let mut src = std::io::Cursor::new(doc);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    let header = un.next(&mut src).unwrap().unwrap();
    assert_eq!(header.size, 100);

    let mut reader = un.raw_reader(&mut src, &header).unwrap();
    assert_eq!(reader.remaining(), 100);
    let mut got = Vec::new();
    reader.read_to_end(&mut got).unwrap();
    assert_eq!(got, payload);

    assert!(un.next(&mut src).unwrap().is_none());
}

#[test]
fn raw_reader_serves_prefetched_prefix() {
    // A fixstr payload that fits the refill buffer entirely: next()
    // prefetches it, so the reader never touches the source again.
    let mut doc = Vec::new();
    pack::write_str(&mut doc, "abcde").unwrap();
    let doc_len = doc.len();

    let mut src = std::io::Cursor::new(doc);
    let mut buf = [0u8; 16];
    let mut un = UnpackStream::new(&mut buf);

    let header = un.next(&mut src).unwrap().unwrap();
    assert_eq!(un.buffered(), 5);
    assert_eq!(un.bytes_read(), doc_len as u64);

    let mut got = String::new();
    un.raw_reader(&mut src, &header)
        .unwrap()
        .read_to_string(&mut got)
        .unwrap();
    assert_eq!(got, "abcde");
    assert_eq!(un.bytes_read(), doc_len as u64);
}

#[test]
fn scalars_across_refill_cycles() {
    // Values larger than the 8-byte minimum window force compaction.
    let mut doc = Vec::new();
    pack::write_u64(&mut doc, u64::MAX - 5).unwrap();
    pack::write_i64(&mut doc, i64::MIN).unwrap();
    pack::write_f64(&mut doc, 2.5).unwrap();

    let mut src = OneByte::new(&doc);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    let h = un.next(&mut src).unwrap().unwrap();
    assert_eq!(un.as_int::<u64, _>(&mut src, &h).unwrap(), u64::MAX - 5);
    let h = un.next(&mut src).unwrap().unwrap();
    assert_eq!(un.as_int::<i64, _>(&mut src, &h).unwrap(), i64::MIN);
    let h = un.next(&mut src).unwrap().unwrap();
    assert_eq!(un.as_float::<f64, _>(&mut src, &h).unwrap(), 2.5);

    assert!(un.next(&mut src).unwrap().is_none());
    assert_eq!(un.bytes_read(), doc.len() as u64);
}

#[test]
fn stream_map_cursor_alternates_pairs() {
    let mut doc = Vec::new();
    pack::write_map_len(&mut doc, 2).unwrap();
    pack::write_str(&mut doc, "x").unwrap();
    pack::write_int(&mut doc, 1).unwrap();
    pack::write_str(&mut doc, "y").unwrap();
    pack::write_int(&mut doc, 2).unwrap();

    let mut src = std::io::Cursor::new(doc);
    let mut buf = [0u8; 8];
    let mut un = UnpackStream::new(&mut buf);

    let header = un.next(&mut src).unwrap().unwrap();
    let mut cur = un.open_map(&header).unwrap();

    let mut children = 0;
    while let Some(h) = cur.next(&mut src).unwrap() {
        cur.stream().skip(&mut src, &h).unwrap();
        children += 1;
    }
    assert_eq!(children, 4);
    assert_eq!(cur.remaining_pairs(), 0);
}
