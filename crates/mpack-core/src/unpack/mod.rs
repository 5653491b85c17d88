// crates/mpack-core/src/unpack/mod.rs
//
// Buffer-mode unpacker: a view over caller-owned bytes, consumed value by
// value. No I/O, no allocation; payload accessors hand back sub-slices of
// the caller's buffer.

mod convert;
pub mod stream;

pub use convert::{Float, Int};

use crate::error::{MpError, Result};
use crate::header::{decode_header, Header};
use crate::tag::{classify, Kind};

/// Unpacker over a contiguous byte slice.
///
/// `peek` classifies the next tag, `advance` consumes a header, the `as_*`
/// converters consume the payload. A window that runs out mid-header or
/// mid-payload reports `BufferEmpty`; the caller can stitch in a longer
/// view of the same logical stream with `set_append` and retry.
#[derive(Debug, Clone)]
pub struct Unpack<'a> {
    rest: &'a [u8],
    consumed: usize,
}

impl<'a> Unpack<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { rest: buf, consumed: 0 }
    }

    /// Unread bytes of the current view.
    pub fn rest(&self) -> &'a [u8] {
        self.rest
    }

    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    /// Total bytes consumed since `new`.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn bump(&mut self, n: usize) {
        self.rest = &self.rest[n..];
        self.consumed += n;
    }

    fn take_payload(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.rest.len() < n {
            return Err(MpError::BufferEmpty);
        }
        let (head, _) = self.rest.split_at(n);
        self.bump(n);
        Ok(head)
    }

    /// Classify the next value without consuming anything.
    pub fn peek(&self) -> Result<Kind> {
        let b = *self.rest.first().ok_or(MpError::BufferEmpty)?;
        classify(b).ok_or(MpError::UnrecognisedTag(b))
    }

    /// Consume the tag byte plus the header data bytes and return the full
    /// header. Precondition: the window holds at least
    /// `1 + kind.header_data_bytes()` bytes; violating it is a programmer
    /// error, not a data error.
    pub fn advance(&mut self, kind: Kind) -> Header {
        let need = 1 + kind.header_data_bytes();
        debug_assert!(
            self.rest.len() >= need,
            "advance needs {need} bytes, window has {}",
            self.rest.len()
        );
        let header = decode_header(kind, &self.rest[1..need]);
        self.bump(need);
        header
    }

    /// Re-base onto a longer view of the same logical stream, preserving
    /// the unread offset. `old_total_len` is the length of the view this
    /// unpacker was last based on; `new_view` must start with the same
    /// bytes and be at least as long.
    pub fn set_append<'n>(self, old_total_len: usize, new_view: &'n [u8]) -> Unpack<'n> {
        debug_assert!(old_total_len >= self.rest.len());
        debug_assert!(new_view.len() >= old_total_len);
        let unread_at = old_total_len - self.rest.len();
        Unpack {
            rest: &new_view[unread_at..],
            consumed: self.consumed,
        }
    }

    pub fn as_nil(&mut self, header: &Header) -> Result<()> {
        match header.kind {
            Kind::Nil => Ok(()),
            _ => Err(MpError::InvalidValue("value is not nil")),
        }
    }

    pub fn as_bool(&mut self, header: &Header) -> Result<bool> {
        match header.kind {
            Kind::Bool(v) => Ok(v),
            _ => Err(MpError::InvalidValue("value is not a bool")),
        }
    }

    /// Convert a numeric value into the requested integer type. Consumes
    /// the payload; `BufferEmpty` if it has not fully arrived yet.
    pub fn as_int<T: Int>(&mut self, header: &Header) -> Result<T> {
        if !convert::is_numeric(header.kind) {
            return Err(MpError::InvalidValue("value is not numeric"));
        }
        let payload = self.take_payload(header.size as usize)?;
        convert::int_to(header.kind, payload)
    }

    /// Convert a numeric value into the requested float type.
    pub fn as_float<T: Float>(&mut self, header: &Header) -> Result<T> {
        if !convert::is_numeric(header.kind) {
            return Err(MpError::InvalidValue("value is not numeric"));
        }
        let payload = self.take_payload(header.size as usize)?;
        convert::float_to(header.kind, payload)
    }

    /// The raw payload slice of any non-structural value: the data bytes
    /// of a number, the bytes of a str/bin, the data of an ext. Arrays and
    /// maps have no payload slice; their bodies are element streams.
    pub fn as_raw(&mut self, header: &Header) -> Result<&'a [u8]> {
        if header.kind.is_container() {
            return Err(MpError::InvalidValue("containers have no raw payload"));
        }
        self.take_payload(header.size as usize)
    }

    /// Str payload, UTF-8 checked.
    pub fn as_str(&mut self, header: &Header) -> Result<&'a str> {
        if !header.kind.is_str() {
            return Err(MpError::InvalidValue("value is not a string"));
        }
        let payload = self.take_payload(header.size as usize)?;
        std::str::from_utf8(payload).map_err(|_| MpError::InvalidValue("string is not utf-8"))
    }

    /// Bin payload. With the `compat-obsolete-raw` feature the str family
    /// is accepted too, for documents written before bin existed.
    pub fn as_bin(&mut self, header: &Header) -> Result<&'a [u8]> {
        #[cfg(feature = "compat-obsolete-raw")]
        let ok = header.kind.is_bin() || header.kind.is_str();
        #[cfg(not(feature = "compat-obsolete-raw"))]
        let ok = header.kind.is_bin();
        if !ok {
            return Err(MpError::InvalidValue("value is not a binary blob"));
        }
        self.take_payload(header.size as usize)
    }

    pub fn open_array(&mut self, header: &Header) -> Result<ArrayCursor<'_, 'a>> {
        if !header.kind.is_array() {
            return Err(MpError::InvalidValue("value is not an array"));
        }
        Ok(ArrayCursor {
            un: self,
            declared: header.size,
            used: 0,
        })
    }

    pub fn open_map(&mut self, header: &Header) -> Result<MapCursor<'_, 'a>> {
        if !header.kind.is_map() {
            return Err(MpError::InvalidValue("value is not a map"));
        }
        Ok(MapCursor {
            un: self,
            declared: header.size,
            pairs_used: 0,
            on_value: false,
        })
    }
}

/// Child iteration over an opened array. Shares the unpacker's position
/// via an exclusive borrow, so only one cursor can be live at a time.
#[derive(Debug)]
pub struct ArrayCursor<'u, 'a> {
    un: &'u mut Unpack<'a>,
    declared: u32,
    used: u32,
}

impl<'u, 'a> ArrayCursor<'u, 'a> {
    pub fn declared(&self) -> u32 {
        self.declared
    }

    pub fn remaining(&self) -> u32 {
        self.declared - self.used
    }

    /// `None` once the declared element count has been consumed.
    pub fn peek(&self) -> Result<Option<Kind>> {
        if self.used == self.declared {
            return Ok(None);
        }
        self.un.peek().map(Some)
    }

    pub fn advance(&mut self, kind: Kind) -> Header {
        debug_assert!(self.used < self.declared, "advance past the declared length");
        let header = self.un.advance(kind);
        self.used += 1;
        header
    }

    /// The underlying unpacker, for converting the value just advanced
    /// over (or opening a nested container).
    pub fn unpack(&mut self) -> &mut Unpack<'a> {
        self.un
    }
}

/// Child iteration over an opened map. Keys and values are advanced one
/// at a time; a pair counts as consumed once its value has been advanced.
#[derive(Debug)]
pub struct MapCursor<'u, 'a> {
    un: &'u mut Unpack<'a>,
    declared: u32,
    pairs_used: u32,
    on_value: bool,
}

impl<'u, 'a> MapCursor<'u, 'a> {
    pub fn declared(&self) -> u32 {
        self.declared
    }

    pub fn remaining_pairs(&self) -> u32 {
        self.declared - self.pairs_used
    }

    /// True when the next advance consumes a value, false for a key.
    pub fn on_value(&self) -> bool {
        self.on_value
    }

    pub fn peek(&self) -> Result<Option<Kind>> {
        if self.pairs_used == self.declared && !self.on_value {
            return Ok(None);
        }
        self.un.peek().map(Some)
    }

    pub fn advance(&mut self, kind: Kind) -> Header {
        debug_assert!(
            self.pairs_used < self.declared || self.on_value,
            "advance past the declared pair count"
        );
        let header = self.un.advance(kind);
        if self.on_value {
            self.pairs_used += 1;
        }
        self.on_value = !self.on_value;
        header
    }

    pub fn unpack(&mut self) -> &mut Unpack<'a> {
        self.un
    }
}
