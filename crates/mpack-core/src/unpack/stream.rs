// crates/mpack-core/src/unpack/stream.rs
//
// Stream-mode unpacker. Wraps a caller-provided refill buffer and is
// driven by an external byte source, borrowed on each call. Reads are
// need-driven: the unpacker asks the source for exactly the bytes the
// current value still requires, never beyond it, so a source shared with
// other framing is left positioned at the value boundary.
//
// The window of unconsumed bytes is a contiguous sub-slice of the refill
// buffer. When the tail has no room left and the window sits past offset
// zero, the window is compacted to the front, at most once per refill
// cycle.

use std::io::Read;

use super::convert;
use super::{Float, Int};
use crate::error::{MpError, Result};
use crate::header::{decode_header, Header};
use crate::tag::{classify, Kind};

/// Smallest refill buffer that can hold any header plus any primitive
/// payload. A larger buffer (one page) cuts down on source calls for big
/// payloads but does not change behaviour.
pub const MIN_REFILL: usize = 8;

#[derive(Debug)]
pub struct UnpackStream<'b> {
    buf: &'b mut [u8],
    start: usize,
    len: usize,
    bytes_read: u64,
}

impl<'b> UnpackStream<'b> {
    /// Wrap a refill buffer. Panics if it is smaller than [`MIN_REFILL`];
    /// that is a configuration error, not a data error.
    pub fn new(buf: &'b mut [u8]) -> Self {
        assert!(
            buf.len() >= MIN_REFILL,
            "refill buffer must be at least {MIN_REFILL} bytes"
        );
        Self { buf, start: 0, len: 0, bytes_read: 0 }
    }

    /// Total bytes pulled from sources so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Unconsumed bytes currently sitting in the window.
    pub fn buffered(&self) -> usize {
        self.len
    }

    fn window(&self) -> &[u8] {
        &self.buf[self.start..self.start + self.len]
    }

    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.start += n;
        self.len -= n;
        if self.len == 0 {
            self.start = 0;
        }
    }

    /// Pull at most `want` more bytes from the source into the tail of the
    /// refill buffer. Returns the byte count from this single source call;
    /// zero means the source is dry right now.
    fn refill<R: Read>(&mut self, src: &mut R, want: usize) -> Result<usize> {
        let mut tail_at = self.start + self.len;
        if tail_at == self.buf.len() && self.start > 0 {
            self.buf.copy_within(self.start..tail_at, 0);
            self.start = 0;
            tail_at = self.len;
        }
        let room = self.buf.len() - tail_at;
        debug_assert!(room > 0, "refill with a full window");
        let take = want.min(room);
        let n = src.read(&mut self.buf[tail_at..tail_at + take])?;
        self.len += n;
        self.bytes_read += n as u64;
        Ok(n)
    }

    /// Block until the window holds `n` bytes. `n` must fit the refill
    /// buffer; headers and primitive payloads always do.
    fn ensure<R: Read>(&mut self, src: &mut R, n: usize) -> Result<()> {
        debug_assert!(n <= self.buf.len(), "ensure beyond the refill buffer");
        while self.len < n {
            if self.refill(src, n - self.len)? == 0 {
                return Err(MpError::EndOfStream);
            }
        }
        Ok(())
    }

    /// Assemble the next value's header, refilling as needed. `Ok(None)`
    /// when the source ends cleanly at a value boundary; `EndOfStream` when
    /// it dries up mid-value.
    ///
    /// Fetches up to the kind's `fetch_hint` (capped by the refill buffer)
    /// so a payload whose size the tag already fixes is windowed before the
    /// caller converts it. The hint never crosses the value boundary, so
    /// the no-over-read guarantee is preserved.
    pub fn next<R: Read>(&mut self, src: &mut R) -> Result<Option<Header>> {
        if self.len == 0 && self.refill(src, 1)? == 0 {
            return Ok(None);
        }
        let b = self.window()[0];
        let kind = classify(b).ok_or(MpError::UnrecognisedTag(b))?;
        let need = 1 + kind.header_data_bytes();
        let want = (1 + kind.fetch_hint()).min(self.buf.len());
        debug_assert!(want >= need);
        self.ensure(src, want)?;
        let header = decode_header(kind, &self.window()[1..need]);
        self.consume(need);
        Ok(Some(header))
    }

    pub fn as_nil<R: Read>(&mut self, _src: &mut R, header: &Header) -> Result<()> {
        match header.kind {
            Kind::Nil => Ok(()),
            _ => Err(MpError::InvalidValue("value is not nil")),
        }
    }

    pub fn as_bool<R: Read>(&mut self, _src: &mut R, header: &Header) -> Result<bool> {
        match header.kind {
            Kind::Bool(v) => Ok(v),
            _ => Err(MpError::InvalidValue("value is not a bool")),
        }
    }

    /// Window the payload (numeric payloads are at most 8 bytes), consume
    /// it, convert. A failed conversion still consumes the value.
    fn scalar_payload<R: Read>(&mut self, src: &mut R, header: &Header) -> Result<([u8; 8], usize)> {
        if !convert::is_numeric(header.kind) {
            return Err(MpError::InvalidValue("value is not numeric"));
        }
        let n = header.size as usize;
        debug_assert!(n <= 8);
        self.ensure(src, n)?;
        let mut tmp = [0u8; 8];
        tmp[..n].copy_from_slice(&self.window()[..n]);
        self.consume(n);
        Ok((tmp, n))
    }

    pub fn as_int<T: Int, R: Read>(&mut self, src: &mut R, header: &Header) -> Result<T> {
        let (tmp, n) = self.scalar_payload(src, header)?;
        convert::int_to(header.kind, &tmp[..n])
    }

    pub fn as_float<T: Float, R: Read>(&mut self, src: &mut R, header: &Header) -> Result<T> {
        let (tmp, n) = self.scalar_payload(src, header)?;
        convert::float_to(header.kind, &tmp[..n])
    }

    /// A reader over the payload of a non-structural value: first the
    /// bytes already in the window, then a length-capped tail straight
    /// from the source. While it is alive the unpacker is exclusively
    /// borrowed; dropping it early leaves the unpacker mid-payload.
    pub fn raw_reader<'s, R: Read>(
        &'s mut self,
        src: &'s mut R,
        header: &Header,
    ) -> Result<RawReader<'s, 'b, R>> {
        if header.kind.is_container() {
            return Err(MpError::InvalidValue("containers have no raw payload"));
        }
        Ok(RawReader {
            remaining: header.size as u64,
            un: self,
            src,
        })
    }

    pub fn open_array<'s>(&'s mut self, header: &Header) -> Result<ArrayCursor<'s, 'b>> {
        if !header.kind.is_array() {
            return Err(MpError::InvalidValue("value is not an array"));
        }
        Ok(ArrayCursor { un: self, declared: header.size, used: 0 })
    }

    pub fn open_map<'s>(&'s mut self, header: &Header) -> Result<MapCursor<'s, 'b>> {
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

    /// Consume a whole value, recursing through containers. Total: either
    /// the value is fully skipped or the truncation surfaces as
    /// `EndOfStream`.
    pub fn skip<R: Read>(&mut self, src: &mut R, header: &Header) -> Result<()> {
        let children: u64 = if header.kind.is_array() {
            header.size as u64
        } else if header.kind.is_map() {
            2 * header.size as u64
        } else {
            return self.drain(src, header.size as usize);
        };
        for _ in 0..children {
            let child = match self.next(src)? {
                Some(h) => h,
                None => return Err(MpError::EndOfStream),
            };
            self.skip(src, &child)?;
        }
        Ok(())
    }

    fn drain<R: Read>(&mut self, src: &mut R, mut left: usize) -> Result<()> {
        loop {
            let take = left.min(self.len);
            self.consume(take);
            left -= take;
            if left == 0 {
                return Ok(());
            }
            if self.refill(src, left)? == 0 {
                return Err(MpError::EndOfStream);
            }
        }
    }
}

/// Payload reader returned by [`UnpackStream::raw_reader`]. Guarantees at
/// most `size - prefix` additional source bytes are pulled.
#[derive(Debug)]
pub struct RawReader<'s, 'b, R> {
    un: &'s mut UnpackStream<'b>,
    src: &'s mut R,
    remaining: u64,
}

impl<R> RawReader<'_, '_, R> {
    /// Payload bytes not yet read out.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<R: Read> Read for RawReader<'_, '_, R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 || out.is_empty() {
            return Ok(0);
        }
        let cap = (out.len() as u64).min(self.remaining) as usize;

        // Serve the windowed prefix first.
        if self.un.len > 0 {
            let take = cap.min(self.un.len);
            out[..take].copy_from_slice(&self.un.window()[..take]);
            self.un.consume(take);
            self.remaining -= take as u64;
            return Ok(take);
        }

        let n = self.src.read(&mut out[..cap])?;
        self.un.bytes_read += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Array child iterator driving the stream unpacker.
#[derive(Debug)]
pub struct ArrayCursor<'s, 'b> {
    un: &'s mut UnpackStream<'b>,
    declared: u32,
    used: u32,
}

impl<'s, 'b> ArrayCursor<'s, 'b> {
    pub fn declared(&self) -> u32 {
        self.declared
    }

    pub fn remaining(&self) -> u32 {
        self.declared - self.used
    }

    /// Header of the next element, or `None` once the declared count has
    /// been consumed. A source that ends inside the array is an error.
    pub fn next<R: Read>(&mut self, src: &mut R) -> Result<Option<Header>> {
        if self.used == self.declared {
            return Ok(None);
        }
        match self.un.next(src)? {
            Some(header) => {
                self.used += 1;
                Ok(Some(header))
            }
            None => Err(MpError::EndOfStream),
        }
    }

    /// The underlying unpacker, for consuming the element just entered.
    pub fn stream(&mut self) -> &mut UnpackStream<'b> {
        self.un
    }
}

/// Map child iterator; keys and values alternate, a pair completes on the
/// value.
#[derive(Debug)]
pub struct MapCursor<'s, 'b> {
    un: &'s mut UnpackStream<'b>,
    declared: u32,
    pairs_used: u32,
    on_value: bool,
}

impl<'s, 'b> MapCursor<'s, 'b> {
    pub fn declared(&self) -> u32 {
        self.declared
    }

    pub fn remaining_pairs(&self) -> u32 {
        self.declared - self.pairs_used
    }

    pub fn on_value(&self) -> bool {
        self.on_value
    }

    pub fn next<R: Read>(&mut self, src: &mut R) -> Result<Option<Header>> {
        if self.pairs_used == self.declared && !self.on_value {
            return Ok(None);
        }
        match self.un.next(src)? {
            Some(header) => {
                if self.on_value {
                    self.pairs_used += 1;
                }
                self.on_value = !self.on_value;
                Ok(Some(header))
            }
            None => Err(MpError::EndOfStream),
        }
    }

    pub fn stream(&mut self) -> &mut UnpackStream<'b> {
        self.un
    }
}
