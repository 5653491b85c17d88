// crates/mpack-core/src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MpError>;

#[derive(Debug, Error)]
pub enum MpError {
    /// The window has no bytes for the next step. Recoverable: append (or
    /// stream in) more input and retry.
    #[error("buffer empty")]
    BufferEmpty,

    /// The lead byte is reserved by the format or not accepted by this build.
    #[error("unrecognised tag: 0x{0:02x}")]
    UnrecognisedTag(u8),

    /// The on-wire kind does not admit the requested conversion, or the
    /// conversion would lose information.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),

    /// Encoder-side: a container or blob length exceeds the 32-bit length
    /// field of the wire format.
    #[error("value too large: {0} does not fit a 32-bit length field")]
    ValueTooLarge(u64),

    /// The byte source ran dry in the middle of a value.
    #[error("end of stream")]
    EndOfStream,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
