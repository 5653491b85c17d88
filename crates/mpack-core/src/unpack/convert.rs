// crates/mpack-core/src/unpack/convert.rs
//
// Scalar conversion rules shared by the buffer and stream unpackers.
// Never a silent wraparound: an unsigned wire value over the signed
// target's range, a negative wire value into an unsigned target, and any
// narrowing that loses information all report InvalidValue.

use crate::error::{MpError, Result};
use crate::tag::Kind;

mod sealed {
    pub trait Sealed {}
}

/// Integer targets for `as_int`.
pub trait Int: sealed::Sealed + Copy {
    #[doc(hidden)]
    fn from_wide(v: i128) -> Option<Self>;
}

macro_rules! impl_int {
    ($($t:ty),* $(,)?) => {$(
        impl sealed::Sealed for $t {}
        impl Int for $t {
            #[inline]
            fn from_wide(v: i128) -> Option<Self> {
                if v < <$t>::MIN as i128 || v > <$t>::MAX as i128 {
                    None
                } else {
                    Some(v as $t)
                }
            }
        }
    )*};
}

impl_int!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Float targets for `as_float`.
pub trait Float: sealed::Sealed + Copy {
    #[doc(hidden)]
    fn from_f32(v: f32) -> Option<Self>;
    #[doc(hidden)]
    fn from_f64(v: f64) -> Option<Self>;
    #[doc(hidden)]
    fn from_wide_int(v: i128) -> Option<Self>;
}

impl sealed::Sealed for f32 {}
impl Float for f32 {
    #[inline]
    fn from_f32(v: f32) -> Option<f32> {
        Some(v)
    }

    // Narrowing must be bit-exact when widened back, the same criterion
    // the minimal-mode encoder uses to pick float32.
    fn from_f64(v: f64) -> Option<f32> {
        let narrow = v as f32;
        if (narrow as f64).to_bits() == v.to_bits() {
            Some(narrow)
        } else {
            None
        }
    }

    fn from_wide_int(v: i128) -> Option<f32> {
        let f = v as f32;
        if f as i128 == v {
            Some(f)
        } else {
            None
        }
    }
}

impl sealed::Sealed for f64 {}
impl Float for f64 {
    #[inline]
    fn from_f32(v: f32) -> Option<f64> {
        Some(v as f64)
    }

    #[inline]
    fn from_f64(v: f64) -> Option<f64> {
        Some(v)
    }

    fn from_wide_int(v: i128) -> Option<f64> {
        let f = v as f64;
        if f as i128 == v {
            Some(f)
        } else {
            None
        }
    }
}

pub(crate) const fn is_numeric(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::PosFixint(_)
            | Kind::NegFixint(_)
            | Kind::Uint8
            | Kind::Uint16
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Int8
            | Kind::Int16
            | Kind::Int32
            | Kind::Int64
            | Kind::Float32
            | Kind::Float64
    )
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn be_u64(b: &[u8]) -> u64 {
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

/// Truncate a wire float toward zero; reject non-finite values and values
/// whose integer part cannot be represented.
fn float_trunc(f: f64) -> Result<i128> {
    let t = f.trunc();
    if !t.is_finite() {
        return Err(MpError::InvalidValue("float has no integer value"));
    }
    if t < i128::MIN as f64 || t >= i128::MAX as f64 {
        return Err(MpError::InvalidValue("float integer part out of range"));
    }
    Ok(t as i128)
}

/// Widen any numeric wire value into an i128. 128 bits hold the full
/// uint64 and int64 ranges, so no wire value is ever clipped here; the
/// target's bounds check happens in `Int::from_wide`.
fn wide_int(kind: Kind, payload: &[u8]) -> Result<i128> {
    Ok(match kind {
        Kind::PosFixint(v) => v as i128,
        Kind::NegFixint(v) => v as i128,
        Kind::Uint8 => payload[0] as i128,
        Kind::Uint16 => be_u16(payload) as i128,
        Kind::Uint32 => be_u32(payload) as i128,
        Kind::Uint64 => be_u64(payload) as i128,
        Kind::Int8 => payload[0] as i8 as i128,
        Kind::Int16 => be_u16(payload) as i16 as i128,
        Kind::Int32 => be_u32(payload) as i32 as i128,
        Kind::Int64 => be_u64(payload) as i64 as i128,
        Kind::Float32 => float_trunc(f32::from_be_bytes([
            payload[0], payload[1], payload[2], payload[3],
        ]) as f64)?,
        Kind::Float64 => float_trunc(f64::from_be_bytes([
            payload[0], payload[1], payload[2], payload[3], payload[4], payload[5], payload[6],
            payload[7],
        ]))?,
        _ => return Err(MpError::InvalidValue("value is not numeric")),
    })
}

pub(crate) fn int_to<T: Int>(kind: Kind, payload: &[u8]) -> Result<T> {
    let wide = wide_int(kind, payload)?;
    T::from_wide(wide).ok_or(MpError::InvalidValue("integer out of range for target"))
}

pub(crate) fn float_to<T: Float>(kind: Kind, payload: &[u8]) -> Result<T> {
    let v = match kind {
        Kind::Float32 => T::from_f32(f32::from_be_bytes([
            payload[0], payload[1], payload[2], payload[3],
        ])),
        Kind::Float64 => T::from_f64(f64::from_be_bytes([
            payload[0], payload[1], payload[2], payload[3], payload[4], payload[5], payload[6],
            payload[7],
        ])),
        Kind::PosFixint(_)
        | Kind::NegFixint(_)
        | Kind::Uint8
        | Kind::Uint16
        | Kind::Uint32
        | Kind::Uint64
        | Kind::Int8
        | Kind::Int16
        | Kind::Int32
        | Kind::Int64 => T::from_wide_int(wide_int(kind, payload)?),
        _ => return Err(MpError::InvalidValue("value is not numeric")),
    };
    v.ok_or(MpError::InvalidValue("narrowing would lose information"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_wire_into_signed_target() {
        // 255 as uint8 does not fit i8.
        assert!(int_to::<i8>(Kind::Uint8, &[0xff]).is_err());
        assert_eq!(int_to::<i16>(Kind::Uint8, &[0xff]).unwrap(), 255);
        // uint64 over i64::MAX does not fit i64.
        assert!(int_to::<i64>(Kind::Uint64, &[0xff; 8]).is_err());
        assert_eq!(int_to::<u64>(Kind::Uint64, &[0xff; 8]).unwrap(), u64::MAX);
    }

    #[test]
    fn negative_wire_into_unsigned_target() {
        assert!(int_to::<u8>(Kind::NegFixint(-1), &[]).is_err());
        assert!(int_to::<u64>(Kind::Int8, &[0xff]).is_err());
    }

    #[test]
    fn float_wire_truncates_toward_zero() {
        let neg_half = (-0.5f64).to_be_bytes();
        assert_eq!(int_to::<i32>(Kind::Float64, &neg_half).unwrap(), 0);

        let big = 1e300f64.to_be_bytes();
        assert!(int_to::<i64>(Kind::Float64, &big).is_err());

        let nan = f64::NAN.to_be_bytes();
        assert!(int_to::<i64>(Kind::Float64, &nan).is_err());
    }

    #[test]
    fn float_narrowing_is_bit_exact_or_rejected() {
        let exact = 1.5f64.to_be_bytes();
        assert_eq!(float_to::<f32>(Kind::Float64, &exact).unwrap(), 1.5);

        let inexact = 0.1f64.to_be_bytes();
        assert!(float_to::<f32>(Kind::Float64, &inexact).is_err());
    }

    #[test]
    fn int_wire_into_float_when_exact() {
        assert_eq!(float_to::<f64>(Kind::PosFixint(7), &[]).unwrap(), 7.0);
        // 2^53 + 1 is not representable in f64.
        let v = ((1u64 << 53) + 1).to_be_bytes();
        assert!(float_to::<f64>(Kind::Uint64, &v).is_err());
        // 16777217 is not representable in f32 but is in f64.
        let v = 16_777_217u32.to_be_bytes();
        assert!(float_to::<f32>(Kind::Uint32, &v).is_err());
        assert_eq!(float_to::<f64>(Kind::Uint32, &v).unwrap(), 16_777_217.0);
    }
}
