//! Numeric primitives: width/sign/type descriptors, the mapping between a
//! (kind, bytes) pair and a concrete machine type, and the minimum-bytes
//! calculation used throughout the compression pipeline and the date-delta
//! engine.

use crate::error::{Result, TimeBoxError};
use half::f16;

/// The three value families a tag can hold, matching the original format's
/// single-character `type_char` (`i`, `u`, `f`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum NumericKind {
    Signed,
    Unsigned,
    Float,
}

impl NumericKind {
    /// The on-disk character for this kind: the canonical byte is the
    /// character's own ASCII ordinal (`i` = 0x69, `u` = 0x75, `f` = 0x66).
    pub fn type_char(self) -> char {
        match self {
            NumericKind::Signed => 'i',
            NumericKind::Unsigned => 'u',
            NumericKind::Float => 'f',
        }
    }

    pub fn from_type_char(c: char) -> Result<Self> {
        match c {
            'i' => Ok(NumericKind::Signed),
            'u' => Ok(NumericKind::Unsigned),
            'f' => Ok(NumericKind::Float),
            other => Err(TimeBoxError::UnsupportedType {
                kind: other,
                bytes: 0,
            }),
        }
    }
}

/// A closed set of typed column variants, replacing runtime dtype
/// introspection with dispatch on the variant (per the numeric-primitives
/// redesign guidance).
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TypedColumn {
    pub fn len(&self) -> usize {
        match self {
            TypedColumn::I8(v) => v.len(),
            TypedColumn::I16(v) => v.len(),
            TypedColumn::I32(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::U8(v) => v.len(),
            TypedColumn::U16(v) => v.len(),
            TypedColumn::U32(v) => v.len(),
            TypedColumn::U64(v) => v.len(),
            TypedColumn::F16(v) => v.len(),
            TypedColumn::F32(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            TypedColumn::I8(_) | TypedColumn::I16(_) | TypedColumn::I32(_) | TypedColumn::I64(_) => {
                NumericKind::Signed
            }
            TypedColumn::U8(_) | TypedColumn::U16(_) | TypedColumn::U32(_) | TypedColumn::U64(_) => {
                NumericKind::Unsigned
            }
            TypedColumn::F16(_) | TypedColumn::F32(_) | TypedColumn::F64(_) => NumericKind::Float,
        }
    }

    pub fn bytes_per_value(&self) -> u8 {
        match self {
            TypedColumn::I8(_) | TypedColumn::U8(_) => 1,
            TypedColumn::I16(_) | TypedColumn::U16(_) | TypedColumn::F16(_) => 2,
            TypedColumn::I32(_) | TypedColumn::U32(_) | TypedColumn::F32(_) => 4,
            TypedColumn::I64(_) | TypedColumn::U64(_) | TypedColumn::F64(_) => 8,
        }
    }

    pub fn type_char(&self) -> char {
        self.kind().type_char()
    }

    /// Widens every element to `i128`. `None` for float columns.
    pub fn as_i128_vec(&self) -> Option<Vec<i128>> {
        match self {
            TypedColumn::I8(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::I16(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::I32(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::I64(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::U8(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::U16(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::U32(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::U64(v) => Some(v.iter().map(|&x| x as i128).collect()),
            TypedColumn::F16(_) | TypedColumn::F32(_) | TypedColumn::F64(_) => None,
        }
    }

    /// Widens every element to `f64`. `None` for integer columns. Lossless:
    /// f16/f32 -> f64 never rounds.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            TypedColumn::F16(v) => Some(v.iter().map(|x| x.to_f64()).collect()),
            TypedColumn::F32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TypedColumn::F64(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Builds a narrowed integer column from widened values, per `kind` and
    /// `bytes` (one of the Stage-C narrowing results).
    pub fn from_i128_narrowed(kind: NumericKind, bytes: u8, values: &[i128]) -> Result<Self> {
        Ok(match (kind, bytes) {
            (NumericKind::Unsigned, 1) => TypedColumn::U8(values.iter().map(|&v| v as u8).collect()),
            (NumericKind::Unsigned, 2) => {
                TypedColumn::U16(values.iter().map(|&v| v as u16).collect())
            }
            (NumericKind::Unsigned, 4) => {
                TypedColumn::U32(values.iter().map(|&v| v as u32).collect())
            }
            (NumericKind::Unsigned, 8) => {
                TypedColumn::U64(values.iter().map(|&v| v as u64).collect())
            }
            (NumericKind::Signed, 1) => TypedColumn::I8(values.iter().map(|&v| v as i8).collect()),
            (NumericKind::Signed, 2) => {
                TypedColumn::I16(values.iter().map(|&v| v as i16).collect())
            }
            (NumericKind::Signed, 4) => {
                TypedColumn::I32(values.iter().map(|&v| v as i32).collect())
            }
            (NumericKind::Signed, 8) => {
                TypedColumn::I64(values.iter().map(|&v| v as i64).collect())
            }
            _ => {
                return Err(TimeBoxError::UnsupportedType {
                    kind: kind.type_char(),
                    bytes,
                })
            }
        })
    }

    /// Builds a float column at the given width from widened `f64` values.
    pub fn from_f64_narrowed(bytes: u8, values: &[f64]) -> Result<Self> {
        Ok(match bytes {
            2 => TypedColumn::F16(values.iter().map(|&v| f16::from_f64(v)).collect()),
            4 => TypedColumn::F32(values.iter().map(|&v| v as f32).collect()),
            8 => TypedColumn::F64(values.to_vec()),
            _ => {
                return Err(TimeBoxError::UnsupportedType {
                    kind: 'f',
                    bytes,
                })
            }
        })
    }

    /// Serializes every element as little-endian bytes, back to back.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.bytes_per_value() as usize);
        match self {
            TypedColumn::I8(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::I16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::I32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::I64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::U8(v) => out.extend_from_slice(v),
            TypedColumn::U16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::U32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::U64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::F16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::F32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TypedColumn::F64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
        }
        out
    }

    /// Deserializes a flat little-endian byte buffer into `count` elements of
    /// the given `(kind, bytes)` machine type.
    pub fn from_le_bytes(kind: NumericKind, bytes: u8, count: usize, buf: &[u8]) -> Result<Self> {
        let expected = count * bytes as usize;
        if buf.len() != expected {
            return Err(TimeBoxError::DataShape {
                expected: expected as u32,
                found: buf.len(),
            });
        }
        macro_rules! decode {
            ($ty:ty, $n:expr) => {
                buf.chunks_exact($n)
                    .map(|c| <$ty>::from_le_bytes(c.try_into().unwrap()))
                    .collect()
            };
        }
        Ok(match (kind, bytes) {
            (NumericKind::Signed, 1) => TypedColumn::I8(decode!(i8, 1)),
            (NumericKind::Signed, 2) => TypedColumn::I16(decode!(i16, 2)),
            (NumericKind::Signed, 4) => TypedColumn::I32(decode!(i32, 4)),
            (NumericKind::Signed, 8) => TypedColumn::I64(decode!(i64, 8)),
            (NumericKind::Unsigned, 1) => TypedColumn::U8(buf.to_vec()),
            (NumericKind::Unsigned, 2) => TypedColumn::U16(decode!(u16, 2)),
            (NumericKind::Unsigned, 4) => TypedColumn::U32(decode!(u32, 4)),
            (NumericKind::Unsigned, 8) => TypedColumn::U64(decode!(u64, 8)),
            (NumericKind::Float, 2) => TypedColumn::F16(
                buf.chunks_exact(2)
                    .map(|c| f16::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            (NumericKind::Float, 4) => TypedColumn::F32(decode!(f32, 4)),
            (NumericKind::Float, 8) => TypedColumn::F64(decode!(f64, 8)),
            _ => {
                return Err(TimeBoxError::UnsupportedType {
                    kind: kind.type_char(),
                    bytes,
                })
            }
        })
    }
}

/// Validates that a (kind, bits) pair is one of the ten supported machine
/// types and returns the byte width. Valid pairs: `i` x {8,16,32,64},
/// `u` x {8,16,32,64}, `f` x {16,32,64}.
pub fn type_descriptor(kind: NumericKind, bits: u32) -> Result<u8> {
    let valid = match kind {
        NumericKind::Signed | NumericKind::Unsigned => matches!(bits, 8 | 16 | 32 | 64),
        NumericKind::Float => matches!(bits, 16 | 32 | 64),
    };
    if !valid {
        return Err(TimeBoxError::UnsupportedType {
            kind: kind.type_char(),
            bytes: (bits / 8) as u8,
        });
    }
    Ok((bits / 8) as u8)
}

/// Smallest unsigned integer width (1, 2, 4, or 8 bytes) that can hold `v`.
pub fn min_unsigned_bytes(v: i128) -> Result<u8> {
    if v < 0 {
        return Err(TimeBoxError::IntegerNotUnsigned(v));
    }
    let v = v as u128;
    if v > u64::MAX as u128 {
        return Err(TimeBoxError::IntegerTooLarge(v));
    }
    if v <= u8::MAX as u128 {
        Ok(1)
    } else if v <= u16::MAX as u128 {
        Ok(2)
    } else if v <= u32::MAX as u128 {
        Ok(4)
    } else {
        Ok(8)
    }
}

/// Smallest signed integer width (1, 2, 4, or 8 bytes) that can hold both
/// `min` and `max`.
pub fn min_signed_bytes(min: i128, max: i128) -> Result<u8> {
    if min >= i8::MIN as i128 && max <= i8::MAX as i128 {
        Ok(1)
    } else if min >= i16::MIN as i128 && max <= i16::MAX as i128 {
        Ok(2)
    } else if min >= i32::MIN as i128 && max <= i32::MAX as i128 {
        Ok(4)
    } else if min >= i64::MIN as i128 && max <= i64::MAX as i128 {
        Ok(8)
    } else {
        Err(TimeBoxError::IntegerTooLarge(max.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_descriptor_accepts_all_valid_pairs() {
        for bits in [8, 16, 32, 64] {
            assert!(type_descriptor(NumericKind::Signed, bits).is_ok());
            assert!(type_descriptor(NumericKind::Unsigned, bits).is_ok());
        }
        for bits in [16, 32, 64] {
            assert!(type_descriptor(NumericKind::Float, bits).is_ok());
        }
    }

    #[test]
    fn type_descriptor_rejects_invalid_pairs() {
        assert!(type_descriptor(NumericKind::Float, 8).is_err());
        assert!(type_descriptor(NumericKind::Signed, 24).is_err());
    }

    #[test]
    fn min_unsigned_bytes_widths() {
        assert_eq!(min_unsigned_bytes(0).unwrap(), 1);
        assert_eq!(min_unsigned_bytes(255).unwrap(), 1);
        assert_eq!(min_unsigned_bytes(256).unwrap(), 2);
        assert_eq!(min_unsigned_bytes(65535).unwrap(), 2);
        assert_eq!(min_unsigned_bytes(65536).unwrap(), 4);
        assert_eq!(min_unsigned_bytes(u32::MAX as i128).unwrap(), 4);
        assert_eq!(min_unsigned_bytes(u32::MAX as i128 + 1).unwrap(), 8);
        assert_eq!(min_unsigned_bytes(u64::MAX as i128).unwrap(), 8);
    }

    #[test]
    fn min_unsigned_bytes_errors() {
        assert!(matches!(
            min_unsigned_bytes(-1),
            Err(TimeBoxError::IntegerNotUnsigned(-1))
        ));
        assert!(matches!(
            min_unsigned_bytes(u64::MAX as i128 + 1),
            Err(TimeBoxError::IntegerTooLarge(_))
        ));
    }

    #[test]
    fn type_char_round_trip() {
        for kind in [NumericKind::Signed, NumericKind::Unsigned, NumericKind::Float] {
            let c = kind.type_char();
            assert_eq!(NumericKind::from_type_char(c).unwrap().type_char(), c);
        }
        assert!(NumericKind::from_type_char('x').is_err());
    }

    #[test]
    fn typed_column_reports_its_own_shape() {
        let col = TypedColumn::I16(vec![-4, -2, 0, 2000]);
        assert_eq!(col.len(), 4);
        assert_eq!(col.bytes_per_value(), 2);
        assert_eq!(col.type_char(), 'i');
    }

    #[test]
    fn le_byte_round_trip_for_every_variant() {
        let col = TypedColumn::I16(vec![-4, -2, 0, 2000]);
        let bytes = col.to_le_bytes();
        let back = TypedColumn::from_le_bytes(NumericKind::Signed, 2, 4, &bytes).unwrap();
        assert_eq!(back, col);

        let col = TypedColumn::F32(vec![5.2, 0.8, 3.1415, 8.0]);
        let bytes = col.to_le_bytes();
        let back = TypedColumn::from_le_bytes(NumericKind::Float, 4, 4, &bytes).unwrap();
        assert_eq!(back, col);
    }

    #[test]
    fn widen_and_narrow_round_trip() {
        let col = TypedColumn::U32(vec![1, 2, 3, 4]);
        let widened = col.as_i128_vec().unwrap();
        let narrowed = TypedColumn::from_i128_narrowed(NumericKind::Unsigned, 1, &widened).unwrap();
        assert_eq!(narrowed, TypedColumn::U8(vec![1, 2, 3, 4]));
    }
}

/// Property tests for spec.md §8 property 5 (width minimality): the returned
/// width must be able to hold the value, and the next-narrower width (when
/// one exists) must not.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn min_unsigned_bytes_is_never_wider_than_necessary(v in 0u64..=u64::MAX) {
            let bytes = min_unsigned_bytes(v as i128).unwrap();
            let max_at_width: u128 = match bytes {
                1 => u8::MAX as u128,
                2 => u16::MAX as u128,
                4 => u32::MAX as u128,
                8 => u64::MAX as u128,
                other => panic!("unexpected width {other}"),
            };
            prop_assert!((v as u128) <= max_at_width);
            if bytes > 1 {
                let narrower_max: u128 = match bytes {
                    2 => u8::MAX as u128,
                    4 => u16::MAX as u128,
                    8 => u32::MAX as u128,
                    _ => unreachable!(),
                };
                prop_assert!((v as u128) > narrower_max);
            }
        }

        #[test]
        fn min_signed_bytes_holds_both_bounds(a in i64::MIN..=i64::MAX, b in i64::MIN..=i64::MAX) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let bytes = min_signed_bytes(min as i128, max as i128).unwrap();
            let (lo, hi): (i128, i128) = match bytes {
                1 => (i8::MIN as i128, i8::MAX as i128),
                2 => (i16::MIN as i128, i16::MAX as i128),
                4 => (i32::MIN as i128, i32::MAX as i128),
                8 => (i64::MIN as i128, i64::MAX as i128),
                other => panic!("unexpected width {other}"),
            };
            prop_assert!(min as i128 >= lo && max as i128 <= hi);
        }
    }
}
