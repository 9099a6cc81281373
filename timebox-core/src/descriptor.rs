//! The 32-byte tag-definition tail: the mode-specific compression descriptor
//! that is persisted inline with each tag (spec.md §4.5).

use crate::error::{Result, TimeBoxError};
use crate::numeric::NumericKind;
use crate::options::TagOptions;
use half::f16;

pub const DESCRIPTOR_LEN: usize = 32;

/// Stage-B transform selector (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    /// `m`: subtract the column minimum from every value.
    MinOffset,
    /// `e`: store the first value, then successive differences.
    ExactDerivative,
}

impl CompressionMode {
    pub fn as_char(self) -> char {
        match self {
            CompressionMode::MinOffset => 'm',
            CompressionMode::ExactDerivative => 'e',
        }
    }

    pub fn from_char(c: char) -> Result<Self> {
        match c {
            'm' => Ok(CompressionMode::MinOffset),
            'e' => Ok(CompressionMode::ExactDerivative),
            _ => Err(TimeBoxError::CompressionModeInvalid(c as u8)),
        }
    }
}

/// The compression descriptor persisted in a tag's 32-byte tail. Populated
/// only when `use_compression` and/or `floating_point_rounded` are set on the
/// owning tag's options; unused bytes are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionDescriptor {
    pub mode: CompressionMode,
    pub compressed_kind: NumericKind,
    pub compressed_bytes_per_value: u8,
    pub reference_kind: NumericKind,
    pub reference_bytes_per_value: u8,
    /// Little-endian bytes of the reference value in `reference_kind` /
    /// `reference_bytes_per_value`; only the leading `reference_bytes_per_value`
    /// bytes are meaningful.
    pub reference_value_bytes: [u8; 8],
    pub num_decimals_to_store: Option<u8>,
}

impl CompressionDescriptor {
    pub fn reference_value_i128(&self) -> i128 {
        let n = self.reference_bytes_per_value as usize;
        let mut buf = [0u8; 16];
        buf[..n].copy_from_slice(&self.reference_value_bytes[..n]);
        match self.reference_kind {
            NumericKind::Unsigned => {
                let mut v: u128 = 0;
                for i in (0..n).rev() {
                    v = (v << 8) | buf[i] as u128;
                }
                v as i128
            }
            NumericKind::Signed => {
                let raw = match n {
                    1 => buf[0] as i8 as i128,
                    2 => i16::from_le_bytes([buf[0], buf[1]]) as i128,
                    4 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as i128,
                    8 => i64::from_le_bytes(buf[..8].try_into().unwrap()) as i128,
                    _ => 0,
                };
                raw
            }
            NumericKind::Float => self.reference_value_f64() as i128,
        }
    }

    pub fn reference_value_f64(&self) -> f64 {
        let n = self.reference_bytes_per_value as usize;
        match n {
            2 => f16::from_le_bytes([self.reference_value_bytes[0], self.reference_value_bytes[1]])
                .to_f64(),
            4 => f32::from_le_bytes(self.reference_value_bytes[..4].try_into().unwrap()) as f64,
            8 => f64::from_le_bytes(self.reference_value_bytes[..8].try_into().unwrap()),
            _ => 0.0,
        }
    }

    pub fn from_i128(
        mode: CompressionMode,
        compressed_kind: NumericKind,
        compressed_bytes_per_value: u8,
        reference_kind: NumericKind,
        reference_bytes_per_value: u8,
        reference_value: i128,
        num_decimals_to_store: Option<u8>,
    ) -> Self {
        let mut bytes = [0u8; 8];
        let n = reference_bytes_per_value as usize;
        match reference_kind {
            NumericKind::Unsigned => {
                let v = reference_value as u64;
                bytes[..n].copy_from_slice(&v.to_le_bytes()[..n]);
            }
            NumericKind::Signed => {
                let v = reference_value as i64;
                bytes[..n].copy_from_slice(&v.to_le_bytes()[..n]);
            }
            NumericKind::Float => unreachable!("use from_f64 for float reference values"),
        }
        Self {
            mode,
            compressed_kind,
            compressed_bytes_per_value,
            reference_kind,
            reference_bytes_per_value,
            reference_value_bytes: bytes,
            num_decimals_to_store,
        }
    }

    pub fn from_f64(
        mode: CompressionMode,
        compressed_kind: NumericKind,
        compressed_bytes_per_value: u8,
        reference_bytes_per_value: u8,
        reference_value: f64,
        num_decimals_to_store: Option<u8>,
    ) -> Self {
        let mut bytes = [0u8; 8];
        match reference_bytes_per_value {
            2 => bytes[..2].copy_from_slice(&f16::from_f64(reference_value).to_le_bytes()),
            4 => bytes[..4].copy_from_slice(&(reference_value as f32).to_le_bytes()),
            8 => bytes[..8].copy_from_slice(&reference_value.to_le_bytes()),
            _ => unreachable!("float reference width must be 2, 4, or 8"),
        }
        Self {
            mode,
            compressed_kind,
            compressed_bytes_per_value,
            reference_kind: NumericKind::Float,
            reference_bytes_per_value,
            reference_value_bytes: bytes,
            num_decimals_to_store,
        }
    }

    /// Serializes the descriptor into the fixed 32-byte tail, per the layout
    /// in spec.md §4.5: compression fields first (if `use_compression`),
    /// then `num_decimals_to_store` (if `floating_point_rounded`).
    pub fn encode(this: Option<&Self>, options: &TagOptions) -> [u8; DESCRIPTOR_LEN] {
        let mut out = [0u8; DESCRIPTOR_LEN];
        let mut cursor = 0usize;
        if options.use_compression {
            let d = this.expect("use_compression set without a descriptor");
            out[cursor] = d.mode.as_char() as u8;
            cursor += 1;
            out[cursor] = d.compressed_bytes_per_value;
            cursor += 1;
            out[cursor] = d.compressed_kind.type_char() as u8;
            cursor += 1;
            out[cursor] = d.reference_bytes_per_value;
            cursor += 1;
            out[cursor] = d.reference_kind.type_char() as u8;
            cursor += 1;
            let n = d.reference_bytes_per_value as usize;
            out[cursor..cursor + n].copy_from_slice(&d.reference_value_bytes[..n]);
            cursor += n;
        }
        if options.floating_point_rounded {
            let d = this.expect("floating_point_rounded set without a descriptor");
            out[cursor] = d.num_decimals_to_store.unwrap_or(0);
        }
        out
    }

    pub fn decode(bytes: &[u8; DESCRIPTOR_LEN], options: &TagOptions) -> Result<Option<Self>> {
        if !options.use_compression && !options.floating_point_rounded {
            return Ok(None);
        }
        let mut cursor = 0usize;
        let (mode, compressed_kind, compressed_bytes_per_value, reference_kind, reference_bytes_per_value, reference_value_bytes);
        if options.use_compression {
            mode = CompressionMode::from_char(bytes[cursor] as char)?;
            cursor += 1;
            compressed_bytes_per_value = bytes[cursor];
            cursor += 1;
            compressed_kind =
                crate::numeric::NumericKind::from_type_char(bytes[cursor] as char)?;
            cursor += 1;
            reference_bytes_per_value = bytes[cursor];
            cursor += 1;
            reference_kind = crate::numeric::NumericKind::from_type_char(bytes[cursor] as char)?;
            cursor += 1;
            let n = reference_bytes_per_value as usize;
            let mut buf = [0u8; 8];
            buf[..n].copy_from_slice(&bytes[cursor..cursor + n]);
            reference_value_bytes = buf;
            cursor += n;
        } else {
            // floating_point_rounded without compression: Stage A output is
            // simply the raw int64 stream, no compression descriptor fields.
            mode = CompressionMode::MinOffset;
            compressed_kind = NumericKind::Signed;
            compressed_bytes_per_value = 0;
            reference_kind = NumericKind::Signed;
            reference_bytes_per_value = 0;
            reference_value_bytes = [0u8; 8];
        }
        let num_decimals_to_store = if options.floating_point_rounded {
            Some(bytes[cursor])
        } else {
            None
        };
        Ok(Some(Self {
            mode,
            compressed_kind,
            compressed_bytes_per_value,
            reference_kind,
            reference_bytes_per_value,
            reference_value_bytes,
            num_decimals_to_store,
        }))
    }
}
