//! The per-column compression pipeline (spec.md §4.4): an optional
//! fixed-decimal scale into integers, an optional offset/derivative
//! transform, then integer width narrowing. Each stage is pure and
//! independently invertible; `encode`/`decode` compose them according to a
//! tag's options.

use timebox_core::numeric::{min_signed_bytes, min_unsigned_bytes};
use timebox_core::{
    CompressionDescriptor, CompressionMode, NumericKind, Result, TagOptions, TimeBoxError,
    TypedColumn,
};

/// The result of encoding one column: the descriptor to persist in the tag's
/// 32-byte tail (`None` when neither `use_compression` nor
/// `floating_point_rounded` is set), and the payload to serialize.
pub struct EncodedColumn {
    pub descriptor: Option<CompressionDescriptor>,
    pub payload: TypedColumn,
}

/// An intermediate column representation after Stage A (if any), before
/// Stage C decides whether the values can be narrowed to an integer width.
enum Working {
    Int {
        kind: NumericKind,
        bytes: u8,
        values: Vec<i128>,
    },
    Float {
        bytes: u8,
        values: Vec<f64>,
    },
}

#[tracing::instrument(skip(data), fields(len = data.len(), type_char = data.type_char()))]
pub fn encode(
    data: &TypedColumn,
    options: &TagOptions,
    mode: CompressionMode,
    num_decimals_to_store: Option<u8>,
) -> Result<EncodedColumn> {
    if options.floating_point_rounded && data.kind() != NumericKind::Float {
        return Err(TimeBoxError::DataDoesNotMatchTagDefinition(format!(
            "floating_point_rounded requires type_char 'f' on the original dtype, found '{}'",
            data.type_char()
        )));
    }

    let working = if options.floating_point_rounded {
        let decimals = num_decimals_to_store.unwrap_or(0);
        let scale = 10f64.powi(decimals as i32);
        let values: Vec<i128> = data
            .as_f64_vec()
            .expect("floating_point_rounded implies a float column")
            .iter()
            .map(|v| (v * scale).round() as i128)
            .collect();
        Working::Int {
            kind: NumericKind::Signed,
            bytes: 8,
            values,
        }
    } else if let Some(values) = data.as_i128_vec() {
        Working::Int {
            kind: data.kind(),
            bytes: data.bytes_per_value(),
            values,
        }
    } else {
        Working::Float {
            bytes: data.bytes_per_value(),
            values: data.as_f64_vec().expect("non-integer column must be float"),
        }
    };

    if !options.use_compression {
        let payload = match &working {
            Working::Int { kind, bytes, values } => {
                TypedColumn::from_i128_narrowed(*kind, *bytes, values)?
            }
            Working::Float { bytes, values } => TypedColumn::from_f64_narrowed(*bytes, values)?,
        };
        let descriptor = if options.floating_point_rounded {
            Some(CompressionDescriptor::from_i128(
                CompressionMode::MinOffset,
                NumericKind::Signed,
                0,
                NumericKind::Signed,
                0,
                0,
                num_decimals_to_store,
            ))
        } else {
            None
        };
        return Ok(EncodedColumn { descriptor, payload });
    }

    match working {
        Working::Int { kind, bytes, values } => {
            let (transformed, reference) = apply_mode_int(&values, mode)?;
            let (compressed_kind, compressed_bytes) = narrow_int_width(&transformed)?;
            let payload = TypedColumn::from_i128_narrowed(compressed_kind, compressed_bytes, &transformed)?;
            let descriptor = CompressionDescriptor::from_i128(
                mode,
                compressed_kind,
                compressed_bytes,
                kind,
                bytes,
                reference,
                num_decimals_to_store,
            );
            Ok(EncodedColumn {
                descriptor: Some(descriptor),
                payload,
            })
        }
        Working::Float { bytes, values } => {
            let (transformed, reference) = apply_mode_float(&values, mode)?;
            if is_all_integral(&transformed) {
                let as_int: Vec<i128> = transformed.iter().map(|&v| v as i128).collect();
                let (compressed_kind, compressed_bytes) = narrow_int_width(&as_int)?;
                let payload =
                    TypedColumn::from_i128_narrowed(compressed_kind, compressed_bytes, &as_int)?;
                let descriptor = CompressionDescriptor::from_f64(
                    mode,
                    compressed_kind,
                    compressed_bytes,
                    bytes,
                    reference,
                    num_decimals_to_store,
                );
                Ok(EncodedColumn {
                    descriptor: Some(descriptor),
                    payload,
                })
            } else {
                let payload = TypedColumn::from_f64_narrowed(bytes, &transformed)?;
                let descriptor = CompressionDescriptor::from_f64(
                    mode,
                    NumericKind::Float,
                    bytes,
                    bytes,
                    reference,
                    num_decimals_to_store,
                );
                Ok(EncodedColumn {
                    descriptor: Some(descriptor),
                    payload,
                })
            }
        }
    }
}

pub fn decode(
    payload: &TypedColumn,
    options: &TagOptions,
    descriptor: Option<&CompressionDescriptor>,
    original_kind: NumericKind,
    original_bytes: u8,
    num_points: usize,
) -> Result<TypedColumn> {
    let working = if options.use_compression {
        let d = descriptor.ok_or_else(|| {
            TimeBoxError::Compression("use_compression set but no descriptor present".to_string())
        })?;
        match d.reference_kind {
            NumericKind::Float => {
                let y = payload
                    .as_i128_vec()
                    .map(|v| v.into_iter().map(|x| x as f64).collect::<Vec<_>>())
                    .or_else(|| payload.as_f64_vec())
                    .ok_or_else(|| {
                        TimeBoxError::Compression("compressed payload has no numeric view".to_string())
                    })?;
                let values = invert_mode_float(&y, d.mode, d.reference_value_f64(), num_points)?;
                Working::Float {
                    bytes: d.reference_bytes_per_value,
                    values,
                }
            }
            NumericKind::Signed | NumericKind::Unsigned => {
                let y = payload.as_i128_vec().ok_or_else(|| {
                    TimeBoxError::Compression("compressed payload is not an integer column".to_string())
                })?;
                let values = invert_mode_int(&y, d.mode, d.reference_value_i128(), num_points)?;
                Working::Int {
                    kind: d.reference_kind,
                    bytes: d.reference_bytes_per_value,
                    values,
                }
            }
        }
    } else if options.floating_point_rounded {
        let values = payload
            .as_i128_vec()
            .ok_or_else(|| TimeBoxError::Compression("rounded payload is not integer-valued".to_string()))?;
        Working::Int {
            kind: NumericKind::Signed,
            bytes: 8,
            values,
        }
    } else {
        return Ok(payload.clone());
    };

    if options.floating_point_rounded {
        let decimals = descriptor.and_then(|d| d.num_decimals_to_store).unwrap_or(0);
        let scale = 10f64.powi(decimals as i32);
        let int_values = match working {
            Working::Int { values, .. } => values,
            Working::Float { values, .. } => values.iter().map(|&v| v as i128).collect(),
        };
        let floats: Vec<f64> = int_values.iter().map(|&v| v as f64 / scale).collect();
        TypedColumn::from_f64_narrowed(original_bytes, &floats)
    } else {
        match working {
            Working::Int { kind, bytes, values } => TypedColumn::from_i128_narrowed(kind, bytes, &values),
            Working::Float { bytes, values } => TypedColumn::from_f64_narrowed(bytes, &values),
        }
    }
}

fn apply_mode_int(values: &[i128], mode: CompressionMode) -> Result<(Vec<i128>, i128)> {
    match mode {
        CompressionMode::MinOffset => {
            let reference = *values.iter().min().expect("non-empty column");
            Ok((values.iter().map(|&v| v - reference).collect(), reference))
        }
        CompressionMode::ExactDerivative => {
            if values.is_empty() {
                return Err(TimeBoxError::Compression("exact derivative needs at least one value".to_string()));
            }
            let reference = values[0];
            let mut out = Vec::with_capacity(values.len().saturating_sub(1));
            for w in values.windows(2) {
                let d = w[1] - w[0];
                if d < 0 {
                    return Err(TimeBoxError::Compression(
                        "exact derivative requires a non-decreasing sequence".to_string(),
                    ));
                }
                out.push(d);
            }
            Ok((out, reference))
        }
    }
}

fn apply_mode_float(values: &[f64], mode: CompressionMode) -> Result<(Vec<f64>, f64)> {
    match mode {
        CompressionMode::MinOffset => {
            let reference = values.iter().cloned().fold(f64::INFINITY, f64::min);
            Ok((values.iter().map(|&v| v - reference).collect(), reference))
        }
        CompressionMode::ExactDerivative => {
            if values.is_empty() {
                return Err(TimeBoxError::Compression("exact derivative needs at least one value".to_string()));
            }
            let reference = values[0];
            let mut out = Vec::with_capacity(values.len().saturating_sub(1));
            for w in values.windows(2) {
                let d = w[1] - w[0];
                if d < 0.0 {
                    return Err(TimeBoxError::Compression(
                        "exact derivative requires a non-decreasing sequence".to_string(),
                    ));
                }
                out.push(d);
            }
            Ok((out, reference))
        }
    }
}

fn invert_mode_int(y: &[i128], mode: CompressionMode, reference: i128, num_points: usize) -> Result<Vec<i128>> {
    match mode {
        CompressionMode::MinOffset => Ok(y.iter().map(|&v| v + reference).collect()),
        CompressionMode::ExactDerivative => {
            let mut out = Vec::with_capacity(num_points);
            out.push(reference);
            for &d in y {
                out.push(out.last().unwrap() + d);
            }
            Ok(out)
        }
    }
}

fn invert_mode_float(y: &[f64], mode: CompressionMode, reference: f64, num_points: usize) -> Result<Vec<f64>> {
    match mode {
        CompressionMode::MinOffset => Ok(y.iter().map(|&v| v + reference).collect()),
        CompressionMode::ExactDerivative => {
            let mut out = Vec::with_capacity(num_points);
            out.push(reference);
            for &d in y {
                out.push(out.last().unwrap() + d);
            }
            Ok(out)
        }
    }
}

/// Stage C: the narrowest machine type that can hold every value in `y`,
/// per spec.md invariant 5 (no narrower width is ever legal).
fn narrow_int_width(y: &[i128]) -> Result<(NumericKind, u8)> {
    let all_non_negative = y.iter().all(|&v| v >= 0);
    if all_non_negative {
        let max = y.iter().copied().max().unwrap_or(0);
        Ok((NumericKind::Unsigned, min_unsigned_bytes(max)?))
    } else {
        let min = y.iter().copied().min().unwrap_or(0);
        let max = y.iter().copied().max().unwrap_or(0);
        Ok((NumericKind::Signed, min_signed_bytes(min, max)?))
    }
}

fn is_all_integral(values: &[f64]) -> bool {
    values.iter().all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(use_compression: bool, floating_point_rounded: bool) -> TagOptions {
        TagOptions {
            use_compression,
            use_hash_table: false,
            floating_point_rounded,
        }
    }

    #[test]
    fn min_offset_narrows_unsigned_column_to_one_byte() {
        let data = TypedColumn::U32(vec![1, 2, 3, 4]);
        let encoded = encode(&data, &opts(true, false), CompressionMode::MinOffset, None).unwrap();
        assert_eq!(encoded.payload, TypedColumn::U8(vec![0, 1, 2, 3]));
        let descriptor = encoded.descriptor.unwrap();
        assert_eq!(descriptor.reference_value_i128(), 1);
    }

    #[test]
    fn min_offset_narrows_signed_column_using_negative_reference() {
        let data = TypedColumn::I16(vec![-4, -2, 0, 2000]);
        let encoded = encode(&data, &opts(true, false), CompressionMode::MinOffset, None).unwrap();
        assert_eq!(encoded.payload, TypedColumn::U16(vec![0, 2, 4, 2004]));
        assert_eq!(encoded.descriptor.unwrap().reference_value_i128(), -4);
    }

    #[test]
    fn exact_derivative_rejects_decreasing_values() {
        let data = TypedColumn::F64(vec![5.2, 0.8, 3.1415, 8.0]);
        let result = encode(&data, &opts(true, false), CompressionMode::ExactDerivative, None);
        assert!(result.is_err());
    }

    #[test]
    fn float_min_offset_keeps_width_when_fractional() {
        let data = TypedColumn::F64(vec![5.2, 0.8, 3.1415, 8.0]);
        let encoded = encode(&data, &opts(true, false), CompressionMode::MinOffset, None).unwrap();
        assert_eq!(
            encoded.payload,
            TypedColumn::F64(vec![4.4, 0.0, 2.3415, 7.2])
        );
    }

    #[test]
    fn float_min_offset_narrows_when_values_are_whole_numbers() {
        let data = TypedColumn::F64(vec![
            2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0,
            16384.0, 32768.0, 65536.0,
        ]);
        let encoded = encode(&data, &opts(true, false), CompressionMode::MinOffset, None).unwrap();
        assert_eq!(encoded.payload.bytes_per_value(), 2);
        assert_eq!(encoded.payload.type_char(), 'u');
    }

    #[test]
    fn fixed_decimal_rounding_round_trips() {
        let data = TypedColumn::F64(vec![0.5, -0.5, 10.2345, 0.0]);
        let encoded = encode(&data, &opts(true, true), CompressionMode::MinOffset, Some(2)).unwrap();
        let descriptor = encoded.descriptor.as_ref().unwrap();
        assert_eq!(descriptor.reference_value_i128(), -50);
        assert_eq!(encoded.payload, TypedColumn::U16(vec![100, 0, 1073, 50]));

        let decoded = decode(
            &encoded.payload,
            &opts(true, true),
            Some(descriptor),
            NumericKind::Float,
            8,
            4,
        )
        .unwrap();
        assert_eq!(decoded, TypedColumn::F64(vec![0.5, -0.5, 10.23, 0.0]));
    }

    #[test]
    fn decode_inverts_encode_for_plain_compression() {
        let data = TypedColumn::I16(vec![-4, -2, 0, 2000]);
        let encoded = encode(&data, &opts(true, false), CompressionMode::MinOffset, None).unwrap();
        let decoded = decode(
            &encoded.payload,
            &opts(true, false),
            encoded.descriptor.as_ref(),
            NumericKind::Signed,
            2,
            4,
        )
        .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn uniform_column_narrows_to_one_byte() {
        let data = TypedColumn::U32(vec![7, 7, 7, 7]);
        let encoded = encode(&data, &opts(true, false), CompressionMode::MinOffset, None).unwrap();
        assert_eq!(encoded.payload, TypedColumn::U8(vec![0, 0, 0, 0]));
    }

    #[test]
    fn tiny_array_still_narrows_to_at_least_one_byte() {
        let data = TypedColumn::U8(vec![1]);
        let encoded = encode(&data, &opts(true, false), CompressionMode::MinOffset, None).unwrap();
        assert_eq!(encoded.payload.bytes_per_value(), 1);
    }
}
