//! The on-disk binary layout: header, tag-definition table, start date,
//! delta metadata (+ optional delta table), and per-tag payloads in
//! identifier order (spec.md §4.6).

use std::collections::BTreeMap;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use timebox_codec::pipeline;
use timebox_core::descriptor::DESCRIPTOR_LEN;
use timebox_core::numeric::NumericKind;
use timebox_core::{
    CompressionDescriptor, DeltaUnit, FileOptions, Result, Tag, TagIdentifier, TagOptions,
    TimeBoxError, TimeBoxFile, TypedColumn,
};

/// Writes `file` in full: header, tag table, start date, delta metadata, the
/// delta table (if present), then every tag's payload in identifier order.
pub fn write<W: Write>(w: &mut W, file: &TimeBoxFile) -> Result<()> {
    let num_tags = file.num_tags()?;
    let identifier_width =
        timebox_core::identifier::required_identifier_width(file.tags.keys())?;

    let mut defs = Vec::with_capacity(file.tags.len());
    let mut payloads = Vec::with_capacity(file.tags.len());
    for tag in file.tags.values() {
        let original_kind = tag.kind();
        let original_bytes = tag.bytes_per_value();
        let encoded = pipeline::encode(
            &tag.data,
            &tag.options,
            tag.compression_mode,
            tag.num_decimals_to_store,
        )?;
        let descriptor_bytes = CompressionDescriptor::encode(encoded.descriptor.as_ref(), &tag.options);
        defs.push((
            tag.identifier.clone(),
            tag.options,
            original_kind,
            original_bytes,
            tag.num_bytes_extra_information,
            descriptor_bytes,
        ));
        payloads.push(encoded.payload.to_le_bytes());
    }

    w.write_u8(file.version)?;
    w.write_u16::<LittleEndian>(file.options.encode())?;
    w.write_u8(num_tags)?;
    w.write_u32::<LittleEndian>(file.num_points)?;
    w.write_u8(identifier_width)?;

    for (identifier, options, kind, bytes, extra, descriptor_bytes) in &defs {
        w.write_all(&encode_identifier(identifier, identifier_width))?;
        w.write_u16::<LittleEndian>(options.encode())?;
        w.write_u8(*bytes)?;
        w.write_u8(kind.type_char() as u8)?;
        w.write_u32::<LittleEndian>(*extra)?;
        w.write_all(descriptor_bytes)?;
    }

    w.write_i64::<LittleEndian>(file.start_date)?;
    if file.options.date_differentials_stored {
        w.write_u8(file.bytes_per_delta)?;
        w.write_u16::<LittleEndian>(file.delta_unit.encode())?;
    } else {
        w.write_u32::<LittleEndian>(file.seconds_between_points)?;
    }

    if file.options.date_differentials_stored {
        let deltas = file.deltas.as_ref().ok_or_else(|| {
            TimeBoxError::DataDoesNotMatchTagDefinition(
                "date_differentials_stored set but no delta table computed".to_string(),
            )
        })?;
        for &d in deltas {
            write_narrow_unsigned(w, d, file.bytes_per_delta)?;
        }
    }

    for payload in &payloads {
        w.write_all(payload)?;
    }

    Ok(())
}

/// Reads a full `TimeBoxFile` from `r`, inverting `write` exactly.
pub fn read<R: Read>(r: &mut R) -> Result<TimeBoxFile> {
    let version = r.read_u8()?;
    if version != timebox_core::file::CURRENT_VERSION {
        return Err(TimeBoxError::UnsupportedVersion(version));
    }
    let file_options = FileOptions::decode(r.read_u16::<LittleEndian>()?);
    let num_tags = r.read_u8()?;
    let num_points = r.read_u32::<LittleEndian>()?;
    let identifier_width = r.read_u8()?;

    struct RawDef {
        identifier: TagIdentifier,
        options: TagOptions,
        original_kind: NumericKind,
        original_bytes: u8,
        extra: u32,
        descriptor_bytes: [u8; DESCRIPTOR_LEN],
    }

    let mut raw_defs = Vec::with_capacity(num_tags as usize);
    for _ in 0..num_tags {
        let mut id_buf = vec![0u8; identifier_width as usize];
        r.read_exact(&mut id_buf)?;
        let identifier = decode_identifier(&id_buf, file_options.tag_names_are_strings)?;

        let options = TagOptions::decode(r.read_u16::<LittleEndian>()?);
        let original_bytes = r.read_u8()?;
        let original_kind = NumericKind::from_type_char(r.read_u8()? as char)?;
        let extra = r.read_u32::<LittleEndian>()?;
        let mut descriptor_bytes = [0u8; DESCRIPTOR_LEN];
        r.read_exact(&mut descriptor_bytes)?;

        raw_defs.push(RawDef {
            identifier,
            options,
            original_kind,
            original_bytes,
            extra,
            descriptor_bytes,
        });
    }

    let start_date = r.read_i64::<LittleEndian>()?;
    let (bytes_per_delta, delta_unit, seconds_between_points) = if file_options.date_differentials_stored
    {
        let bytes_per_delta = r.read_u8()?;
        let delta_unit = DeltaUnit::decode(r.read_u16::<LittleEndian>()?)?;
        (bytes_per_delta, delta_unit, 0u32)
    } else {
        let seconds_between_points = r.read_u32::<LittleEndian>()?;
        (1u8, DeltaUnit::Seconds, seconds_between_points)
    };

    let deltas = if file_options.date_differentials_stored {
        let count = num_points.saturating_sub(1) as usize;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(read_narrow_unsigned(r, bytes_per_delta)?);
        }
        Some(values)
    } else {
        None
    };

    let timestamps = match &deltas {
        Some(d) => timebox_codec::date_delta::reconstruct(start_date, delta_unit, d),
        None => (0..num_points as i64)
            .map(|i| start_date + i * seconds_between_points as i64)
            .collect(),
    };

    let mut tags = BTreeMap::new();
    for def in raw_defs {
        let descriptor = CompressionDescriptor::decode(&def.descriptor_bytes, &def.options)?;

        let (payload_kind, payload_bytes) = match (&descriptor, def.options.use_compression) {
            (Some(d), true) => (d.compressed_kind, d.compressed_bytes_per_value),
            (Some(_), false) => (NumericKind::Signed, 8),
            (None, _) => (def.original_kind, def.original_bytes),
        };

        let mut buf = vec![0u8; num_points as usize * payload_bytes as usize];
        r.read_exact(&mut buf)?;
        let payload = TypedColumn::from_le_bytes(payload_kind, payload_bytes, num_points as usize, &buf)?;

        let data = pipeline::decode(
            &payload,
            &def.options,
            descriptor.as_ref(),
            def.original_kind,
            def.original_bytes,
            num_points as usize,
        )?;

        let mut tag = Tag::new(def.identifier.clone(), def.options, data);
        tag.num_bytes_extra_information = def.extra;
        if let Some(d) = &descriptor {
            tag.compression_mode = d.mode;
            tag.num_decimals_to_store = d.num_decimals_to_store;
        }
        tags.insert(def.identifier, tag);
    }

    Ok(TimeBoxFile {
        version,
        options: file_options,
        num_points,
        start_date,
        timestamps,
        seconds_between_points,
        bytes_per_delta,
        delta_unit,
        deltas,
        tags,
    })
}

fn encode_identifier(identifier: &TagIdentifier, width: u8) -> Vec<u8> {
    match identifier {
        TagIdentifier::Integer(v) => {
            let full = v.to_le_bytes();
            full[..width as usize].to_vec()
        }
        TagIdentifier::Name(s) => {
            let mut out = vec![0u8; width as usize];
            for (i, c) in s.chars().enumerate() {
                let bytes = (c as u32).to_le_bytes();
                out[i * 4..i * 4 + 4].copy_from_slice(&bytes);
            }
            out
        }
    }
}

fn decode_identifier(bytes: &[u8], is_string: bool) -> Result<TagIdentifier> {
    if is_string {
        let mut s = String::new();
        for chunk in bytes.chunks_exact(4) {
            let code = u32::from_le_bytes(chunk.try_into().unwrap());
            if code == 0 {
                break;
            }
            let c = char::from_u32(code).ok_or_else(|| {
                TimeBoxError::TagIdentifierByteRepresentation(format!(
                    "invalid UTF-32 code point {code:#x} in tag identifier"
                ))
            })?;
            s.push(c);
        }
        Ok(TagIdentifier::Name(s))
    } else {
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(TagIdentifier::Integer(u64::from_le_bytes(buf)))
    }
}

fn write_narrow_unsigned<W: Write>(w: &mut W, value: u64, width: u8) -> Result<()> {
    match width {
        1 => w.write_u8(value as u8)?,
        2 => w.write_u16::<LittleEndian>(value as u16)?,
        4 => w.write_u32::<LittleEndian>(value as u32)?,
        8 => w.write_u64::<LittleEndian>(value)?,
        other => {
            return Err(TimeBoxError::UnsupportedType {
                kind: 'u',
                bytes: other,
            })
        }
    }
    Ok(())
}

fn read_narrow_unsigned<R: Read>(r: &mut R, width: u8) -> Result<u64> {
    Ok(match width {
        1 => r.read_u8()? as u64,
        2 => r.read_u16::<LittleEndian>()? as u64,
        4 => r.read_u32::<LittleEndian>()? as u64,
        8 => r.read_u64::<LittleEndian>()?,
        other => {
            return Err(TimeBoxError::UnsupportedType {
                kind: 'u',
                bytes: other,
            })
        }
    })
}


/// Property tests for spec.md §8 properties 1 (round-trip) and 2
/// (idempotence: re-writing a just-read file reproduces the same bytes).
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn write_then_read_round_trips_arbitrary_i32_columns(
            values in prop::collection::vec(any::<i32>(), 1..48),
            use_compression in any::<bool>(),
        ) {
            let step = 60i64;
            let timestamps: Vec<i64> = (0..values.len() as i64).map(|i| i * step).collect();
            let tag = Tag::new(
                TagIdentifier::Integer(0),
                TagOptions { use_compression, ..Default::default() },
                TypedColumn::I32(values.clone()),
            );
            let file = TimeBoxFile::from_columns(timestamps, vec![tag], false).unwrap();

            let mut buf = Vec::new();
            write(&mut buf, &file).unwrap();
            let read_back = read(&mut &buf[..]).unwrap();

            prop_assert_eq!(
                read_back.tags[&TagIdentifier::Integer(0)].data.clone(),
                TypedColumn::I32(values)
            );

            let mut rewritten = Vec::new();
            write(&mut rewritten, &read_back).unwrap();
            prop_assert_eq!(rewritten, buf);
        }
    }
}
