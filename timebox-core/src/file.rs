//! The in-memory mirror of an on-disk TimeBox artifact (spec.md §3).
//!
//! `TimeBoxFile` owns everything needed to serialize or that was produced by
//! deserializing: the header scalars, the tag table, and (when date deltas
//! are stored) the timestamp vector and its compressed representation. The
//! date-delta engine itself lives in `timebox-codec`, which depends on this
//! crate — so this type only stores raw timestamps and exposes a slot for
//! the codec to fill in once it has computed the delta metadata.

use std::collections::BTreeMap;

use crate::delta_unit::DeltaUnit;
use crate::error::{Result, TimeBoxError};
use crate::identifier::TagIdentifier;
use crate::options::FileOptions;
use crate::tag::Tag;

pub const CURRENT_VERSION: u8 = 1;

#[derive(Debug, Clone)]
pub struct TimeBoxFile {
    pub version: u8,
    pub options: FileOptions,
    pub num_points: u32,
    pub start_date: i64,
    /// Full-resolution timestamps, always present in memory. Reconstructed
    /// on read from `start_date` plus either the uniform spacing or the
    /// decoded delta table.
    pub timestamps: Vec<i64>,
    pub seconds_between_points: u32,
    pub bytes_per_delta: u8,
    pub delta_unit: DeltaUnit,
    /// Populated by the codec's date-delta engine when
    /// `options.date_differentials_stored` is set; `None` until computed (on
    /// write) or decoded (on read).
    pub deltas: Option<Vec<u64>>,
    pub tags: BTreeMap<TagIdentifier, Tag>,
}

impl TimeBoxFile {
    /// Builds a `TimeBoxFile` from caller-supplied columns, validating the
    /// shape and ordering invariants in spec.md §3 (1, 2, 5, 6) up front.
    /// Date-delta computation (when `date_differentials_stored`) and
    /// per-column compression happen later, in `timebox-codec`.
    pub fn from_columns(
        timestamps: Vec<i64>,
        tags: Vec<Tag>,
        date_differentials_stored: bool,
    ) -> Result<Self> {
        if timestamps.is_empty() {
            return Err(TimeBoxError::DataShape {
                expected: 1,
                found: 0,
            });
        }
        for (i, pair) in timestamps.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(TimeBoxError::DateOrder { index: i + 1 });
            }
        }
        let num_points = timestamps.len() as u32;

        if tags.is_empty() || tags.len() > u8::MAX as usize {
            return Err(TimeBoxError::DataDoesNotMatchTagDefinition(format!(
                "tag count {} outside the supported range 1..=255",
                tags.len()
            )));
        }

        let mut by_identifier = BTreeMap::new();
        let mut saw_integer = false;
        let mut saw_string = false;
        for tag in tags {
            tag.validate_shape(num_points)?;
            match &tag.identifier {
                TagIdentifier::Integer(_) => saw_integer = true,
                TagIdentifier::Name(_) => saw_string = true,
            }
            if by_identifier.insert(tag.identifier.clone(), tag).is_some() {
                return Err(TimeBoxError::DataDoesNotMatchTagDefinition(
                    "duplicate tag identifier".to_string(),
                ));
            }
        }
        if saw_integer && saw_string {
            return Err(TimeBoxError::DataDoesNotMatchTagDefinition(
                "tag identifiers must be all-integer or all-string within one file".to_string(),
            ));
        }

        let seconds_between_points = if date_differentials_stored {
            0
        } else if num_points > 1 {
            (timestamps[1] - timestamps[0]) as u32
        } else {
            0
        };

        Ok(Self {
            version: CURRENT_VERSION,
            options: FileOptions {
                tag_names_are_strings: saw_string,
                date_differentials_stored,
            },
            num_points,
            start_date: timestamps[0],
            timestamps,
            seconds_between_points,
            bytes_per_delta: 1,
            delta_unit: DeltaUnit::Seconds,
            deltas: None,
            tags: by_identifier,
        })
    }

    pub fn num_tags(&self) -> Result<u8> {
        let len = self.tags.len();
        if len == 0 || len > u8::MAX as usize {
            return Err(TimeBoxError::DataDoesNotMatchTagDefinition(format!(
                "tag count {len} outside the supported range 1..=255"
            )));
        }
        Ok(len as u8)
    }

    /// Called by the codec after running the date-delta engine, to cache the
    /// unit-scaled delta table and its on-disk metadata.
    pub fn set_delta_metadata(&mut self, unit: DeltaUnit, bytes_per_delta: u8, deltas: Vec<u64>) {
        self.delta_unit = unit;
        self.bytes_per_delta = bytes_per_delta;
        self.deltas = Some(deltas);
    }
}
