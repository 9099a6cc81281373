//! Public facade over the TimeBox workspace: re-exports the data model from
//! `timebox-core`, the compression engines from `timebox-codec`, and the
//! on-disk read/write entry points from `timebox-storage`, plus a small
//! builder that assembles a `TimeBoxFile` from the typed-column bridge
//! contract (spec.md §6.4).

pub use timebox_core::{
    CompressionDescriptor, CompressionMode, DeltaUnit, FileOptions, NumericKind, Result, Tag,
    TagIdentifier, TagOptions, TimeBoxError, TimeBoxFile, TypedColumn,
};
pub use timebox_storage::lock::{LockConfig, ReadGuard, WriteGuard};
pub use timebox_storage::{read_file, read_file_with_config, write_file, write_file_with_config};

use timebox_codec::date_delta;

/// Assembles a `TimeBoxFile` from timestamps and columns, running the
/// date-delta engine when `date_differentials_stored` is requested. This is
/// the entry point an external dataframe bridge would call (spec.md §6.4);
/// `TimeBoxFile::from_columns` alone only validates shapes, it does not
/// populate the delta table.
pub struct TimeBoxBuilder {
    timestamps: Vec<i64>,
    tags: Vec<Tag>,
    date_differentials_stored: bool,
}

impl TimeBoxBuilder {
    pub fn new(timestamps: Vec<i64>) -> Self {
        Self {
            timestamps,
            tags: Vec::new(),
            date_differentials_stored: false,
        }
    }

    pub fn with_date_differentials_stored(mut self, stored: bool) -> Self {
        self.date_differentials_stored = stored;
        self
    }

    pub fn add_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn build(self) -> Result<TimeBoxFile> {
        let mut file =
            TimeBoxFile::from_columns(self.timestamps, self.tags, self.date_differentials_stored)?;
        if file.options.date_differentials_stored {
            let (unit, bytes_per_delta, deltas) = date_delta::compute(&file.timestamps)?;
            file.set_delta_metadata(unit, bytes_per_delta, deltas);
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_populates_delta_metadata_when_requested() {
        let tag = Tag::new(
            TagIdentifier::Integer(1),
            TagOptions::default(),
            TypedColumn::I16(vec![1, 2, 3]),
        );
        let file = TimeBoxBuilder::new(vec![0, 86_400, 172_800])
            .with_date_differentials_stored(true)
            .add_tag(tag)
            .build()
            .unwrap();

        assert!(file.options.date_differentials_stored);
        assert_eq!(file.delta_unit, DeltaUnit::Days);
        assert_eq!(file.deltas, Some(vec![1, 1]));
    }

    #[test]
    fn builder_leaves_deltas_unset_for_uniform_spacing() {
        let tag = Tag::new(
            TagIdentifier::Integer(1),
            TagOptions::default(),
            TypedColumn::I16(vec![1, 2]),
        );
        let file = TimeBoxBuilder::new(vec![0, 60]).add_tag(tag).build().unwrap();
        assert!(!file.options.date_differentials_stored);
        assert_eq!(file.deltas, None);
        assert_eq!(file.seconds_between_points, 60);
    }
}
