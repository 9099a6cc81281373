//! A single named column: identity, base dtype, option bits, and the
//! mode-specific compression descriptor (spec.md §3, §4.5).

use crate::descriptor::CompressionMode;
use crate::error::{Result, TimeBoxError};
use crate::identifier::TagIdentifier;
use crate::numeric::{NumericKind, TypedColumn};
use crate::options::TagOptions;

/// On-disk width of a tag definition's fixed tail: 2 (options) + 1
/// (bytes_per_value) + 1 (type_char) + 4 (num_bytes_extra_information) + 32
/// (descriptor).
pub const TAG_DEFINITION_TAIL_LEN: usize = 40;

/// A named column. `data` carries the original, uncompressed values; the
/// compression descriptor (if any) is derived from `data` and `options` when
/// the tag is encoded, not stored redundantly on this type.
#[derive(Debug, Clone)]
pub struct Tag {
    pub identifier: TagIdentifier,
    pub options: TagOptions,
    /// Reserved for future per-tag metadata; always 0 on write.
    pub num_bytes_extra_information: u32,
    pub data: TypedColumn,
    /// Stage-B mode to use when `options.use_compression` is set. Defaults to
    /// min-offset, matching the original format's default.
    pub compression_mode: CompressionMode,
    /// Stage-A decimal count when `options.floating_point_rounded` is set.
    pub num_decimals_to_store: Option<u8>,
}

impl Tag {
    pub fn new(identifier: TagIdentifier, options: TagOptions, data: TypedColumn) -> Self {
        Self {
            identifier,
            options,
            num_bytes_extra_information: 0,
            data,
            compression_mode: CompressionMode::MinOffset,
            num_decimals_to_store: None,
        }
    }

    pub fn with_compression_mode(mut self, mode: CompressionMode) -> Self {
        self.compression_mode = mode;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.num_decimals_to_store = Some(decimals);
        self
    }

    pub fn bytes_per_value(&self) -> u8 {
        self.data.bytes_per_value()
    }

    pub fn type_char(&self) -> char {
        self.data.type_char()
    }

    pub fn kind(&self) -> NumericKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Validates this tag's shape against the file's declared point count
    /// (spec.md invariant 1/2).
    pub fn validate_shape(&self, num_points: u32) -> Result<()> {
        if self.len() != num_points as usize {
            return Err(TimeBoxError::DataShape {
                expected: num_points,
                found: self.len(),
            });
        }
        if self.options.floating_point_rounded && self.kind() != NumericKind::Float {
            return Err(TimeBoxError::DataDoesNotMatchTagDefinition(format!(
                "floating_point_rounded set on a non-float tag (type_char '{}')",
                self.type_char()
            )));
        }
        Ok(())
    }
}
