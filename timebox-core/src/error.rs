use thiserror::Error;

/// Shared error vocabulary for the whole TimeBox pipeline: numeric primitives,
/// the compression pipeline, file layout, and the locking protocol all raise
/// one of these variants rather than defining their own per-crate enum, since
/// the domain errors are meaningful across every crate boundary.
#[derive(Error, Debug)]
pub enum TimeBoxError {
    #[error("unsupported type descriptor: kind '{kind}' with {bytes} bytes")]
    UnsupportedType { kind: char, bytes: u8 },

    #[error("tag identifier byte representation error: {0}")]
    TagIdentifierByteRepresentation(String),

    #[error("data does not match tag definition: {0}")]
    DataDoesNotMatchTagDefinition(String),

    #[error("data shape error: expected {expected} points, found {found}")]
    DataShape { expected: u32, found: usize },

    #[error("timestamps are not in non-decreasing order at index {index}")]
    DateOrder { index: usize },

    #[error("date units error: {0}")]
    DateUnits(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("invalid compression mode byte: {0:#04x}")]
    CompressionModeInvalid(u8),

    #[error("integer too large to represent in 64 bits: {0}")]
    IntegerTooLarge(u128),

    #[error("integer is not unsigned: {0}")]
    IntegerNotUnsigned(i128),

    #[error("could not acquire file lock within the configured deadline")]
    CouldNotAcquireLock,

    #[error("unsupported file format version: {0}")]
    UnsupportedVersion(u8),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TimeBoxError>;
