pub mod delta_unit;
pub mod descriptor;
pub mod error;
pub mod file;
pub mod identifier;
pub mod numeric;
pub mod options;
pub mod tag;

pub use delta_unit::DeltaUnit;
pub use descriptor::{CompressionDescriptor, CompressionMode};
pub use error::{Result, TimeBoxError};
pub use file::TimeBoxFile;
pub use identifier::TagIdentifier;
pub use numeric::{NumericKind, TypedColumn};
pub use options::{FileOptions, TagOptions};
pub use tag::Tag;
