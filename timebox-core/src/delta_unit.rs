//! The persisted delta-unit enum (spec.md §6.2), ordered coarsest-to-finest
//! for unit-promotion decisions in the date-delta engine.

use crate::error::{Result, TimeBoxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub enum DeltaUnit {
    Seconds = 1,
    Minutes = 2,
    Hours = 3,
    Days = 4,
}

impl DeltaUnit {
    /// Coarsest-first: promotion picks the first unit in this order whose
    /// second-count evenly divides every delta.
    pub const PROMOTION_ORDER: [DeltaUnit; 4] = [
        DeltaUnit::Days,
        DeltaUnit::Hours,
        DeltaUnit::Minutes,
        DeltaUnit::Seconds,
    ];

    pub fn seconds(self) -> u64 {
        match self {
            DeltaUnit::Seconds => 1,
            DeltaUnit::Minutes => 60,
            DeltaUnit::Hours => 3_600,
            DeltaUnit::Days => 86_400,
        }
    }

    pub fn encode(self) -> u16 {
        self as u16
    }

    pub fn decode(value: u16) -> Result<Self> {
        match value {
            1 => Ok(DeltaUnit::Seconds),
            2 => Ok(DeltaUnit::Minutes),
            3 => Ok(DeltaUnit::Hours),
            4 => Ok(DeltaUnit::Days),
            other => Err(TimeBoxError::DateUnits(format!(
                "unrecognized delta unit code {other}"
            ))),
        }
    }
}
