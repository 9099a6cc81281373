//! Converts a sorted timestamp sequence into inter-point differences,
//! promoted to the coarsest lossless unit and narrowed to the smallest
//! unsigned width (spec.md §4.3).

use timebox_core::{DeltaUnit, Result, TimeBoxError};

/// Computes `(unit, bytes_per_delta, narrowed_deltas)` for a sorted,
/// non-decreasing timestamp sequence. `timestamps` must already be validated
/// (see `TimeBoxFile::from_columns`); this only recomputes the ordering check
/// defensively since it is cheap and this is a public entry point.
#[tracing::instrument(skip(timestamps), fields(num_points = timestamps.len()))]
pub fn compute(timestamps: &[i64]) -> Result<(DeltaUnit, u8, Vec<u64>)> {
    let raw_deltas: Vec<i64> = timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();
    for (i, &d) in raw_deltas.iter().enumerate() {
        if d < 0 {
            return Err(TimeBoxError::DateOrder { index: i + 1 });
        }
    }

    let unit = promote_unit(&raw_deltas);
    let unit_seconds = unit.seconds() as i64;
    let scaled: Vec<u64> = raw_deltas.iter().map(|&d| (d / unit_seconds) as u64).collect();

    let max = scaled.iter().copied().max().unwrap_or(0);
    let bytes_per_delta = timebox_core::numeric::min_unsigned_bytes(max as i128)
        .map_err(|e| TimeBoxError::DateUnits(e.to_string()))?;

    tracing::debug!(?unit, bytes_per_delta, "promoted date deltas");
    Ok((unit, bytes_per_delta, scaled))
}

/// Reverses `compute`: reconstructs the full timestamp sequence from
/// `start_date`, the delta unit, and the narrowed delta table.
pub fn reconstruct(start_date: i64, unit: DeltaUnit, deltas: &[u64]) -> Vec<i64> {
    let unit_seconds = unit.seconds() as i64;
    let mut timestamps = Vec::with_capacity(deltas.len() + 1);
    let mut current = start_date;
    timestamps.push(current);
    for &d in deltas {
        current += d as i64 * unit_seconds;
        timestamps.push(current);
    }
    timestamps
}

/// Picks the coarsest unit in `DeltaUnit::PROMOTION_ORDER` such that every
/// delta is an exact multiple of its second-count. Falls back to seconds
/// when the sequence is empty (a single-point file, N=1, has no deltas).
fn promote_unit(deltas: &[i64]) -> DeltaUnit {
    if deltas.is_empty() {
        return DeltaUnit::Seconds;
    }
    for unit in DeltaUnit::PROMOTION_ORDER {
        let unit_seconds = unit.seconds() as i64;
        if deltas.iter().all(|&d| d % unit_seconds == 0) {
            return unit;
        }
    }
    DeltaUnit::Seconds
}


/// Property test for spec.md §8 property 1 (round-trip), specialized to the
/// date-delta engine: any non-decreasing timestamp sequence survives
/// compute + reconstruct exactly.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn compute_then_reconstruct_round_trips(
            start in 0i64..2_000_000_000,
            steps in prop::collection::vec(0u32..90_000, 1..64),
        ) {
            let mut timestamps = vec![start];
            for step in steps {
                let next = timestamps.last().unwrap() + step as i64;
                timestamps.push(next);
            }
            let (unit, _bytes, deltas) = compute(&timestamps).unwrap();
            let rebuilt = reconstruct(timestamps[0], unit, &deltas);
            prop_assert_eq!(rebuilt, timestamps);
        }
    }
}
