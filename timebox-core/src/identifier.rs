//! Tag identifiers: either an unsigned integer (fitting in <= 8 bytes) or a
//! UTF-32 string whose byte length is a multiple of 4 (spec.md §3, §6.3).

use crate::error::{Result, TimeBoxError};
use crate::numeric::min_unsigned_bytes;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagIdentifier {
    Integer(u64),
    Name(String),
}

impl TagIdentifier {
    pub fn is_string(&self) -> bool {
        matches!(self, TagIdentifier::Name(_))
    }
}

impl PartialOrd for TagIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tags are always emitted in sorted identifier order (spec.md §3). Integer
/// and string identifiers never mix within one file (the file-level option
/// bit selects which variant is in play), so ordering between the two
/// variants only matters for a well-formed `BTreeMap` invariant, not for any
/// on-disk guarantee.
impl Ord for TagIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TagIdentifier::Integer(a), TagIdentifier::Integer(b)) => a.cmp(b),
            (TagIdentifier::Name(a), TagIdentifier::Name(b)) => a.cmp(b),
            (TagIdentifier::Integer(_), TagIdentifier::Name(_)) => Ordering::Less,
            (TagIdentifier::Name(_), TagIdentifier::Integer(_)) => Ordering::Greater,
        }
    }
}

/// Computes `num_bytes_for_tag_identifier`: for string identifiers, the
/// widest name's byte length (UTF-32, 4 bytes/char); for integer identifiers,
/// the smallest power-of-two unsigned width holding the maximum id.
pub fn required_identifier_width<'a, I>(identifiers: I) -> Result<u8>
where
    I: IntoIterator<Item = &'a TagIdentifier>,
{
    let mut max_int: Option<u64> = None;
    let mut max_name_chars: Option<usize> = None;
    let mut any = false;
    for id in identifiers {
        any = true;
        match id {
            TagIdentifier::Integer(v) => {
                max_int = Some(max_int.map_or(*v, |m| m.max(*v)));
            }
            TagIdentifier::Name(s) => {
                let chars = s.chars().count();
                max_name_chars = Some(max_name_chars.map_or(chars, |m| m.max(chars)));
            }
        }
    }
    if !any {
        return Err(TimeBoxError::TagIdentifierByteRepresentation(
            "no tags to determine identifier width for".to_string(),
        ));
    }
    if let Some(chars) = max_name_chars {
        if chars == 0 {
            return Err(TimeBoxError::TagIdentifierByteRepresentation(
                "tag name identifier cannot be empty".to_string(),
            ));
        }
        return Ok((chars * 4) as u8);
    }
    min_unsigned_bytes(max_int.unwrap() as i128)
        .map_err(|_| TimeBoxError::TagIdentifierByteRepresentation(
            "integer identifier does not fit in 8 bytes".to_string(),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_identifier_width_is_smallest_unsigned_width() {
        let ids = vec![TagIdentifier::Integer(0), TagIdentifier::Integer(2)];
        assert_eq!(required_identifier_width(&ids).unwrap(), 1);

        let ids = vec![TagIdentifier::Integer(300)];
        assert_eq!(required_identifier_width(&ids).unwrap(), 2);
    }

    #[test]
    fn string_identifier_width_is_widest_name_times_four() {
        let ids = vec![
            TagIdentifier::Name("ab".to_string()),
            TagIdentifier::Name("abcd".to_string()),
        ];
        assert_eq!(required_identifier_width(&ids).unwrap(), 16);
    }

    #[test]
    fn sorted_order_is_used_on_write() {
        let mut ids = vec![
            TagIdentifier::Integer(3),
            TagIdentifier::Integer(1),
            TagIdentifier::Integer(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                TagIdentifier::Integer(1),
                TagIdentifier::Integer(2),
                TagIdentifier::Integer(3)
            ]
        );
    }
}
