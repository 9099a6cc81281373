//! Bit-packed option sets. Two 16-bit little-endian integers: file options
//! and tag options. Unset bits are zero; encode/decode are exact inverses of
//! each other, and every bit not named below is reserved and always written
//! as zero.

/// File-level option bits (spec.md §4.2, §6.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct FileOptions {
    pub tag_names_are_strings: bool,
    pub date_differentials_stored: bool,
}

impl FileOptions {
    const TAG_NAMES_ARE_STRINGS_BIT: u16 = 0;
    const DATE_DIFFERENTIALS_STORED_BIT: u16 = 1;

    pub fn encode(&self) -> u16 {
        let mut bits = 0u16;
        bits |= (self.tag_names_are_strings as u16) << Self::TAG_NAMES_ARE_STRINGS_BIT;
        bits |= (self.date_differentials_stored as u16) << Self::DATE_DIFFERENTIALS_STORED_BIT;
        bits
    }

    pub fn decode(bits: u16) -> Self {
        Self {
            tag_names_are_strings: (bits >> Self::TAG_NAMES_ARE_STRINGS_BIT) & 1 != 0,
            date_differentials_stored: (bits >> Self::DATE_DIFFERENTIALS_STORED_BIT) & 1 != 0,
        }
    }
}

/// Tag-level option bits (spec.md §4.2, §6.3). `use_hash_table` is declared
/// but never implemented by the core algorithm — it is always written as 0
/// and ignored on read, matching the original format's reserved bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TagOptions {
    pub use_compression: bool,
    pub use_hash_table: bool,
    pub floating_point_rounded: bool,
}

impl TagOptions {
    const USE_COMPRESSION_BIT: u16 = 0;
    const USE_HASH_TABLE_BIT: u16 = 1;
    const FLOATING_POINT_ROUNDED_BIT: u16 = 2;

    pub fn encode(&self) -> u16 {
        let mut bits = 0u16;
        bits |= (self.use_compression as u16) << Self::USE_COMPRESSION_BIT;
        bits |= (self.use_hash_table as u16) << Self::USE_HASH_TABLE_BIT;
        bits |= (self.floating_point_rounded as u16) << Self::FLOATING_POINT_ROUNDED_BIT;
        bits
    }

    pub fn decode(bits: u16) -> Self {
        Self {
            use_compression: (bits >> Self::USE_COMPRESSION_BIT) & 1 != 0,
            // reserved: always false on a conformant writer, but decoded for completeness
            use_hash_table: (bits >> Self::USE_HASH_TABLE_BIT) & 1 != 0,
            floating_point_rounded: (bits >> Self::FLOATING_POINT_ROUNDED_BIT) & 1 != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_options_bijection() {
        for tag_names_are_strings in [false, true] {
            for date_differentials_stored in [false, true] {
                let opts = FileOptions {
                    tag_names_are_strings,
                    date_differentials_stored,
                };
                assert_eq!(FileOptions::decode(opts.encode()), opts);
            }
        }
    }

    #[test]
    fn tag_options_bijection() {
        for use_compression in [false, true] {
            for use_hash_table in [false, true] {
                for floating_point_rounded in [false, true] {
                    let opts = TagOptions {
                        use_compression,
                        use_hash_table,
                        floating_point_rounded,
                    };
                    assert_eq!(TagOptions::decode(opts.encode()), opts);
                }
            }
        }
    }

    #[test]
    fn unset_bits_are_zero() {
        assert_eq!(FileOptions::default().encode(), 0);
        assert_eq!(TagOptions::default().encode(), 0);
    }

    #[test]
    fn reserved_bits_never_set_by_encode() {
        let opts = TagOptions {
            use_compression: true,
            use_hash_table: true,
            floating_point_rounded: true,
        };
        assert_eq!(opts.encode(), 0b111);
        assert_eq!(opts.encode() & !0b111, 0);
    }
}
