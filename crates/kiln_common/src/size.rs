//! Byte sizes with unit parsing and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// A size in bytes.
///
/// Parses strings like "40MB", "512KiB", "2gb", "1000B" and bare integers
/// (interpreted as bytes). Units are binary multiples: `KB` and `KiB` both
/// mean 1024 bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteSize(u64);

impl ByteSize {
    /// Creates a size from a byte count.
    pub fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Returns the size in bytes.
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteSize({self})")
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        if b >= GIB && b % GIB == 0 {
            write!(f, "{}GB", b / GIB)
        } else if b >= MIB && b % MIB == 0 {
            write!(f, "{}MB", b / MIB)
        } else if b >= KIB && b % KIB == 0 {
            write!(f, "{}KB", b / KIB)
        } else {
            write!(f, "{b}B")
        }
    }
}

/// Error type for parsing byte size strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseByteSizeError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseByteSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid byte size: '{}'", self.input)
    }
}

impl std::error::Error for ParseByteSizeError {}

impl FromStr for ByteSize {
    type Err = ParseByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseByteSizeError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        for (suffixes, multiplier) in [
            (["gib", "gb"], GIB),
            (["mib", "mb"], MIB),
            (["kib", "kb"], KIB),
        ] {
            for suffix in suffixes {
                if let Some(num) = lower.strip_suffix(suffix) {
                    let val: u64 = num.trim().parse().map_err(|_| err())?;
                    return val.checked_mul(multiplier).map(ByteSize).ok_or_else(err);
                }
            }
        }
        if let Some(num) = lower.strip_suffix('b') {
            let val: u64 = num.trim().parse().map_err(|_| err())?;
            return Ok(ByteSize(val));
        }

        let val: u64 = s.parse().map_err(|_| err())?;
        Ok(ByteSize(val))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!("40MB".parse::<ByteSize>().unwrap().bytes(), 40 * MIB);
        assert_eq!("512KiB".parse::<ByteSize>().unwrap().bytes(), 512 * KIB);
        assert_eq!("2gb".parse::<ByteSize>().unwrap().bytes(), 2 * GIB);
        assert_eq!("1000B".parse::<ByteSize>().unwrap().bytes(), 1000);
    }

    #[test]
    fn parse_bare_number() {
        assert_eq!("4096".parse::<ByteSize>().unwrap().bytes(), 4096);
    }

    #[test]
    fn parse_allows_inner_whitespace() {
        assert_eq!("10 MB".parse::<ByteSize>().unwrap().bytes(), 10 * MIB);
    }

    #[test]
    fn parse_invalid() {
        assert!("lots".parse::<ByteSize>().is_err());
        assert!("1.5MB".parse::<ByteSize>().is_err());
        assert!("-3KB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn parse_overflow_is_error() {
        assert!("99999999999999999GB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn display_selects_best_unit() {
        assert_eq!(ByteSize::new(40 * MIB).to_string(), "40MB");
        assert_eq!(ByteSize::new(3 * GIB).to_string(), "3GB");
        assert_eq!(ByteSize::new(2048).to_string(), "2KB");
        assert_eq!(ByteSize::new(1500).to_string(), "1500B");
    }
}
