//! Sequence numbers for amendment records and instruments.
//!
//! Numbers take the form `NNN/YYYY`: a zero-padded ordinal followed by the
//! year in which the record was created.
//!
//! # Conventions
//!
//! - The counter is scoped to `(contract, kind)`; amendment records and
//!   instruments keep independent counters.
//! - The next ordinal is the highest existing ordinal plus one, whatever year
//!   the existing numbers carry. The counter does not reset on January 1st.
//! - The year is the creation year, never the record's effective date.
//! - Ordinals above 999 keep growing (`1000/2026`); padding is a minimum width.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SequenceNumber {
    // Field order gives the derived `Ord`: by year, then ordinal.
    year: i32,
    ordinal: u32,
}

impl SequenceNumber {
    pub fn new(ordinal: u32, year: i32) -> Self {
        Self { year, ordinal }
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Allocate the number that follows every number in `existing`.
    ///
    /// `existing` must already be restricted to one `(contract, kind)` scope.
    pub fn next_after<'a>(
        existing: impl IntoIterator<Item = &'a SequenceNumber>,
        year: i32,
    ) -> Self {
        let last = existing
            .into_iter()
            .map(|n| n.ordinal)
            .max()
            .unwrap_or(0);
        Self::new(last + 1, year)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}/{}", self.ordinal, self.year)
    }
}

impl FromStr for SequenceNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ValidationError::single("sequence_number", format!("expected NNN/YYYY, got {s:?}"))
        };
        let (ordinal, year) = s.trim().split_once('/').ok_or_else(invalid)?;
        if ordinal.is_empty() || !ordinal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let ordinal: u32 = ordinal.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        if ordinal == 0 {
            return Err(invalid());
        }
        Ok(Self::new(ordinal, year))
    }
}

impl TryFrom<String> for SequenceNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SequenceNumber> for String {
    fn from(value: SequenceNumber) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_number_of_scope() {
        let none: [SequenceNumber; 0] = [];
        let n = SequenceNumber::next_after(&none, 2026);
        assert_eq!(n.to_string(), "001/2026");
    }

    #[test]
    fn follows_highest_ordinal() {
        let existing = [
            SequenceNumber::new(1, 2026),
            SequenceNumber::new(3, 2026),
            SequenceNumber::new(2, 2026),
        ];
        assert_eq!(
            SequenceNumber::next_after(&existing, 2026).to_string(),
            "004/2026"
        );
    }

    #[test]
    fn counter_does_not_reset_across_years() {
        let existing = [SequenceNumber::new(10, 2025)];
        assert_eq!(
            SequenceNumber::next_after(&existing, 2026).to_string(),
            "011/2026"
        );
    }

    #[test]
    fn wide_ordinals_keep_growing() {
        let existing = [SequenceNumber::new(999, 2026)];
        assert_eq!(
            SequenceNumber::next_after(&existing, 2026).to_string(),
            "1000/2026"
        );
    }

    #[test]
    fn parse_roundtrip_values() {
        let n: SequenceNumber = "007/2024".parse().unwrap();
        assert_eq!(n.ordinal(), 7);
        assert_eq!(n.year(), 2024);
        assert_eq!(n.to_string(), "007/2024");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "7", "/2024", "abc/2024", "001/24", "000/2024", "001/20a4"] {
            assert!(bad.parse::<SequenceNumber>().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn orders_by_year_then_ordinal() {
        let a = SequenceNumber::new(9, 2025);
        let b = SequenceNumber::new(1, 2026);
        let c = SequenceNumber::new(2, 2026);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn serializes_as_string() {
        let n = SequenceNumber::new(2, 2026);
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"002/2026\"");
        let back: SequenceNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }
}
