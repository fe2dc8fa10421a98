//! Approval life cycle shared by amendment records and instruments.
//!
//! ```text
//! pending ──► under_review ──► approved ──► executed
//!    │              │              ▲
//!    │              └──► rejected  │
//!    ├──────────────────► rejected │
//!    └─────────────────────────────┘
//! ```
//!
//! Instruments use the same graph without `executed`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidTransition, ValidationError};

/// A state enum with a fixed successor table.
pub trait Lifecycle: Copy + Eq + 'static {
    /// States reachable in one step from `self`.
    fn successors(self) -> &'static [Self];

    fn code(self) -> &'static str;

    fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    /// Validate a move and return the new state.
    fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self.code(),
                to: next.code(),
            })
        }
    }

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

/// Life-cycle state of an amendment record ("termo").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermState {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Executed,
}

impl TermState {
    pub const ALL: [TermState; 5] = [
        Self::Pending,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
        Self::Executed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::UnderReview => "Em Análise",
            Self::Approved => "Aprovado",
            Self::Rejected => "Rejeitado",
            Self::Executed => "Executado",
        }
    }

    /// Whether a term in this state has passed approval and therefore
    /// counts toward the contract aggregates.
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved | Self::Executed)
    }
}

impl Lifecycle for TermState {
    fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::UnderReview, Self::Approved, Self::Rejected],
            Self::UnderReview => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Executed],
            Self::Rejected | Self::Executed => &[],
        }
    }

    fn code(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
        }
    }
}

/// Life-cycle state of an ancillary instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentState {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl InstrumentState {
    pub const ALL: [InstrumentState; 4] = [
        Self::Pending,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
    ];
}

impl Lifecycle for InstrumentState {
    fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::UnderReview, Self::Approved, Self::Rejected],
            Self::UnderReview => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    fn code(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

macro_rules! code_conversions {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
                <$ty>::ALL
                    .into_iter()
                    .find(|state| state.code() == wanted)
                    .ok_or_else(|| ValidationError::single($field, format!("unknown state {s:?}")))
            }
        }
    };
}

code_conversions!(TermState, "state");
code_conversions!(InstrumentState, "state");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_term_transitions() {
        use TermState::*;
        assert_eq!(Pending.transition(UnderReview), Ok(UnderReview));
        assert_eq!(Pending.transition(Approved), Ok(Approved));
        assert_eq!(Pending.transition(Rejected), Ok(Rejected));
        assert_eq!(UnderReview.transition(Approved), Ok(Approved));
        assert_eq!(UnderReview.transition(Rejected), Ok(Rejected));
        assert_eq!(Approved.transition(Executed), Ok(Executed));
    }

    #[test]
    fn rejected_never_becomes_approved() {
        let err = TermState::Rejected
            .transition(TermState::Approved)
            .unwrap_err();
        assert_eq!(err.from, "rejected");
        assert_eq!(err.to, "approved");
    }

    #[test]
    fn every_other_term_move_is_illegal() {
        let legal = [
            ("pending", "under_review"),
            ("pending", "approved"),
            ("pending", "rejected"),
            ("under_review", "approved"),
            ("under_review", "rejected"),
            ("approved", "executed"),
        ];
        for from in TermState::ALL {
            for to in TermState::ALL {
                let expected = legal.contains(&(from.code(), to.code()));
                assert_eq!(
                    from.transition(to).is_ok(),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn self_transition_is_illegal() {
        assert!(TermState::Pending.transition(TermState::Pending).is_err());
        assert!(
            InstrumentState::Pending
                .transition(InstrumentState::Pending)
                .is_err()
        );
    }

    #[test]
    fn instrument_approval_is_terminal() {
        assert!(InstrumentState::Approved.is_terminal());
        assert!(InstrumentState::Rejected.is_terminal());
        assert_eq!(
            InstrumentState::UnderReview.transition(InstrumentState::Approved),
            Ok(InstrumentState::Approved)
        );
    }

    #[test]
    fn executed_counts_as_approved() {
        assert!(TermState::Approved.is_approved());
        assert!(TermState::Executed.is_approved());
        assert!(!TermState::Pending.is_approved());
        assert!(!TermState::UnderReview.is_approved());
        assert!(!TermState::Rejected.is_approved());
    }

    #[test]
    fn parse_codes() {
        assert_eq!("under-review".parse::<TermState>(), Ok(TermState::UnderReview));
        assert_eq!(" Approved ".parse::<TermState>(), Ok(TermState::Approved));
        assert!("executed".parse::<InstrumentState>().is_err());
        assert!("done".parse::<TermState>().is_err());
    }
}
