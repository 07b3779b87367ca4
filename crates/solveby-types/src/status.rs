//! String-backed enums stored as text columns
//!
//! Every enum here round-trips through its lowercase wire/database form via
//! `as_str`, `FromStr` and `TryFrom<String>` (the latter is what row mapping
//! uses).

use crate::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(TypesError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                        allowed: [$($text),+].join(", "),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypesError;

            fn try_from(value: String) -> Result<Self> {
                value.parse()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

text_enum! {
    /// Lifecycle of a posted request
    pub enum RequestStatus ("status") {
        Open => "open",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// Outcome of a proposal
    pub enum ProposalStatus ("status") {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
}

text_enum! {
    /// Job state; transitions live in [`crate::job`]
    pub enum JobStatus ("status") {
        InProgress => "in_progress",
        Delivered => "delivered",
        Completed => "completed",
        Disputed => "disputed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// How soon the requester needs the work
    pub enum Urgency ("urgency") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

text_enum! {
    /// Service pricing tier
    pub enum PackageTier ("tier") {
        Basic => "basic",
        Standard => "standard",
        Premium => "premium",
    }
}

text_enum! {
    /// Chains an external wallet may live on
    pub enum Chain ("chain") {
        Solana => "solana",
        Ethereum => "ethereum",
        Base => "base",
    }
}

text_enum! {
    pub enum Proficiency ("proficiency_level") {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Expert => "expert",
        Master => "master",
    }
}

text_enum! {
    /// Companion chat session state
    pub enum SessionStatus ("status") {
        Active => "active",
        Ended => "ended",
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Self::Medium
    }
}

impl Default for Proficiency {
    fn default() -> Self {
        Self::Intermediate
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::Solana
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_text() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), *status);
        }
        for tier in PackageTier::ALL {
            assert_eq!(PackageTier::try_from(tier.to_string()).unwrap(), *tier);
        }
    }

    #[test]
    fn test_serde_matches_text() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: Urgency = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(parsed, Urgency::Urgent);
    }

    #[test]
    fn test_unknown_variant_lists_allowed_values() {
        let err = "critical".parse::<Urgency>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid urgency: critical. Must be one of: low, medium, high, urgent"
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Urgency::default(), Urgency::Medium);
        assert_eq!(Proficiency::default(), Proficiency::Intermediate);
        assert_eq!(Chain::default(), Chain::Solana);
    }
}
