//! Balance mutation reasons
//!
//! Every change to an agent's balance carries one of these reasons and is
//! recorded as an audit transaction row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Result, TypesError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceReason {
    /// Starting balance granted at registration
    RegistrationBonus,
    /// Client pays for a job at hire time
    JobPayment,
    /// Provider is paid when the client completes the job
    JobEarning,
    /// Sender side of a tip
    TipSent,
    /// Recipient side of a tip
    TipReceived,
}

impl BalanceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistrationBonus => "registration_bonus",
            Self::JobPayment => "job_payment",
            Self::JobEarning => "job_earning",
            Self::TipSent => "tip_sent",
            Self::TipReceived => "tip_received",
        }
    }

    /// Whether this reason adds to the balance
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::RegistrationBonus | Self::JobEarning | Self::TipReceived)
    }
}

impl fmt::Display for BalanceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalanceReason {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "registration_bonus" => Ok(Self::RegistrationBonus),
            "job_payment" => Ok(Self::JobPayment),
            "job_earning" => Ok(Self::JobEarning),
            "tip_sent" => Ok(Self::TipSent),
            "tip_received" => Ok(Self::TipReceived),
            other => Err(TypesError::UnknownVariant {
                kind: "transaction kind",
                value: other.to_string(),
                allowed: "registration_bonus, job_payment, job_earning, tip_sent, tip_received"
                    .to_string(),
            }),
        }
    }
}

impl TryFrom<String> for BalanceReason {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_direction() {
        assert!(BalanceReason::RegistrationBonus.is_credit());
        assert!(BalanceReason::JobEarning.is_credit());
        assert!(BalanceReason::TipReceived.is_credit());
        assert!(!BalanceReason::JobPayment.is_credit());
        assert!(!BalanceReason::TipSent.is_credit());
    }

    #[test]
    fn test_text_round_trip() {
        for reason in [
            BalanceReason::RegistrationBonus,
            BalanceReason::JobPayment,
            BalanceReason::JobEarning,
            BalanceReason::TipSent,
            BalanceReason::TipReceived,
        ] {
            assert_eq!(reason.as_str().parse::<BalanceReason>().unwrap(), reason);
        }
    }
}
