//! Event types published by the fundraise contract, as seen off-chain.
//!
//! One [`EventKind`] per topic symbol in `contracts/fundraise/src/events.rs`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `recorded`: a contribution or issuer top-up was accepted.
    ContributionRecorded,
    /// `qualified`: buffered value moved to the qualified bucket.
    ContributionQualified,
    /// `demoted`: qualified value moved back to buffered.
    ContributionDemoted,
    /// `state`: the fundraise was finished or canceled.
    StateTransitioned,
    /// `claimed`
    TokensClaimed,
    /// `refunded`
    ContributionRefunded,
    /// `rejected`: the issuer or a manager returned a contributor's funds.
    ContributorRejected,
    /// `released`: funds paid out to the issuer.
    FundsReleased,
    /// `mgr_add`
    ManagerAdded,
    /// `mgr_del`
    ManagerRemoved,
    Unknown,
}

impl EventKind {
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "recorded" => Self::ContributionRecorded,
            "qualified" => Self::ContributionQualified,
            "demoted" => Self::ContributionDemoted,
            "state" => Self::StateTransitioned,
            "claimed" => Self::TokensClaimed,
            "refunded" => Self::ContributionRefunded,
            "rejected" => Self::ContributorRejected,
            "released" => Self::FundsReleased,
            "mgr_add" => Self::ManagerAdded,
            "mgr_del" => Self::ManagerRemoved,
            _ => Self::Unknown,
        }
    }

    /// Identifier stored in the `event_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContributionRecorded => "contribution_recorded",
            Self::ContributionQualified => "contribution_qualified",
            Self::ContributionDemoted => "contribution_demoted",
            Self::StateTransitioned => "state_transitioned",
            Self::TokensClaimed => "tokens_claimed",
            Self::ContributionRefunded => "contribution_refunded",
            Self::ContributorRejected => "contributor_rejected",
            Self::FundsReleased => "funds_released",
            Self::ManagerAdded => "manager_added",
            Self::ManagerRemoved => "manager_removed",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the event's data carries a currency and amount.
    pub fn moves_value(&self) -> bool {
        matches!(
            self,
            Self::ContributionRecorded
                | Self::ContributionQualified
                | Self::ContributionDemoted
                | Self::ContributionRefunded
                | Self::ContributorRejected
                | Self::FundsReleased
        )
    }
}

/// A decoded fundraise event, ready to be stored.
///
/// `account` is the address in the second topic: the contributor for
/// ledger events, the issuer for payouts, the manager for role events.
/// `detail` holds what does not fit the other columns, such as
/// `"ongoing->finished"` for state transitions or the caller of a role
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundraiseEvent {
    pub event_id: String,
    pub event_type: String,
    pub account: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<String>,
    pub sequence: Option<i64>,
    pub detail: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub account: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<String>,
    pub sequence: Option<i64>,
    pub detail: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}
