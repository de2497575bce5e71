//! # Types
//!
//! Shared data structures used across all modules of the fundraise contract.
//!
//! ## Config / Settings split
//!
//! A fundraise is stored as two instance entries:
//!
//! - [`FundraiseConfig`]: written once at `init`; never mutated.
//! - [`FundraiseSettings`]: lifecycle status, active eligibility rules,
//!   withdrawal flag and pricing; written by issuer actions.
//!
//! ## Two-bucket balances
//!
//! Every `(contributor, currency)` pair owns a [`Balance`] with a buffered
//! bucket (received, not yet counted) and a qualified bucket (counted toward
//! caps and token allocation). Value only moves between the buckets through
//! promotion and demotion, so "was this counted?" is always answerable.
//!
//! ## Lifecycle
//!
//! ```text
//! Ongoing ──► Finished
//!     └─────► Canceled
//! Ongoing ··► Expired   (derived on read, never stored)
//! ```

use soroban_sdk::{contracttype, Address, Env, String, Vec};

/// Lifecycle state of the fundraise.
///
/// Only `Ongoing`, `Finished` and `Canceled` are ever stored. `Expired` is
/// returned by [`crate::Fundraise::state`] when an `Ongoing` fundraise has
/// passed `end_date + expiry_period` without reaching its soft cap.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FundraiseState {
    Ongoing,
    Finished,
    Canceled,
    Expired,
}

/// Status of a single recorded contribution.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EntryStatus {
    /// Received, waiting for the contributor to be whitelisted.
    Buffered,
    /// Passed the eligibility rules; counts toward caps and allocation.
    Qualified,
    /// Returned to the contributor by the issuer or a manager.
    Rejected,
    /// Withdrawn by the contributor.
    Refunded,
    /// Converted into security tokens.
    Claimed,
}

/// One accepted contribution as reported to callers. Entries are never
/// deleted; only `status` moves.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributionEntry {
    pub contributor: Address,
    pub currency: Address,
    /// Raw amount in `currency` units.
    pub amount: i128,
    /// BCY value at the time of contribution.
    pub bcy_value: i128,
    pub sequence: u64,
    pub status: EntryStatus,
}

/// Stored form of a contribution. Its status is not stored here but read
/// from the [`EntryLog`] of its `(contributor, currency)` pair at `position`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryRecord {
    pub contributor: Address,
    pub currency: Address,
    pub amount: i128,
    pub bcy_value: i128,
    pub sequence: u64,
    /// Index of this entry among the pair's entries.
    pub position: u32,
}

/// Entries at positions below `end` (and at or above the previous run's
/// `end`) share `status`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusRun {
    pub end: u32,
    pub status: EntryStatus,
}

/// Run-length status history of one `(contributor, currency)` pair.
///
/// Buckets always move whole, so a status change relabels runs instead of
/// touching entries. Adjacent runs with the same status are merged; the run
/// count is bounded by the number of terminal transitions, not by the number
/// of entries.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryLog {
    pub count: u32,
    pub runs: Vec<StatusRun>,
}

impl EntryLog {
    pub fn new(env: &Env) -> Self {
        EntryLog {
            count: 0,
            runs: Vec::new(env),
        }
    }

    /// Append a buffered entry and return its position.
    pub fn push_buffered(&mut self) -> u32 {
        let position = self.count;
        self.count += 1;
        let last = self.runs.len().checked_sub(1);
        match last.and_then(|i| self.runs.get(i).map(|run| (i, run))) {
            Some((i, mut run)) if run.status == EntryStatus::Buffered => {
                run.end = self.count;
                self.runs.set(i, run);
            }
            _ => self.runs.push_back(StatusRun {
                end: self.count,
                status: EntryStatus::Buffered,
            }),
        }
        position
    }

    /// Move every entry in status `from` to `to`.
    pub fn relabel(&mut self, env: &Env, from: EntryStatus, to: EntryStatus) {
        let mut merged: Vec<StatusRun> = Vec::new(env);
        for mut run in self.runs.iter() {
            if run.status == from {
                run.status = to;
            }
            match merged.pop_back() {
                Some(mut prev) if prev.status == run.status => {
                    prev.end = run.end;
                    merged.push_back(prev);
                }
                Some(prev) => {
                    merged.push_back(prev);
                    merged.push_back(run);
                }
                None => merged.push_back(run),
            }
        }
        self.runs = merged;
    }

    pub fn status_of(&self, position: u32) -> Option<EntryStatus> {
        self.runs
            .iter()
            .find(|run| position < run.end)
            .map(|run| run.status)
    }
}

/// Aggregate balance of a contributor in one currency.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Balance {
    pub buffered: i128,
    pub qualified: i128,
    pub buffered_bcy: i128,
    pub qualified_bcy: i128,
}

/// Per-contributor record.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contributor {
    pub whitelisted: bool,
    /// Set the first time any of the contributor's value is qualified.
    /// Never cleared; see `contributor_count`.
    pub counted: bool,
    pub claimed: bool,
    /// Sum of `qualified_bcy` across every currency.
    pub qualified_bcy: i128,
    /// Currencies this contributor has ever sent, in first-use order.
    pub currencies: Vec<Address>,
    /// Number of entries; their sequences are indexed separately.
    pub entry_count: u32,
}

impl Contributor {
    pub fn new(env: &Env) -> Self {
        Contributor {
            whitelisted: false,
            counted: false,
            claimed: false,
            qualified_bcy: 0,
            currencies: Vec::new(env),
            entry_count: 0,
        }
    }
}

/// Per-currency totals across all contributors.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CurrencyLedger {
    /// Current qualified total; equals the value of the latest checkpoint.
    pub qualified: i128,
    /// BCY value of `qualified` at contribution-time rates.
    pub qualified_bcy: i128,
    /// Number of checkpoints written for this currency.
    pub checkpoints: u32,
    /// Issuer top-ups received after finishing.
    pub top_up: i128,
    /// Amount already paid out to the issuer.
    pub released: i128,
}

/// Cumulative qualified balance of a currency as of `sequence`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Checkpoint {
    pub sequence: u64,
    pub balance: i128,
}

/// Fundraise-wide counters.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LedgerCounters {
    /// Last assigned global sequence (0 before the first contribution).
    pub sequence: u64,
    /// Contributors that have ever had value qualified.
    pub contributor_count: u32,
    /// Sum of every contributor's `qualified_bcy`.
    pub qualified_bcy: i128,
    /// Security tokens already transferred to contributors.
    pub tokens_claimed: i128,
}

/// Arguments to [`crate::Fundraise::init`].
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundraiseParams {
    pub issuer: Address,
    pub label: String,
    /// Security token distributed to contributors.
    pub token: Address,
    /// `CurrencyConverter` contract.
    pub converter: Address,
    /// Initial `EligibilityRules` contract.
    pub rules: Address,
    pub start_date: u64,
    pub end_date: u64,
    /// Grace period after `end_date` before an unsuccessful raise expires.
    pub expiry_period: u64,
    pub soft_cap: i128,
    pub hard_cap: i128,
}

/// Immutable fundraise configuration, written once at `init`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundraiseConfig {
    pub issuer: Address,
    pub label: String,
    pub token: Address,
    pub converter: Address,
    pub start_date: u64,
    pub end_date: u64,
    pub expiry_period: u64,
    pub soft_cap: i128,
    pub hard_cap: i128,
}

/// Price and supply of the security token.
///
/// `token_price` and `total_tokens` are two derivations of the same
/// relationship (`price = hard_cap / total_tokens`); at most one is set.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pricing {
    pub token_price: Option<i128>,
    pub total_tokens: Option<i128>,
    pub presale_amount: i128,
    pub presale_tokens: i128,
}

/// Mutable fundraise settings.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundraiseSettings {
    /// Stored state; never `Expired`.
    pub status: FundraiseState,
    pub rules: Address,
    pub withdrawals_allowed: bool,
    pub pricing: Pricing,
}
