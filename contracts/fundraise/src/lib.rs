//! # Fundraise Contract
//!
//! A security-token fundraise that accepts contributions in several
//! currencies, qualifies contributors retroactively, and settles by either
//! distributing tokens or refunding.
//!
//! | Phase         | Entry Point(s)                                                   |
//! |---------------|------------------------------------------------------------------|
//! | Bootstrap     | [`Fundraise::init`]                                              |
//! | Roles         | `add_manager`, `remove_manager`                                  |
//! | Issuer setup  | `set_token_price_bcy`, `set_total_token_amount`, `set_presale`,  |
//! |               | `set_eligibility_rules`, `allow_contribution_withdrawals`        |
//! | Contributions | [`Fundraise::contribute`], `top_up`                              |
//! | Qualification | `whitelist`, `unwhitelist`, `reject_contributor`                 |
//! | Lifecycle     | `finish_fundraise`, `cancel_fundraise`, `state`, `is_expired`    |
//! | Settlement    | `claim_tokens`, `withdraw_contribution`,                         |
//! |               | `withdraw_all_contributions`, `release_funds`                    |
//!
//! ## Architecture
//!
//! Authorization lives in [`rbac`], persistence in [`storage`]. Bookkeeping
//! is split between [`ledger`] (entries, buckets, sequence, checkpoints),
//! [`qualification`] (whitelisting and the contribution fast path),
//! [`lifecycle`] (state machine and pricing) and [`settlement`] (claims,
//! refunds, payouts). This file only wires entry points to those modules.
//!
//! Every entry point returns `Result<_, Error>`. Soroban discards all writes
//! of a call that returns `Err`, so a failed operation leaves no trace.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, Address, Env, Vec};

pub mod checkpoint;
mod events;
pub mod interfaces;
mod ledger;
mod lifecycle;
mod math;
mod qualification;
pub mod rbac;
mod settlement;
mod storage;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_ledger;
#[cfg(test)]
mod test_settlement;

pub use events::{
    ContributionDemoted, ContributionQualified, ContributionRecorded, ContributionRefunded,
    ContributorRejected, FundsReleased, StateTransitioned, TokensClaimed,
};
pub use interfaces::Verdict;
pub use types::{
    Balance, ContributionEntry, EntryStatus, FundraiseConfig, FundraiseParams, FundraiseState,
    Pricing,
};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // Input
    InvalidAmount = 1,
    CurrencyNotAccepted = 2,
    InvalidParams = 3,
    // Policy
    BelowMinAmount = 10,
    AboveMaxAmount = 11,
    MaxContributorsReached = 12,
    HardCapExceeded = 13,
    SoftCapNotReached = 14,
    PresaleExceedsHardCap = 15,
    PresaleExceedsTokenAmount = 16,
    // State
    NotInitialized = 20,
    AlreadyInitialized = 21,
    NotStarted = 22,
    ContributionPeriodOver = 23,
    FundraiseFinished = 24,
    FundraiseCanceled = 25,
    FundraiseExpired = 26,
    FundraiseNotFinished = 27,
    AlreadyClaimed = 28,
    NothingToClaim = 29,
    NothingToRefund = 30,
    WithdrawalsNotAllowed = 31,
    TokenPriceAlreadySet = 32,
    TokenAmountAlreadySet = 33,
    PricingNotSet = 34,
    NothingToRelease = 35,
    SupplyExhausted = 36,
    // Authorization
    NotAuthorized = 40,
    // Arithmetic
    Overflow = 50,
}

/// Coarse classification of [`Error`] codes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed argument or unsupported currency.
    Input,
    /// Rejected by eligibility rules, caps or presale limits.
    Policy,
    /// Not allowed in the current lifecycle state.
    State,
    Authorization,
    Arithmetic,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match *self as u32 {
            0..=9 => ErrorKind::Input,
            10..=19 => ErrorKind::Policy,
            20..=39 => ErrorKind::State,
            40..=49 => ErrorKind::Authorization,
            _ => ErrorKind::Arithmetic,
        }
    }
}

#[contract]
pub struct Fundraise;

#[contractimpl]
impl Fundraise {
    // ─────────────────────────────────────────────────────────
    // Initialisation
    // ─────────────────────────────────────────────────────────

    /// Configure the fundraise. May be called once; the issuer must sign.
    pub fn init(env: Env, params: FundraiseParams) -> Result<(), Error> {
        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        params.issuer.require_auth();

        if params.end_date <= params.start_date
            || params.hard_cap <= 0
            || params.soft_cap < 0
            || params.soft_cap > params.hard_cap
        {
            return Err(Error::InvalidParams);
        }

        storage::save_config(
            &env,
            &FundraiseConfig {
                issuer: params.issuer,
                label: params.label,
                token: params.token,
                converter: params.converter,
                start_date: params.start_date,
                end_date: params.end_date,
                expiry_period: params.expiry_period,
                soft_cap: params.soft_cap,
                hard_cap: params.hard_cap,
            },
        );
        storage::save_settings(
            &env,
            &types::FundraiseSettings {
                status: FundraiseState::Ongoing,
                rules: params.rules,
                withdrawals_allowed: false,
                pricing: Pricing {
                    token_price: None,
                    total_tokens: None,
                    presale_amount: 0,
                    presale_tokens: 0,
                },
            },
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────

    pub fn add_manager(env: Env, caller: Address, manager: Address) -> Result<(), Error> {
        rbac::add_manager(&env, &caller, &manager)
    }

    pub fn remove_manager(env: Env, caller: Address, manager: Address) -> Result<(), Error> {
        rbac::remove_manager(&env, &caller, &manager)
    }

    pub fn is_manager(env: Env, address: Address) -> bool {
        rbac::is_manager(&env, &address)
    }

    pub fn issuer(env: Env) -> Result<Address, Error> {
        Ok(storage::load_config(&env)?.issuer)
    }

    // ─────────────────────────────────────────────────────────
    // Issuer setup
    // ─────────────────────────────────────────────────────────

    /// Set the BCY price of one token. Mutually exclusive with
    /// [`Fundraise::set_total_token_amount`].
    pub fn set_token_price_bcy(env: Env, caller: Address, price: i128) -> Result<(), Error> {
        rbac::require_issuer(&env, &caller)?;
        lifecycle::set_token_price(&env, price)
    }

    /// Set the total token supply. Mutually exclusive with
    /// [`Fundraise::set_token_price_bcy`].
    pub fn set_total_token_amount(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        rbac::require_issuer(&env, &caller)?;
        lifecycle::set_total_token_amount(&env, amount)
    }

    pub fn set_presale(env: Env, caller: Address, amount: i128, tokens: i128) -> Result<(), Error> {
        rbac::require_issuer(&env, &caller)?;
        lifecycle::set_presale(&env, amount, tokens)
    }

    /// Swap the eligibility rules. Applies to future qualifications and to
    /// the re-check at claim time.
    pub fn set_eligibility_rules(env: Env, caller: Address, rules: Address) -> Result<(), Error> {
        rbac::require_issuer(&env, &caller)?;
        lifecycle::set_rules(&env, &rules)
    }

    pub fn allow_contribution_withdrawals(env: Env, caller: Address) -> Result<(), Error> {
        rbac::require_issuer(&env, &caller)?;
        lifecycle::allow_withdrawals(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Contributions
    // ─────────────────────────────────────────────────────────

    /// Transfer `amount` of `currency` from `contributor` into the raise.
    ///
    /// Returns the sequence assigned to the contribution. If the contributor
    /// is whitelisted the amount is qualified immediately, otherwise it is
    /// buffered until they are.
    pub fn contribute(
        env: Env,
        contributor: Address,
        currency: Address,
        amount: i128,
    ) -> Result<u64, Error> {
        contributor.require_auth();
        qualification::contribute(&env, &contributor, &currency, amount)
    }

    /// Issuer top-up after finishing. Paid out through `release_funds`.
    pub fn top_up(env: Env, issuer: Address, currency: Address, amount: i128) -> Result<u64, Error> {
        rbac::require_issuer(&env, &issuer)?;
        settlement::top_up(&env, &issuer, &currency, amount)
    }

    // ─────────────────────────────────────────────────────────
    // Qualification
    // ─────────────────────────────────────────────────────────

    /// Whitelist `contributor` and qualify whatever they have buffered.
    ///
    /// A currency whose buffered amount fails the rules or the hard cap stays
    /// buffered; the call itself still succeeds.
    pub fn whitelist(env: Env, caller: Address, contributor: Address) -> Result<(), Error> {
        rbac::require_issuer_or_manager(&env, &caller)?;
        qualification::whitelist(&env, &contributor)
    }

    /// Remove `contributor` from the whitelist and move their qualified
    /// balances back to buffered.
    pub fn unwhitelist(env: Env, caller: Address, contributor: Address) -> Result<(), Error> {
        rbac::require_issuer_or_manager(&env, &caller)?;
        qualification::unwhitelist(&env, &contributor)
    }

    pub fn is_whitelisted(env: Env, contributor: Address) -> bool {
        qualification::is_whitelisted(&env, &contributor)
    }

    /// Refund every outstanding amount of `contributor` and drop them from
    /// the whitelist.
    pub fn reject_contributor(env: Env, caller: Address, contributor: Address) -> Result<(), Error> {
        rbac::require_issuer_or_manager(&env, &caller)?;
        qualification::reject(&env, &contributor)
    }

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────

    /// Close the raise successfully. Without `force` the soft cap must have
    /// been reached.
    pub fn finish_fundraise(env: Env, caller: Address, force: bool) -> Result<(), Error> {
        rbac::require_issuer(&env, &caller)?;
        lifecycle::finish(&env, force)
    }

    pub fn cancel_fundraise(env: Env, caller: Address) -> Result<(), Error> {
        rbac::require_issuer(&env, &caller)?;
        lifecycle::cancel(&env)
    }

    pub fn state(env: Env) -> Result<FundraiseState, Error> {
        lifecycle::current_state(&env)
    }

    pub fn is_expired(env: Env) -> Result<bool, Error> {
        lifecycle::is_expired(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────

    /// Transfer the contributor's token allocation. Allowed once.
    pub fn claim_tokens(env: Env, contributor: Address) -> Result<i128, Error> {
        contributor.require_auth();
        settlement::claim_tokens(&env, &contributor)
    }

    pub fn token_allocation(env: Env, contributor: Address) -> Result<i128, Error> {
        settlement::token_allocation(&env, &contributor)
    }

    pub fn withdraw_contribution(
        env: Env,
        contributor: Address,
        currency: Address,
    ) -> Result<i128, Error> {
        contributor.require_auth();
        settlement::withdraw_contribution(&env, &contributor, &currency)
    }

    pub fn withdraw_all_contributions(env: Env, contributor: Address) -> Result<(), Error> {
        contributor.require_auth();
        settlement::withdraw_all_contributions(&env, &contributor)
    }

    /// Pay the issuer the unreleased qualified total and top-ups of
    /// `currency`.
    pub fn release_funds(env: Env, caller: Address, currency: Address) -> Result<i128, Error> {
        rbac::require_issuer(&env, &caller)?;
        settlement::release_funds(&env, &currency)
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    /// Last assigned sequence; 0 before any contribution.
    pub fn sequence(env: Env) -> u64 {
        ledger::current_sequence(&env)
    }

    pub fn contributor_count(env: Env) -> u32 {
        storage::load_counters(&env).contributor_count
    }

    pub fn qualified_balance(env: Env, contributor: Address, currency: Address) -> i128 {
        ledger::qualified_balance(&env, &contributor, &currency)
    }

    pub fn buffered_balance(env: Env, contributor: Address, currency: Address) -> i128 {
        ledger::buffered_balance(&env, &contributor, &currency)
    }

    pub fn qualified_total(env: Env, currency: Address) -> i128 {
        ledger::qualified_total(&env, &currency)
    }

    /// Qualified total of `currency` as of `sequence`.
    pub fn historical_balance(env: Env, sequence: u64, currency: Address) -> i128 {
        ledger::historical_balance(&env, sequence, &currency)
    }

    pub fn contribution(env: Env, sequence: u64) -> Option<ContributionEntry> {
        ledger::entry(&env, sequence)
    }

    pub fn is_contribution_qualified(env: Env, sequence: u64) -> bool {
        ledger::entry(&env, sequence)
            .map(|entry| entry.status == EntryStatus::Qualified)
            .unwrap_or(false)
    }

    pub fn contributions_of(env: Env, contributor: Address) -> Vec<ContributionEntry> {
        ledger::entries_of(&env, &contributor)
    }

    pub fn has_claimed(env: Env, contributor: Address) -> bool {
        storage::load_contributor(&env, &contributor).claimed
    }

    pub fn config(env: Env) -> Result<FundraiseConfig, Error> {
        storage::load_config(&env)
    }

    pub fn pricing(env: Env) -> Result<Pricing, Error> {
        Ok(storage::load_settings(&env)?.pricing)
    }

    /// Token supply, derived from the price when only the price is set.
    pub fn total_token_amount(env: Env) -> Result<Option<i128>, Error> {
        let pricing = storage::load_settings(&env)?.pricing;
        lifecycle::total_tokens(&env, &pricing)
    }

    pub fn currencies(env: Env) -> Vec<Address> {
        storage::load_currencies(&env)
    }
}
