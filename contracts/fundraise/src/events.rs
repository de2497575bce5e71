//! # Events
//!
//! Every observable ledger change publishes one event. Topics are
//! `(symbol, key)` where the key is the contributor (or manager) address;
//! lifecycle transitions use the symbol alone. Payloads are
//! `#[contracttype]` structs so off-chain consumers decode named fields.
//!
//! | Topic       | Payload                  |
//! |-------------|--------------------------|
//! | `recorded`  | [`ContributionRecorded`] |
//! | `qualified` | [`ContributionQualified`]|
//! | `demoted`   | [`ContributionDemoted`]  |
//! | `state`     | [`StateTransitioned`]    |
//! | `claimed`   | [`TokensClaimed`]        |
//! | `refunded`  | [`ContributionRefunded`] |
//! | `rejected`  | [`ContributorRejected`]  |
//! | `released`  | [`FundsReleased`]        |
//! | `mgr_add`   | caller `Address`         |
//! | `mgr_del`   | caller `Address`         |

use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::types::FundraiseState;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributionRecorded {
    pub contributor: Address,
    pub currency: Address,
    pub amount: i128,
    pub bcy_value: i128,
    pub sequence: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributionQualified {
    pub contributor: Address,
    pub currency: Address,
    pub amount: i128,
    pub sequence: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributionDemoted {
    pub contributor: Address,
    pub currency: Address,
    pub amount: i128,
    pub sequence: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateTransitioned {
    pub from: FundraiseState,
    pub to: FundraiseState,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokensClaimed {
    pub contributor: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributionRefunded {
    pub contributor: Address,
    pub currency: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributorRejected {
    pub contributor: Address,
    pub currency: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundsReleased {
    pub issuer: Address,
    pub currency: Address,
    pub amount: i128,
}

pub fn emit_contribution_recorded(
    env: &Env,
    contributor: Address,
    currency: Address,
    amount: i128,
    bcy_value: i128,
    sequence: u64,
) {
    let topics = (symbol_short!("recorded"), contributor.clone());
    env.events().publish(
        topics,
        ContributionRecorded {
            contributor,
            currency,
            amount,
            bcy_value,
            sequence,
        },
    );
}

pub fn emit_contribution_qualified(
    env: &Env,
    contributor: Address,
    currency: Address,
    amount: i128,
    sequence: u64,
) {
    let topics = (symbol_short!("qualified"), contributor.clone());
    env.events().publish(
        topics,
        ContributionQualified {
            contributor,
            currency,
            amount,
            sequence,
        },
    );
}

pub fn emit_contribution_demoted(
    env: &Env,
    contributor: Address,
    currency: Address,
    amount: i128,
    sequence: u64,
) {
    let topics = (symbol_short!("demoted"), contributor.clone());
    env.events().publish(
        topics,
        ContributionDemoted {
            contributor,
            currency,
            amount,
            sequence,
        },
    );
}

pub fn emit_state_transitioned(env: &Env, from: FundraiseState, to: FundraiseState) {
    env.events()
        .publish((symbol_short!("state"),), StateTransitioned { from, to });
}

pub fn emit_tokens_claimed(env: &Env, contributor: Address, amount: i128) {
    let topics = (symbol_short!("claimed"), contributor.clone());
    env.events()
        .publish(topics, TokensClaimed { contributor, amount });
}

pub fn emit_contribution_refunded(env: &Env, contributor: Address, currency: Address, amount: i128) {
    let topics = (symbol_short!("refunded"), contributor.clone());
    env.events().publish(
        topics,
        ContributionRefunded {
            contributor,
            currency,
            amount,
        },
    );
}

pub fn emit_contributor_rejected(env: &Env, contributor: Address, currency: Address, amount: i128) {
    let topics = (symbol_short!("rejected"), contributor.clone());
    env.events().publish(
        topics,
        ContributorRejected {
            contributor,
            currency,
            amount,
        },
    );
}

pub fn emit_funds_released(env: &Env, issuer: Address, currency: Address, amount: i128) {
    let topics = (symbol_short!("released"), issuer.clone());
    env.events().publish(
        topics,
        FundsReleased {
            issuer,
            currency,
            amount,
        },
    );
}

pub fn emit_manager_added(env: &Env, manager: Address, caller: Address) {
    env.events()
        .publish((symbol_short!("mgr_add"), manager), caller);
}

pub fn emit_manager_removed(env: &Env, manager: Address, caller: Address) {
    env.events()
        .publish((symbol_short!("mgr_del"), manager), caller);
}
