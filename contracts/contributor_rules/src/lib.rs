//! # Contributor Rules
//!
//! Eligibility policy consulted by a fundraise whenever a contributor's
//! buffered value is about to be qualified, and again when tokens are
//! claimed. The fundraise passes *projected* values: the contributor's
//! qualified BCY total and the contributor count as they would be if the
//! promotion went through.
//!
//! Limits are checked in a fixed order so the returned reason is stable:
//!
//! 1. `MinAmount`: `amount < min_amount`
//! 2. `MaxAmount`: `amount > max_amount`
//! 3. `MaxContributors`: `contributor_count > max_contributors`
//!
//! A limit of `0` disables that check.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, contracttype, Address, Env};


const DAY_IN_LEDGERS: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidLimits = 3,
}

/// Outcome of an eligibility check.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Verdict {
    Accept = 0,
    MinAmount = 1,
    MaxAmount = 2,
    MaxContributors = 3,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Limits {
    /// Minimum qualified BCY per contributor.
    pub min_amount: i128,
    /// Maximum qualified BCY per contributor.
    pub max_amount: i128,
    /// Maximum number of counted contributors.
    pub max_contributors: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum DataKey {
    Admin,
    Limits,
}

#[contract]
pub struct ContributorRules;

#[contractimpl]
impl ContributorRules {
    pub fn init(
        env: Env,
        admin: Address,
        min_amount: i128,
        max_amount: i128,
        max_contributors: u32,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();
        let limits = Limits {
            min_amount,
            max_amount,
            max_contributors,
        };
        validate(&limits)?;
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Limits, &limits);
        bump_instance(&env);
        Ok(())
    }

    pub fn limits(env: Env) -> Result<Limits, Error> {
        load_limits(&env)
    }

    pub fn set_min_amount(env: Env, min_amount: i128) -> Result<(), Error> {
        update(&env, |l| l.min_amount = min_amount)
    }

    pub fn set_max_amount(env: Env, max_amount: i128) -> Result<(), Error> {
        update(&env, |l| l.max_amount = max_amount)
    }

    pub fn set_max_contributors(env: Env, max_contributors: u32) -> Result<(), Error> {
        update(&env, |l| l.max_contributors = max_contributors)
    }

    /// Evaluate a projected qualification.
    ///
    /// `currency` is `None` for the aggregate re-check done at claim time;
    /// these limits are currency-agnostic and ignore it.
    pub fn check(
        env: Env,
        _contributor: Address,
        _currency: Option<Address>,
        amount: i128,
        contributor_count: u32,
    ) -> Result<Verdict, Error> {
        let limits = load_limits(&env)?;
        Ok(evaluate(&limits, amount, contributor_count))
    }
}

/// Pure evaluation of `limits` against a projected amount and count.
pub fn evaluate(limits: &Limits, amount: i128, contributor_count: u32) -> Verdict {
    if limits.min_amount > 0 && amount < limits.min_amount {
        return Verdict::MinAmount;
    }
    if limits.max_amount > 0 && amount > limits.max_amount {
        return Verdict::MaxAmount;
    }
    if limits.max_contributors > 0 && contributor_count > limits.max_contributors {
        return Verdict::MaxContributors;
    }
    Verdict::Accept
}

fn validate(limits: &Limits) -> Result<(), Error> {
    if limits.min_amount < 0 || limits.max_amount < 0 {
        return Err(Error::InvalidLimits);
    }
    if limits.max_amount > 0 && limits.min_amount > limits.max_amount {
        return Err(Error::InvalidLimits);
    }
    Ok(())
}

fn update(env: &Env, f: impl FnOnce(&mut Limits)) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    admin.require_auth();
    let mut limits = load_limits(env)?;
    f(&mut limits);
    validate(&limits)?;
    env.storage().instance().set(&DataKey::Limits, &limits);
    Ok(())
}

fn load_limits(env: &Env) -> Result<Limits, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Limits)
        .ok_or(Error::NotInitialized)
}

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}
