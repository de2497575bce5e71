//! # Contributor Qualification
//!
//! Whitelisting is retroactive. Value sent by a contributor who is not yet
//! whitelisted sits in the buffered bucket; whitelisting later re-evaluates
//! each currency's buffered amount and promotes it if the rules pass.
//!
//! A contribution from an already-whitelisted contributor runs the same
//! per-currency promotion synchronously (the fast path), so "contribute then
//! whitelist" and "whitelist then contribute" leave identical ledger state.
//!
//! Failure handling differs by caller:
//!
//! - **whitelist**: a policy failure is local to its currency; that amount
//!   stays buffered and the remaining currencies are still evaluated.
//! - **fast path**: a policy failure aborts the contribution.
//!
//! The contributor count records contributors that have *ever* qualified.
//! It is incremented on a contributor's first promotion, inside the same
//! call as the rules check, and is never decremented.

use soroban_sdk::{token, Address, Env};

use crate::events;
use crate::interfaces::{CurrencyConverterClient, EligibilityRulesClient};
use crate::ledger;
use crate::lifecycle;
use crate::math;
use crate::storage;
use crate::types::{Balance, Contributor, EntryStatus};
use crate::{Error, ErrorKind};

pub fn is_whitelisted(env: &Env, contributor: &Address) -> bool {
    storage::load_contributor(env, contributor).whitelisted
}

pub fn whitelist(env: &Env, contributor: &Address) -> Result<(), Error> {
    lifecycle::require_ongoing(env)?;
    let mut record = storage::load_contributor(env, contributor);
    record.whitelisted = true;

    for currency in record.currencies.clone().iter() {
        match qualify(env, contributor, &mut record, &currency) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Policy => {}
            Err(e) => return Err(e),
        }
    }

    storage::save_contributor(env, contributor, &record);
    Ok(())
}

pub fn unwhitelist(env: &Env, contributor: &Address) -> Result<(), Error> {
    lifecycle::require_ongoing(env)?;
    let mut record = storage::load_contributor(env, contributor);
    record.whitelisted = false;

    for currency in record.currencies.clone().iter() {
        ledger::demote_from_qualified(env, contributor, &mut record, &currency)?;
    }

    storage::save_contributor(env, contributor, &record);
    Ok(())
}

/// Accept `amount` of `currency` from `contributor` and return its sequence.
///
/// Whitelisted contributors are promoted in the same call; any rules or
/// hard-cap failure rolls the whole contribution back.
pub fn contribute(
    env: &Env,
    contributor: &Address,
    currency: &Address,
    amount: i128,
) -> Result<u64, Error> {
    lifecycle::require_accepting_contributions(env)?;
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }

    let config = storage::load_config(env)?;
    let bcy_value = CurrencyConverterClient::new(env, &config.converter)
        .to_base_currency(&amount, currency)
        .ok_or(Error::CurrencyNotAccepted)?;
    if bcy_value <= 0 {
        return Err(Error::InvalidAmount);
    }

    token::Client::new(env, currency).transfer(
        contributor,
        &env.current_contract_address(),
        &amount,
    );

    let mut record = storage::load_contributor(env, contributor);
    let sequence =
        ledger::record_contribution(env, contributor, &mut record, currency, amount, bcy_value)?;
    if record.whitelisted {
        qualify(env, contributor, &mut record, currency)?;
    }
    storage::save_contributor(env, contributor, &record);
    Ok(sequence)
}

/// Return every buffered or qualified amount of `contributor` and drop them
/// from the whitelist. The contributor count is left as is.
pub fn reject(env: &Env, contributor: &Address) -> Result<(), Error> {
    lifecycle::require_ongoing(env)?;
    let mut record = storage::load_contributor(env, contributor);
    record.whitelisted = false;

    for currency in record.currencies.clone().iter() {
        ledger::demote_from_qualified(env, contributor, &mut record, &currency)?;
        let amount = ledger::release_balance(
            env,
            contributor,
            &mut record,
            &currency,
            false,
            EntryStatus::Rejected,
        )?;
        if amount == 0 {
            continue;
        }
        token::Client::new(env, &currency).transfer(
            &env.current_contract_address(),
            contributor,
            &amount,
        );
        events::emit_contributor_rejected(env, contributor.clone(), currency.clone(), amount);
    }

    storage::save_contributor(env, contributor, &record);
    Ok(())
}

/// Evaluate and, on success, promote the buffered amount of one currency.
fn qualify(
    env: &Env,
    contributor: &Address,
    record: &mut Contributor,
    currency: &Address,
) -> Result<(), Error> {
    let balance = storage::load_balance(env, contributor, currency);
    if balance.buffered == 0 {
        return Ok(());
    }
    admit(env, contributor, record, currency, &balance)?;

    let sequence = ledger::current_sequence(env);
    ledger::promote_to_qualified(env, contributor, record, currency, sequence)?;

    if !record.counted {
        record.counted = true;
        let mut counters = storage::load_counters(env);
        counters.contributor_count = counters
            .contributor_count
            .checked_add(1)
            .ok_or(Error::Overflow)?;
        storage::save_counters(env, &counters);
    }
    Ok(())
}

/// Rules and hard-cap check for promoting `balance.buffered`.
///
/// The hard cap is measured in BCY at contribution-time rates, as are the
/// rules and the token allocation. The soft cap and expiry use current
/// rates; see [`lifecycle::raised_bcy`].
fn admit(
    env: &Env,
    contributor: &Address,
    record: &Contributor,
    currency: &Address,
    balance: &Balance,
) -> Result<(), Error> {
    let config = storage::load_config(env)?;
    let settings = storage::load_settings(env)?;
    let counters = storage::load_counters(env);

    let projected_amount = math::add(record.qualified_bcy, balance.buffered_bcy)?;
    let projected_count = if record.counted {
        counters.contributor_count
    } else {
        counters
            .contributor_count
            .checked_add(1)
            .ok_or(Error::Overflow)?
    };

    EligibilityRulesClient::new(env, &settings.rules)
        .check(
            contributor,
            &Some(currency.clone()),
            &projected_amount,
            &projected_count,
        )
        .into_result()?;

    let committed = math::add(counters.qualified_bcy, settings.pricing.presale_amount)?;
    if math::add(committed, balance.buffered_bcy)? > config.hard_cap {
        return Err(Error::HardCapExceeded);
    }
    Ok(())
}
