//! # Settlement
//!
//! Moves value out of (and, for issuer top-ups, into) the fundraise once the
//! lifecycle allows it:
//!
//! | Flow               | Allowed when                                        |
//! |--------------------|-----------------------------------------------------|
//! | `claim_tokens`     | Finished                                            |
//! | refunds            | Canceled, Expired, or Ongoing with withdrawals on;  |
//! |                    | buffered-only once Finished                         |
//! | `release_funds`    | Finished                                            |
//! | `top_up`           | Finished                                            |
//!
//! Ledger writes happen before the token transfer in every flow.

use soroban_sdk::{token, Address, Env};

use crate::events;
use crate::interfaces::{CurrencyConverterClient, EligibilityRulesClient};
use crate::ledger;
use crate::lifecycle;
use crate::math;
use crate::storage;
use crate::types::{Contributor, EntryStatus, FundraiseState};
use crate::Error;

// ── Claim ────────────────────────────────────────────────────────────

/// Tokens `qualified_bcy` buys out of the public (non-presale) supply.
pub fn allocation(env: &Env, qualified_bcy: i128) -> Result<i128, Error> {
    let config = storage::load_config(env)?;
    let pricing = storage::load_settings(env)?.pricing;
    let total = lifecycle::total_tokens(env, &pricing)?.ok_or(Error::PricingNotSet)?;

    let public_tokens = math::sub(total, pricing.presale_tokens)?;
    let public_cap = math::sub(config.hard_cap, pricing.presale_amount)?;
    if public_cap <= 0 || public_tokens <= 0 {
        return Ok(0);
    }
    math::mul_div_floor(env, qualified_bcy, public_tokens, public_cap)
}

pub fn token_allocation(env: &Env, contributor: &Address) -> Result<i128, Error> {
    let record = storage::load_contributor(env, contributor);
    allocation(env, record.qualified_bcy)
}

pub fn claim_tokens(env: &Env, contributor: &Address) -> Result<i128, Error> {
    lifecycle::require_finished(env)?;

    let mut record = storage::load_contributor(env, contributor);
    if record.claimed {
        return Err(Error::AlreadyClaimed);
    }
    if record.qualified_bcy == 0 {
        return Err(Error::NothingToClaim);
    }

    // Rules may have changed since qualification; the current ones decide.
    let settings = storage::load_settings(env)?;
    let mut counters = storage::load_counters(env);
    EligibilityRulesClient::new(env, &settings.rules)
        .check(
            contributor,
            &None,
            &record.qualified_bcy,
            &counters.contributor_count,
        )
        .into_result()?;

    let tokens = allocation(env, record.qualified_bcy)?;
    let total = lifecycle::total_tokens(env, &settings.pricing)?.ok_or(Error::PricingNotSet)?;
    let public_tokens = math::sub(total, settings.pricing.presale_tokens)?;
    let claimed = math::add(counters.tokens_claimed, tokens)?;
    if claimed > public_tokens {
        return Err(Error::SupplyExhausted);
    }

    counters.tokens_claimed = claimed;
    storage::save_counters(env, &counters);
    ledger::mark_claimed(env, contributor, &record);
    record.claimed = true;
    storage::save_contributor(env, contributor, &record);

    if tokens > 0 {
        let config = storage::load_config(env)?;
        token::Client::new(env, &config.token).transfer(
            &env.current_contract_address(),
            contributor,
            &tokens,
        );
    }
    events::emit_tokens_claimed(env, contributor.clone(), tokens);
    Ok(tokens)
}

// ── Refunds ──────────────────────────────────────────────────────────

/// Whether a refund may include qualified value, or `Err` if refunds are
/// closed.
fn refund_scope(env: &Env) -> Result<bool, Error> {
    match lifecycle::current_state(env)? {
        FundraiseState::Canceled | FundraiseState::Expired => Ok(true),
        FundraiseState::Finished => Ok(false),
        FundraiseState::Ongoing => {
            if storage::load_settings(env)?.withdrawals_allowed {
                Ok(true)
            } else {
                Err(Error::WithdrawalsNotAllowed)
            }
        }
    }
}

pub fn withdraw_contribution(
    env: &Env,
    contributor: &Address,
    currency: &Address,
) -> Result<i128, Error> {
    let include_qualified = refund_scope(env)?;
    let mut record = storage::load_contributor(env, contributor);
    let amount = refund_currency(env, contributor, &mut record, currency, include_qualified)?;
    if amount == 0 {
        return Err(Error::NothingToRefund);
    }
    storage::save_contributor(env, contributor, &record);
    Ok(amount)
}

pub fn withdraw_all_contributions(env: &Env, contributor: &Address) -> Result<(), Error> {
    let include_qualified = refund_scope(env)?;
    let mut record = storage::load_contributor(env, contributor);

    let mut refunded_any = false;
    for currency in record.currencies.clone().iter() {
        let amount = refund_currency(env, contributor, &mut record, &currency, include_qualified)?;
        refunded_any |= amount > 0;
    }
    if !refunded_any {
        return Err(Error::NothingToRefund);
    }
    storage::save_contributor(env, contributor, &record);
    Ok(())
}

fn refund_currency(
    env: &Env,
    contributor: &Address,
    record: &mut Contributor,
    currency: &Address,
    include_qualified: bool,
) -> Result<i128, Error> {
    let amount = ledger::release_balance(
        env,
        contributor,
        record,
        currency,
        include_qualified,
        EntryStatus::Refunded,
    )?;
    if amount > 0 {
        token::Client::new(env, currency).transfer(
            &env.current_contract_address(),
            contributor,
            &amount,
        );
        events::emit_contribution_refunded(env, contributor.clone(), currency.clone(), amount);
    }
    Ok(amount)
}

// ── Issuer flows ─────────────────────────────────────────────────────

/// Pay the issuer every qualified or topped-up unit of `currency` not yet
/// released.
pub fn release_funds(env: &Env, currency: &Address) -> Result<i128, Error> {
    lifecycle::require_finished(env)?;
    let config = storage::load_config(env)?;

    let mut totals = storage::load_currency_ledger(env, currency);
    let owed = math::add(totals.qualified, totals.top_up)?;
    let amount = math::sub(owed, totals.released)?;
    if amount <= 0 {
        return Err(Error::NothingToRelease);
    }
    totals.released = owed;
    storage::save_currency_ledger(env, currency, &totals);

    token::Client::new(env, currency).transfer(
        &env.current_contract_address(),
        &config.issuer,
        &amount,
    );
    events::emit_funds_released(env, config.issuer, currency.clone(), amount);
    Ok(amount)
}

/// Issuer-only contribution accepted after finishing, used to cover a
/// shortfall before minting. It takes a sequence but creates no claimable
/// entry and leaves the checkpoints untouched.
pub fn top_up(env: &Env, issuer: &Address, currency: &Address, amount: i128) -> Result<u64, Error> {
    lifecycle::require_finished(env)?;
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    let config = storage::load_config(env)?;
    let bcy_value = CurrencyConverterClient::new(env, &config.converter)
        .to_base_currency(&amount, currency)
        .ok_or(Error::CurrencyNotAccepted)?;

    token::Client::new(env, currency).transfer(issuer, &env.current_contract_address(), &amount);

    let sequence = ledger::next_sequence(env)?;
    let mut totals = storage::load_currency_ledger(env, currency);
    totals.top_up = math::add(totals.top_up, amount)?;
    storage::save_currency_ledger(env, currency, &totals);
    storage::register_currency(env, currency);

    events::emit_contribution_recorded(
        env,
        issuer.clone(),
        currency.clone(),
        amount,
        bcy_value,
        sequence,
    );
    Ok(sequence)
}
