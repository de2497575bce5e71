//! # Fundraise State Machine
//!
//! Owns the stored lifecycle (`Ongoing → Finished | Canceled`), the derived
//! `Expired` predicate, and the issuer-side pricing setters.
//!
//! Expiry is never written. Every mutating entry point calls one of the
//! `require_*` gates, which evaluate it fresh against the ledger clock, so a
//! raise that slipped past its deadline is observed on the very next call.

use soroban_sdk::{Address, Env};

use crate::events;
use crate::interfaces::CurrencyConverterClient;
use crate::math;
use crate::storage;
use crate::types::{FundraiseConfig, FundraiseSettings, FundraiseState, Pricing};
use crate::Error;

/// Sum of every currency's qualified total valued at current rates, plus the
/// presale amount.
///
/// A currency the converter no longer accepts is counted at the BCY value
/// recorded when it was contributed.
pub fn raised_bcy(env: &Env) -> Result<i128, Error> {
    let config = storage::load_config(env)?;
    let settings = storage::load_settings(env)?;
    let converter = CurrencyConverterClient::new(env, &config.converter);

    let mut total = settings.pricing.presale_amount;
    for currency in storage::load_currencies(env).iter() {
        let totals = storage::load_currency_ledger(env, &currency);
        if totals.qualified == 0 {
            continue;
        }
        let value = converter
            .to_base_currency(&totals.qualified, &currency)
            .unwrap_or(totals.qualified_bcy);
        total = math::add(total, value)?;
    }
    Ok(total)
}

pub fn soft_cap_reached(env: &Env) -> Result<bool, Error> {
    let config = storage::load_config(env)?;
    Ok(raised_bcy(env)? >= config.soft_cap)
}

/// `true` while stored `Ongoing`, past `end_date + expiry_period`, and
/// short of the soft cap.
pub fn is_expired(env: &Env) -> Result<bool, Error> {
    let config = storage::load_config(env)?;
    let settings = storage::load_settings(env)?;
    expired(env, &config, &settings)
}

fn expired(env: &Env, config: &FundraiseConfig, settings: &FundraiseSettings) -> Result<bool, Error> {
    if settings.status != FundraiseState::Ongoing {
        return Ok(false);
    }
    let deadline = config.end_date.saturating_add(config.expiry_period);
    if env.ledger().timestamp() <= deadline {
        return Ok(false);
    }
    Ok(!soft_cap_reached(env)?)
}

/// Stored state, with `Ongoing` reported as `Expired` when it has lapsed.
pub fn current_state(env: &Env) -> Result<FundraiseState, Error> {
    let config = storage::load_config(env)?;
    let settings = storage::load_settings(env)?;
    if expired(env, &config, &settings)? {
        return Ok(FundraiseState::Expired);
    }
    Ok(settings.status)
}

/// Fail unless the fundraise is `Ongoing` and not expired.
pub fn require_ongoing(env: &Env) -> Result<(), Error> {
    match current_state(env)? {
        FundraiseState::Ongoing => Ok(()),
        FundraiseState::Finished => Err(Error::FundraiseFinished),
        FundraiseState::Canceled => Err(Error::FundraiseCanceled),
        FundraiseState::Expired => Err(Error::FundraiseExpired),
    }
}

/// [`require_ongoing`] plus the contribution window.
pub fn require_accepting_contributions(env: &Env) -> Result<(), Error> {
    require_ongoing(env)?;
    let config = storage::load_config(env)?;
    let now = env.ledger().timestamp();
    if now < config.start_date {
        return Err(Error::NotStarted);
    }
    if now > config.end_date {
        return Err(Error::ContributionPeriodOver);
    }
    Ok(())
}

/// Fail unless the fundraise has been finished.
pub fn require_finished(env: &Env) -> Result<(), Error> {
    match current_state(env)? {
        FundraiseState::Finished => Ok(()),
        FundraiseState::Canceled => Err(Error::FundraiseCanceled),
        FundraiseState::Expired => Err(Error::FundraiseExpired),
        FundraiseState::Ongoing => Err(Error::FundraiseNotFinished),
    }
}

pub fn finish(env: &Env, force: bool) -> Result<(), Error> {
    require_ongoing(env)?;
    let mut settings = storage::load_settings(env)?;
    if total_tokens(env, &settings.pricing)?.is_none() {
        return Err(Error::PricingNotSet);
    }
    if !force && !soft_cap_reached(env)? {
        return Err(Error::SoftCapNotReached);
    }
    transition(env, &mut settings, FundraiseState::Finished);
    Ok(())
}

pub fn cancel(env: &Env) -> Result<(), Error> {
    require_ongoing(env)?;
    let mut settings = storage::load_settings(env)?;
    transition(env, &mut settings, FundraiseState::Canceled);
    Ok(())
}

fn transition(env: &Env, settings: &mut FundraiseSettings, to: FundraiseState) {
    let from = settings.status;
    settings.status = to;
    storage::save_settings(env, settings);
    events::emit_state_transitioned(env, from, to);
}

// ── Pricing ──────────────────────────────────────────────────────────

/// Total token supply for the sale, if pricing has been set.
///
/// Derived from the token price as `hard_cap / price` when only the price
/// is known.
pub fn total_tokens(env: &Env, pricing: &Pricing) -> Result<Option<i128>, Error> {
    if let Some(total) = pricing.total_tokens {
        return Ok(Some(total));
    }
    match pricing.token_price {
        Some(price) => {
            let hard_cap = storage::load_config(env)?.hard_cap;
            Ok(Some(math::mul_div_floor(env, hard_cap, 1, price)?))
        }
        None => Ok(None),
    }
}

pub fn set_token_price(env: &Env, price: i128) -> Result<(), Error> {
    require_ongoing(env)?;
    if price <= 0 {
        return Err(Error::InvalidAmount);
    }
    let mut settings = storage::load_settings(env)?;
    if settings.pricing.total_tokens.is_some() {
        return Err(Error::TokenAmountAlreadySet);
    }
    if settings.pricing.token_price.is_some() {
        return Err(Error::TokenPriceAlreadySet);
    }
    settings.pricing.token_price = Some(price);
    if total_tokens(env, &settings.pricing)? == Some(0) {
        return Err(Error::InvalidAmount);
    }
    check_presale_fits(env, &settings.pricing)?;
    storage::save_settings(env, &settings);
    Ok(())
}

pub fn set_total_token_amount(env: &Env, amount: i128) -> Result<(), Error> {
    require_ongoing(env)?;
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    let mut settings = storage::load_settings(env)?;
    if settings.pricing.token_price.is_some() {
        return Err(Error::TokenPriceAlreadySet);
    }
    if settings.pricing.total_tokens.is_some() {
        return Err(Error::TokenAmountAlreadySet);
    }
    settings.pricing.total_tokens = Some(amount);
    check_presale_fits(env, &settings.pricing)?;
    storage::save_settings(env, &settings);
    Ok(())
}

/// Reserve `amount` BCY of the hard cap and `tokens` of the supply for the
/// presale.
pub fn set_presale(env: &Env, amount: i128, tokens: i128) -> Result<(), Error> {
    require_ongoing(env)?;
    if amount < 0 || tokens < 0 {
        return Err(Error::InvalidAmount);
    }
    let mut settings = storage::load_settings(env)?;
    settings.pricing.presale_amount = amount;
    settings.pricing.presale_tokens = tokens;
    check_presale_fits(env, &settings.pricing)?;

    let committed = math::add(storage::load_counters(env).qualified_bcy, amount)?;
    if committed > storage::load_config(env)?.hard_cap {
        return Err(Error::HardCapExceeded);
    }
    storage::save_settings(env, &settings);
    Ok(())
}

fn check_presale_fits(env: &Env, pricing: &Pricing) -> Result<(), Error> {
    if pricing.presale_amount > storage::load_config(env)?.hard_cap {
        return Err(Error::PresaleExceedsHardCap);
    }
    if let Some(total) = total_tokens(env, pricing)? {
        if pricing.presale_tokens > total {
            return Err(Error::PresaleExceedsTokenAmount);
        }
    }
    Ok(())
}

pub fn set_rules(env: &Env, rules: &Address) -> Result<(), Error> {
    require_ongoing(env)?;
    let mut settings = storage::load_settings(env)?;
    settings.rules = rules.clone();
    storage::save_settings(env, &settings);
    Ok(())
}

pub fn allow_withdrawals(env: &Env) -> Result<(), Error> {
    require_ongoing(env)?;
    let mut settings = storage::load_settings(env)?;
    settings.withdrawals_allowed = true;
    storage::save_settings(env, &settings);
    Ok(())
}
