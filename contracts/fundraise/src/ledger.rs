//! # Contribution Ledger
//!
//! Records every accepted contribution under a global sequence number and
//! keeps three views of it consistent:
//!
//! - the per-entry status, kept run-length in an [`EntryLog`] per
//!   `(contributor, currency)`,
//! - the per-`(contributor, currency)` two-bucket [`Balance`],
//! - the per-currency qualified total and its checkpoint history.
//!
//! Every operation touches a fixed number of storage entries no matter how
//! many contributions a contributor has made.
//!
//! The sequence counter is shared by all currencies. It advances once per
//! recorded contribution and once per reduction of a qualified total
//! (demotion, refund). It never rewinds, so a reversal always lands at a
//! later sequence than the qualification it undoes.
//!
//! Functions taking `record: &mut Contributor` update it in place; the
//! caller saves it once at the end of the operation.

use soroban_sdk::{Address, Env, Vec};

use crate::checkpoint;
use crate::events;
use crate::math;
use crate::storage;
use crate::types::{Balance, ContributionEntry, Contributor, EntryLog, EntryRecord, EntryStatus};
use crate::Error;

/// Value moved between buckets by a single promotion or reduction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Moved {
    pub amount: i128,
    pub bcy: i128,
}

pub fn current_sequence(env: &Env) -> u64 {
    storage::load_counters(env).sequence
}

/// Advance the global counter and return the new sequence.
pub fn next_sequence(env: &Env) -> Result<u64, Error> {
    let mut counters = storage::load_counters(env);
    counters.sequence = counters.sequence.checked_add(1).ok_or(Error::Overflow)?;
    storage::save_counters(env, &counters);
    Ok(counters.sequence)
}

/// Store a new buffered entry and return its sequence.
pub fn record_contribution(
    env: &Env,
    contributor: &Address,
    record: &mut Contributor,
    currency: &Address,
    amount: i128,
    bcy_value: i128,
) -> Result<u64, Error> {
    let sequence = next_sequence(env)?;

    let mut log = storage::load_entry_log(env, contributor, currency);
    let position = log.push_buffered();
    storage::save_entry_log(env, contributor, currency, &log);
    storage::save_entry(
        env,
        &EntryRecord {
            contributor: contributor.clone(),
            currency: currency.clone(),
            amount,
            bcy_value,
            sequence,
            position,
        },
    );

    storage::save_contributor_entry(env, contributor, record.entry_count, sequence);
    record.entry_count = record.entry_count.checked_add(1).ok_or(Error::Overflow)?;
    if !record.currencies.contains(currency) {
        record.currencies.push_back(currency.clone());
    }
    storage::register_currency(env, currency);

    let mut balance = storage::load_balance(env, contributor, currency);
    balance.buffered = math::add(balance.buffered, amount)?;
    balance.buffered_bcy = math::add(balance.buffered_bcy, bcy_value)?;
    storage::save_balance(env, contributor, currency, &balance);

    events::emit_contribution_recorded(
        env,
        contributor.clone(),
        currency.clone(),
        amount,
        bcy_value,
        sequence,
    );
    Ok(sequence)
}

/// Move the whole buffered bucket of `(contributor, currency)` into the
/// qualified bucket and checkpoint the currency total at `sequence`.
///
/// Rules must already have passed; this only does the bookkeeping.
pub fn promote_to_qualified(
    env: &Env,
    contributor: &Address,
    record: &mut Contributor,
    currency: &Address,
    sequence: u64,
) -> Result<Moved, Error> {
    let mut balance = storage::load_balance(env, contributor, currency);
    let moved = Moved {
        amount: balance.buffered,
        bcy: balance.buffered_bcy,
    };
    if moved.amount == 0 {
        return Ok(moved);
    }

    balance.qualified = math::add(balance.qualified, moved.amount)?;
    balance.qualified_bcy = math::add(balance.qualified_bcy, moved.bcy)?;
    balance.buffered = 0;
    balance.buffered_bcy = 0;
    storage::save_balance(env, contributor, currency, &balance);

    set_status(env, contributor, currency, EntryStatus::Buffered, EntryStatus::Qualified);
    record.qualified_bcy = math::add(record.qualified_bcy, moved.bcy)?;

    let mut counters = storage::load_counters(env);
    counters.qualified_bcy = math::add(counters.qualified_bcy, moved.bcy)?;
    storage::save_counters(env, &counters);

    let mut ledger = storage::load_currency_ledger(env, currency);
    ledger.qualified_bcy = math::add(ledger.qualified_bcy, moved.bcy)?;
    let total = math::add(ledger.qualified, moved.amount)?;
    checkpoint::append(env, currency, &mut ledger, sequence, total);
    storage::save_currency_ledger(env, currency, &ledger);

    events::emit_contribution_qualified(
        env,
        contributor.clone(),
        currency.clone(),
        moved.amount,
        sequence,
    );
    Ok(moved)
}

/// Move the qualified bucket back to buffered. The currency total drops at a
/// fresh sequence.
pub fn demote_from_qualified(
    env: &Env,
    contributor: &Address,
    record: &mut Contributor,
    currency: &Address,
) -> Result<Moved, Error> {
    let mut balance = storage::load_balance(env, contributor, currency);
    if balance.qualified == 0 {
        return Ok(Moved::default());
    }

    let (moved, sequence) = take_qualified(env, record, currency, &mut balance)?;
    balance.buffered = math::add(balance.buffered, moved.amount)?;
    balance.buffered_bcy = math::add(balance.buffered_bcy, moved.bcy)?;
    storage::save_balance(env, contributor, currency, &balance);

    set_status(env, contributor, currency, EntryStatus::Qualified, EntryStatus::Buffered);

    events::emit_contribution_demoted(
        env,
        contributor.clone(),
        currency.clone(),
        moved.amount,
        sequence,
    );
    Ok(moved)
}

/// Zero the buffered bucket (and the qualified one when `include_qualified`)
/// and mark the affected entries `to`. Returns the raw amount released; the
/// caller transfers it.
pub fn release_balance(
    env: &Env,
    contributor: &Address,
    record: &mut Contributor,
    currency: &Address,
    include_qualified: bool,
    to: EntryStatus,
) -> Result<i128, Error> {
    let mut balance = storage::load_balance(env, contributor, currency);
    let mut released = balance.buffered;

    if balance.buffered > 0 {
        set_status(env, contributor, currency, EntryStatus::Buffered, to);
        balance.buffered = 0;
        balance.buffered_bcy = 0;
    }

    if include_qualified && balance.qualified > 0 {
        let (moved, _) = take_qualified(env, record, currency, &mut balance)?;
        set_status(env, contributor, currency, EntryStatus::Qualified, to);
        released = math::add(released, moved.amount)?;
    }

    storage::save_balance(env, contributor, currency, &balance);
    Ok(released)
}

/// Mark every qualified entry of the contributor as claimed.
pub fn mark_claimed(env: &Env, contributor: &Address, record: &Contributor) {
    for currency in record.currencies.iter() {
        set_status(env, contributor, &currency, EntryStatus::Qualified, EntryStatus::Claimed);
    }
}

/// The entry recorded at `sequence`, with its current status.
pub fn entry(env: &Env, sequence: u64) -> Option<ContributionEntry> {
    let stored = storage::load_entry(env, sequence)?;
    let log = storage::load_entry_log(env, &stored.contributor, &stored.currency);
    Some(view(&log, stored))
}

/// Every entry of `contributor`, in sequence order.
pub fn entries_of(env: &Env, contributor: &Address) -> Vec<ContributionEntry> {
    let record = storage::load_contributor(env, contributor);
    let mut entries = Vec::new(env);
    for index in 0..record.entry_count {
        if let Some(found) = storage::load_contributor_entry(env, contributor, index)
            .and_then(|sequence| entry(env, sequence))
        {
            entries.push_back(found);
        }
    }
    entries
}

pub fn qualified_balance(env: &Env, contributor: &Address, currency: &Address) -> i128 {
    storage::load_balance(env, contributor, currency).qualified
}

pub fn buffered_balance(env: &Env, contributor: &Address, currency: &Address) -> i128 {
    storage::load_balance(env, contributor, currency).buffered
}

pub fn qualified_total(env: &Env, currency: &Address) -> i128 {
    storage::load_currency_ledger(env, currency).qualified
}

pub fn historical_balance(env: &Env, sequence: u64, currency: &Address) -> i128 {
    checkpoint::balance_at(env, currency, sequence)
}

/// Empty the qualified bucket of `balance`, shrink every total it fed, and
/// checkpoint the lower currency total at a new sequence.
fn take_qualified(
    env: &Env,
    record: &mut Contributor,
    currency: &Address,
    balance: &mut Balance,
) -> Result<(Moved, u64), Error> {
    let moved = Moved {
        amount: balance.qualified,
        bcy: balance.qualified_bcy,
    };
    balance.qualified = 0;
    balance.qualified_bcy = 0;

    record.qualified_bcy = math::sub(record.qualified_bcy, moved.bcy)?;

    let sequence = next_sequence(env)?;
    let mut counters = storage::load_counters(env);
    counters.qualified_bcy = math::sub(counters.qualified_bcy, moved.bcy)?;
    storage::save_counters(env, &counters);

    let mut ledger = storage::load_currency_ledger(env, currency);
    ledger.qualified_bcy = math::sub(ledger.qualified_bcy, moved.bcy)?;
    let total = math::sub(ledger.qualified, moved.amount)?;
    checkpoint::append(env, currency, &mut ledger, sequence, total);
    storage::save_currency_ledger(env, currency, &ledger);

    Ok((moved, sequence))
}

fn set_status(
    env: &Env,
    contributor: &Address,
    currency: &Address,
    from: EntryStatus,
    to: EntryStatus,
) {
    let mut log = storage::load_entry_log(env, contributor, currency);
    log.relabel(env, from, to);
    storage::save_entry_log(env, contributor, currency, &log);
}

fn view(log: &EntryLog, stored: EntryRecord) -> ContributionEntry {
    // Positions below `count` always fall inside a run.
    let status = log.status_of(stored.position).unwrap_or(EntryStatus::Buffered);
    ContributionEntry {
        contributor: stored.contributor,
        currency: stored.currency,
        amount: stored.amount,
        bcy_value: stored.bcy_value,
        sequence: stored.sequence,
        status,
    }
}
