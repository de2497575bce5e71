//! # Storage
//!
//! Typed helpers over Soroban's two storage tiers.
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key          | Type                | Description                          |
//! |--------------|---------------------|--------------------------------------|
//! | `Config`     | `FundraiseConfig`   | Immutable configuration              |
//! | `Settings`   | `FundraiseSettings` | Status, rules, withdrawals, pricing  |
//! | `Counters`   | `LedgerCounters`    | Sequence, contributor count, totals  |
//! | `Currencies` | `Vec<Address>`      | Every currency ever contributed      |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                         | Type             | Description                  |
//! |-----------------------------|------------------|------------------------------|
//! | `Entry(seq)`                | `EntryRecord`    | One recorded contribution    |
//! | `Contributor(addr)`         | `Contributor`    | Whitelist flag, totals       |
//! | `ContributorEntry(addr, i)` | `u64`            | Sequence of the i-th entry   |
//! | `Balance(addr, currency)`   | `Balance`        | Buffered / qualified buckets |
//! | `EntryLog(addr, currency)`  | `EntryLog`       | Entry statuses, run-length   |
//! | `Currency(currency)`        | `CurrencyLedger` | Per-currency totals          |
//! | `Checkpoint(currency, i)`   | `Checkpoint`     | i-th historical checkpoint   |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.
//!
//! Checkpoints and per-contributor entry indices live one per entry, so no
//! hot-path read grows with the length of a history.

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::types::{
    Balance, Checkpoint, Contributor, CurrencyLedger, EntryLog, EntryRecord, FundraiseConfig,
    FundraiseSettings, LedgerCounters,
};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

/// Instance storage: bump by 7 days when below 1 day remaining.
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

/// Persistent storage: bump by 30 days when below 7 days remaining.
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Config,
    Settings,
    Counters,
    Currencies,
    Entry(u64),
    Contributor(Address),
    ContributorEntry(Address, u32),
    Balance(Address, Address),
    EntryLog(Address, Address),
    Currency(Address),
    Checkpoint(Address, u32),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn save_config(env: &Env, config: &FundraiseConfig) {
    env.storage().instance().set(&DataKey::Config, config);
    bump_instance(env);
}

pub fn load_config(env: &Env) -> Result<FundraiseConfig, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

pub fn save_settings(env: &Env, settings: &FundraiseSettings) {
    env.storage().instance().set(&DataKey::Settings, settings);
    bump_instance(env);
}

pub fn load_settings(env: &Env) -> Result<FundraiseSettings, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Settings)
        .ok_or(Error::NotInitialized)
}

pub fn load_counters(env: &Env) -> LedgerCounters {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Counters)
        .unwrap_or_default()
}

pub fn save_counters(env: &Env, counters: &LedgerCounters) {
    env.storage().instance().set(&DataKey::Counters, counters);
}

pub fn load_currencies(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&DataKey::Currencies)
        .unwrap_or_else(|| Vec::new(env))
}

/// Add `currency` to the fundraise-wide currency list if it is new.
pub fn register_currency(env: &Env, currency: &Address) {
    let mut currencies = load_currencies(env);
    if !currencies.contains(currency) {
        currencies.push_back(currency.clone());
        env.storage()
            .instance()
            .set(&DataKey::Currencies, &currencies);
    }
}

// ── Persistent Storage Helpers ───────────────────────────────────────

fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

fn load_persistent<T>(env: &Env, key: &DataKey) -> Option<T>
where
    T: soroban_sdk::TryFromVal<Env, soroban_sdk::Val>,
{
    let value: Option<T> = env.storage().persistent().get(key);
    if value.is_some() {
        bump_persistent(env, key);
    }
    value
}

fn save_persistent<T>(env: &Env, key: &DataKey, value: &T)
where
    T: soroban_sdk::IntoVal<Env, soroban_sdk::Val>,
{
    env.storage().persistent().set(key, value);
    bump_persistent(env, key);
}

pub fn load_entry(env: &Env, sequence: u64) -> Option<EntryRecord> {
    load_persistent(env, &DataKey::Entry(sequence))
}

pub fn save_entry(env: &Env, entry: &EntryRecord) {
    save_persistent(env, &DataKey::Entry(entry.sequence), entry);
}

pub fn load_contributor_entry(env: &Env, contributor: &Address, index: u32) -> Option<u64> {
    load_persistent(env, &DataKey::ContributorEntry(contributor.clone(), index))
}

pub fn save_contributor_entry(env: &Env, contributor: &Address, index: u32, sequence: u64) {
    save_persistent(
        env,
        &DataKey::ContributorEntry(contributor.clone(), index),
        &sequence,
    );
}

pub fn load_entry_log(env: &Env, contributor: &Address, currency: &Address) -> EntryLog {
    load_persistent(env, &DataKey::EntryLog(contributor.clone(), currency.clone()))
        .unwrap_or_else(|| EntryLog::new(env))
}

pub fn save_entry_log(env: &Env, contributor: &Address, currency: &Address, log: &EntryLog) {
    save_persistent(
        env,
        &DataKey::EntryLog(contributor.clone(), currency.clone()),
        log,
    );
}

/// Load a contributor record, or a fresh one if the address is unknown.
pub fn load_contributor(env: &Env, contributor: &Address) -> Contributor {
    load_persistent(env, &DataKey::Contributor(contributor.clone()))
        .unwrap_or_else(|| Contributor::new(env))
}

pub fn save_contributor(env: &Env, contributor: &Address, record: &Contributor) {
    save_persistent(env, &DataKey::Contributor(contributor.clone()), record);
}

pub fn load_balance(env: &Env, contributor: &Address, currency: &Address) -> Balance {
    load_persistent(env, &DataKey::Balance(contributor.clone(), currency.clone()))
        .unwrap_or_default()
}

pub fn save_balance(env: &Env, contributor: &Address, currency: &Address, balance: &Balance) {
    save_persistent(
        env,
        &DataKey::Balance(contributor.clone(), currency.clone()),
        balance,
    );
}

pub fn load_currency_ledger(env: &Env, currency: &Address) -> CurrencyLedger {
    load_persistent(env, &DataKey::Currency(currency.clone())).unwrap_or_default()
}

pub fn save_currency_ledger(env: &Env, currency: &Address, ledger: &CurrencyLedger) {
    save_persistent(env, &DataKey::Currency(currency.clone()), ledger);
}

pub fn load_checkpoint(env: &Env, currency: &Address, index: u32) -> Option<Checkpoint> {
    load_persistent(env, &DataKey::Checkpoint(currency.clone(), index))
}

pub fn save_checkpoint(env: &Env, currency: &Address, index: u32, checkpoint: &Checkpoint) {
    save_persistent(env, &DataKey::Checkpoint(currency.clone(), index), checkpoint);
}
