//! Historical checkpoints of per-currency qualified balances.
//!
//! Each currency owns an append-only list of `(sequence, balance)` pairs,
//! strictly increasing in `sequence`. Balances are not monotonic: demotions
//! and refunds append lower values.

use soroban_sdk::{Address, Env};

use crate::storage;
use crate::types::{Checkpoint, CurrencyLedger};

/// Index of the last checkpoint whose sequence is `<= target`.
///
/// `sequence_at(i)` must be strictly increasing over `0..len`. Runs in
/// O(log len) probes.
pub fn find_at_or_before<F>(len: u32, target: u64, sequence_at: F) -> Option<u32>
where
    F: Fn(u32) -> u64,
{
    let (mut lo, mut hi) = (0u32, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if sequence_at(mid) <= target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo.checked_sub(1)
}

/// Record that `currency`'s qualified total is `balance` as of `sequence`.
///
/// A second write at the same sequence replaces the previous value, which
/// keeps sequences strictly increasing when several promotions land between
/// two contributions. Updates `ledger` in place; the caller saves it.
pub(crate) fn append(
    env: &Env,
    currency: &Address,
    ledger: &mut CurrencyLedger,
    sequence: u64,
    balance: i128,
) {
    ledger.qualified = balance;
    let checkpoint = Checkpoint { sequence, balance };

    if let Some(last_index) = ledger.checkpoints.checked_sub(1) {
        if let Some(last) = storage::load_checkpoint(env, currency, last_index) {
            if last.sequence == sequence {
                storage::save_checkpoint(env, currency, last_index, &checkpoint);
                return;
            }
        }
    }

    storage::save_checkpoint(env, currency, ledger.checkpoints, &checkpoint);
    ledger.checkpoints += 1;
}

/// Qualified total of `currency` in effect at `sequence`; 0 before the first
/// checkpoint.
pub(crate) fn balance_at(env: &Env, currency: &Address, sequence: u64) -> i128 {
    let len = storage::load_currency_ledger(env, currency).checkpoints;
    // Indices below `len` are always written.
    let found = find_at_or_before(len, sequence, |i| {
        storage::load_checkpoint(env, currency, i)
            .map(|c| c.sequence)
            .unwrap_or(u64::MAX)
    });
    found
        .and_then(|i| storage::load_checkpoint(env, currency, i))
        .map(|c| c.balance)
        .unwrap_or(0)
}
