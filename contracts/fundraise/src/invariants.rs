#![allow(dead_code)]

extern crate std;

use soroban_sdk::{token, Address};

use crate::types::{EntryStatus, FundraiseState};
use crate::{ContributionEntry, FundraiseClient};

/// Sum of every contributor's qualified balance equals the currency's
/// qualified total, which equals the latest checkpoint.
pub fn assert_totals_consistent(client: &FundraiseClient, contributors: &[Address], currency: &Address) {
    let sum: i128 = contributors
        .iter()
        .map(|c| client.qualified_balance(c, currency))
        .sum();
    let total = client.qualified_total(currency);
    assert_eq!(
        sum, total,
        "qualified balances ({}) do not add up to the currency total ({})",
        sum, total
    );
    assert_eq!(
        client.historical_balance(&client.sequence(), currency),
        total,
        "latest checkpoint disagrees with the currency total"
    );
}

/// Before any payout, the contract holds exactly the buffered plus
/// qualified amounts of `currency`.
pub fn assert_custody(
    client: &FundraiseClient,
    currency: &token::Client,
    contributors: &[Address],
) {
    let owed: i128 = contributors
        .iter()
        .map(|c| {
            client.buffered_balance(c, &currency.address)
                + client.qualified_balance(c, &currency.address)
        })
        .sum();
    assert_eq!(currency.balance(&client.address), owed);
}

/// A contributor's buckets equal the amounts of their entries in the
/// matching status.
pub fn assert_entries_match_buckets(client: &FundraiseClient, contributor: &Address, currency: &Address) {
    let mut buffered = 0i128;
    let mut qualified = 0i128;
    for entry in client.contributions_of(contributor).iter() {
        if entry.currency != *currency {
            continue;
        }
        match entry.status {
            EntryStatus::Buffered => buffered += entry.amount,
            EntryStatus::Qualified => qualified += entry.amount,
            _ => {}
        }
    }
    assert_eq!(client.buffered_balance(contributor, currency), buffered);
    assert_eq!(client.qualified_balance(contributor, currency), qualified);
}

/// Entry sequences are strictly increasing.
pub fn assert_sequences_increasing(entries: &[ContributionEntry]) {
    for pair in entries.windows(2) {
        assert!(
            pair[0].sequence < pair[1].sequence,
            "sequence {} is not below {}",
            pair[0].sequence,
            pair[1].sequence
        );
    }
}

/// Stored transitions only leave `Ongoing`.
pub fn assert_valid_transition(from: &FundraiseState, to: &FundraiseState) {
    let valid = matches!(
        (from, to),
        (FundraiseState::Ongoing, FundraiseState::Finished)
            | (FundraiseState::Ongoing, FundraiseState::Canceled)
    );
    assert!(valid, "invalid state transition {:?} -> {:?}", from, to);
}
