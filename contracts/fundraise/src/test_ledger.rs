extern crate std;

use std::vec::Vec;

use soroban_sdk::{testutils::Address as _, Address};

use crate::invariants::{
    assert_custody, assert_entries_match_buckets, assert_sequences_increasing,
    assert_totals_consistent,
};
use crate::test::Setup;
use crate::{EntryStatus, Error};

#[test]
fn test_sequences_start_at_one_and_increase_across_currencies() {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();

    assert_eq!(s.client.contribute(&alice, &s.usdc.address, &100), 1);
    assert_eq!(s.client.contribute(&bob, &s.eur.address, &50), 2);
    assert_eq!(s.client.contribute(&alice, &s.eur.address, &10), 3);
    assert_eq!(s.client.sequence(), 3);

    let entries: Vec<_> = s.client.contributions_of(&alice).iter().collect();
    assert_eq!(entries.len(), 2);
    assert_sequences_increasing(&entries);
}

#[test]
fn test_contribution_is_buffered_until_whitelisted() {
    let s = Setup::new();
    let alice = s.contributor();

    let seq = s.client.contribute(&alice, &s.usdc.address, &300);

    assert_eq!(s.client.buffered_balance(&alice, &s.usdc.address), 300);
    assert_eq!(s.client.qualified_balance(&alice, &s.usdc.address), 0);
    assert_eq!(s.client.qualified_total(&s.usdc.address), 0);
    assert!(!s.client.is_contribution_qualified(&seq));
    assert_eq!(s.usdc.balance(&s.client.address), 300);

    let entry = s.client.contribution(&seq).unwrap();
    assert_eq!(entry.contributor, alice);
    assert_eq!(entry.amount, 300);
    assert_eq!(entry.bcy_value, 300);
    assert_eq!(entry.status, EntryStatus::Buffered);
}

#[test]
fn test_entry_records_bcy_value_at_rate() {
    let s = Setup::new();
    let alice = s.contributor();
    let seq = s.client.contribute(&alice, &s.eur.address, &150);
    assert_eq!(s.client.contribution(&seq).unwrap().bcy_value, 300);
}

#[test]
fn test_rejects_bad_amounts_and_currencies() {
    let s = Setup::new();
    let alice = s.contributor();
    let unknown = Address::generate(&s.env);

    assert_eq!(
        s.client.try_contribute(&alice, &s.usdc.address, &0),
        Err(Ok(Error::InvalidAmount))
    );
    assert_eq!(
        s.client.try_contribute(&alice, &s.usdc.address, &-10),
        Err(Ok(Error::InvalidAmount))
    );
    assert_eq!(
        s.client.try_contribute(&alice, &unknown, &10),
        Err(Ok(Error::CurrencyNotAccepted))
    );
    // Failed calls leave no trace.
    assert_eq!(s.client.sequence(), 0);
    assert_eq!(s.client.currencies().len(), 0);
}

#[test]
fn test_whitelisting_is_retroactive_at_current_sequence() {
    let s = Setup::new();
    let alice = s.contributor();
    let usdc = s.usdc.address.clone();

    let seq = s.client.contribute(&alice, &usdc, &400);
    s.whitelist(&alice);

    assert_eq!(s.client.sequence(), seq);
    assert_eq!(
        s.client.historical_balance(&seq, &usdc),
        s.client.historical_balance(&(seq - 1), &usdc) + 400
    );
    assert_eq!(s.client.qualified_total(&usdc), 400);
    assert!(s.client.is_contribution_qualified(&seq));
    assert_entries_match_buckets(&s.client, &alice, &usdc);
}

#[test]
fn test_unwhitelist_keeps_history_and_advances_sequence() {
    let s = Setup::new();
    let alice = s.contributor();
    let usdc = s.usdc.address.clone();

    let seq = s.client.contribute(&alice, &usdc, &400);
    s.whitelist(&alice);
    s.client.unwhitelist(&s.issuer, &alice);

    assert_eq!(s.client.sequence(), seq + 1);
    assert_eq!(
        s.client.historical_balance(&seq, &usdc),
        s.client.historical_balance(&(seq - 1), &usdc) + 400
    );
    assert_eq!(s.client.historical_balance(&(seq + 1), &usdc), 0);
    assert_eq!(s.client.qualified_total(&usdc), 0);
    assert_eq!(s.client.buffered_balance(&alice, &usdc), 400);
    assert_eq!(
        s.client.contribution(&seq).unwrap().status,
        EntryStatus::Buffered
    );
    assert_entries_match_buckets(&s.client, &alice, &usdc);
}

#[test]
fn test_promotions_at_same_sequence_collapse_into_one_checkpoint() {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();
    let usdc = s.usdc.address.clone();

    let first = s.client.contribute(&alice, &usdc, &100);
    let second = s.client.contribute(&bob, &usdc, &250);
    s.whitelist(&alice);
    s.whitelist(&bob);

    assert_eq!(s.client.historical_balance(&first, &usdc), 0);
    assert_eq!(s.client.historical_balance(&second, &usdc), 350);
    assert_totals_consistent(&s.client, &[alice, bob], &usdc);
}

#[test]
fn test_history_is_tracked_per_currency() {
    let s = Setup::new();
    let alice = s.contributor();
    s.whitelist(&alice);

    let a = s.client.contribute(&alice, &s.usdc.address, &100);
    let b = s.client.contribute(&alice, &s.eur.address, &30);
    let c = s.client.contribute(&alice, &s.usdc.address, &20);

    assert_eq!(s.client.historical_balance(&a, &s.usdc.address), 100);
    assert_eq!(s.client.historical_balance(&b, &s.usdc.address), 100);
    assert_eq!(s.client.historical_balance(&c, &s.usdc.address), 120);
    assert_eq!(s.client.historical_balance(&a, &s.eur.address), 0);
    assert_eq!(s.client.historical_balance(&c, &s.eur.address), 30);
    assert_eq!(s.client.historical_balance(&1_000, &s.eur.address), 30);
}

#[test]
fn test_history_survives_many_changes() {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();
    let usdc = s.usdc.address.clone();

    // (sequence, expected total) observed after each step
    let mut observed: Vec<(u64, i128)> = Vec::new();

    s.whitelist(&alice);
    for amount in [10i128, 20, 30] {
        let seq = s.client.contribute(&alice, &usdc, &amount);
        observed.push((seq, s.client.qualified_total(&usdc)));
    }
    s.client.contribute(&bob, &usdc, &500);
    s.whitelist(&bob);
    observed.push((s.client.sequence(), s.client.qualified_total(&usdc)));
    s.client.unwhitelist(&s.issuer, &alice);
    observed.push((s.client.sequence(), s.client.qualified_total(&usdc)));

    assert_eq!(
        observed,
        std::vec![(1, 10), (2, 30), (3, 60), (4, 560), (5, 500)]
    );
    for (seq, total) in observed {
        assert_eq!(s.client.historical_balance(&seq, &usdc), total);
    }
    assert_eq!(s.client.historical_balance(&0, &usdc), 0);
    assert_totals_consistent(&s.client, &[alice, bob], &usdc);
}

#[test]
fn test_custody_matches_buckets() {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();

    s.whitelist(&alice);
    s.client.contribute(&alice, &s.usdc.address, &700);
    s.client.contribute(&bob, &s.usdc.address, &300);
    s.client.contribute(&bob, &s.eur.address, &5);

    assert_custody(&s.client, &s.usdc, &[alice.clone(), bob.clone()]);
    assert_custody(&s.client, &s.eur, &[alice, bob]);
}

#[test]
fn test_currencies_listed_in_first_use_order() {
    let s = Setup::new();
    let alice = s.contributor();
    s.client.contribute(&alice, &s.eur.address, &1);
    s.client.contribute(&alice, &s.usdc.address, &1);
    s.client.contribute(&alice, &s.eur.address, &1);

    let currencies = s.client.currencies();
    assert_eq!(currencies.len(), 2);
    assert_eq!(currencies.get(0).unwrap(), s.eur.address);
    assert_eq!(currencies.get(1).unwrap(), s.usdc.address);
}

// ── Entry statuses ───────────────────────────────────────────────────

#[test]
fn test_entry_statuses_follow_bucket_moves() {
    let s = Setup::new();
    let alice = s.contributor();
    let usdc = s.usdc.address.clone();
    s.client.allow_contribution_withdrawals(&s.issuer);

    let refunded = s.client.contribute(&alice, &usdc, &100);
    s.whitelist(&alice);
    s.client.withdraw_contribution(&alice, &usdc);

    let fast = s.client.contribute(&alice, &usdc, &40);
    s.client.unwhitelist(&s.issuer, &alice);
    let late = s.client.contribute(&alice, &usdc, &10);
    assert_eq!(s.client.contribution(&fast).unwrap().status, EntryStatus::Buffered);
    assert_eq!(s.client.contribution(&late).unwrap().status, EntryStatus::Buffered);

    s.whitelist(&alice);
    assert_eq!(s.client.contribution(&refunded).unwrap().status, EntryStatus::Refunded);
    assert!(s.client.is_contribution_qualified(&fast));
    assert!(s.client.is_contribution_qualified(&late));
    assert_eq!(s.client.qualified_balance(&alice, &usdc), 50);
    assert_entries_match_buckets(&s.client, &alice, &usdc);

    s.price_one_to_one();
    s.client.finish_fundraise(&s.issuer, &true);
    assert_eq!(s.client.claim_tokens(&alice), 50);

    let statuses: Vec<_> = s
        .client
        .contributions_of(&alice)
        .iter()
        .map(|entry| entry.status)
        .collect();
    assert_eq!(
        statuses,
        [EntryStatus::Refunded, EntryStatus::Claimed, EntryStatus::Claimed]
    );
}

fn contribute_cost(s: &Setup, who: &Address) -> u64 {
    s.client.contribute(who, &s.usdc.address, &1);
    s.env.cost_estimate().budget().cpu_instruction_cost()
}

#[test]
fn test_contribution_cost_does_not_grow_with_history() {
    let s = Setup::new();
    let alice = s.contributor();
    s.whitelist(&alice);

    for _ in 0..10 {
        s.client.contribute(&alice, &s.usdc.address, &1);
    }
    let early = contribute_cost(&s, &alice);
    for _ in 0..60 {
        s.client.contribute(&alice, &s.usdc.address, &1);
    }
    let late = contribute_cost(&s, &alice);

    assert!(
        late * 2 < early * 3,
        "cost grew from {early} to {late} instructions"
    );
    assert_eq!(s.client.contributions_of(&alice).len(), 72);
    assert_entries_match_buckets(&s.client, &alice, &s.usdc.address);
}

// ── Historical balance under random histories ────────────────────────

mod replay {
    extern crate std;

    use proptest::prelude::*;
    use soroban_sdk::Address;

    use crate::test::Setup;

    #[derive(Clone, Debug)]
    enum Step {
        Contribute { who: usize, eur: bool, amount: i128 },
        Whitelist(usize),
        Unwhitelist(usize),
        Withdraw { who: usize, eur: bool },
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => (0..3usize, any::<bool>(), 1i128..300)
                .prop_map(|(who, eur, amount)| Step::Contribute { who, eur, amount }),
            1 => (0..3usize).prop_map(Step::Whitelist),
            1 => (0..3usize).prop_map(Step::Unwhitelist),
            1 => (0..3usize, any::<bool>()).prop_map(|(who, eur)| Step::Withdraw { who, eur }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// After any history, the balance at each sequence is the total last
        /// observed at or before it.
        #[test]
        fn historical_balance_matches_observed_totals(
            steps in prop::collection::vec(step(), 1..25)
        ) {
            let s = Setup::new();
            s.client.allow_contribution_withdrawals(&s.issuer);
            let people: std::vec::Vec<Address> = (0..3).map(|_| s.contributor()).collect();
            let currencies = [s.usdc.address.clone(), s.eur.address.clone()];

            // (sequence, usdc total, eur total) after every step
            let mut observed = std::vec![(0u64, 0i128, 0i128)];
            for step in steps {
                match step {
                    Step::Contribute { who, eur, amount } => {
                        let _ = s.client.try_contribute(&people[who], &currencies[eur as usize], &amount);
                    }
                    Step::Whitelist(who) => s.whitelist(&people[who]),
                    Step::Unwhitelist(who) => s.client.unwhitelist(&s.issuer, &people[who]),
                    Step::Withdraw { who, eur } => {
                        let _ = s.client.try_withdraw_contribution(&people[who], &currencies[eur as usize]);
                    }
                }
                observed.push((
                    s.client.sequence(),
                    s.client.qualified_total(&currencies[0]),
                    s.client.qualified_total(&currencies[1]),
                ));
            }

            for query in 0..=s.client.sequence() + 1 {
                let (_, usdc, eur) = observed
                    .iter()
                    .rev()
                    .find(|(sequence, _, _)| *sequence <= query)
                    .copied()
                    .unwrap_or((0, 0, 0));
                prop_assert_eq!(s.client.historical_balance(&query, &currencies[0]), usdc);
                prop_assert_eq!(s.client.historical_balance(&query, &currencies[1]), eur);
            }
        }
    }
}
