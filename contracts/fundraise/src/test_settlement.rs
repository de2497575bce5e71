extern crate std;

use soroban_sdk::{token, Address};

use crate::invariants::assert_totals_consistent;
use crate::test::{Setup, END, EXPIRY, HARD_CAP, SUPPLY, WALLET};
use crate::{EntryStatus, Error, FundraiseState};

/// Alice qualifies 600 BCY, Bob 400, Carol leaves 50 buffered; finished at
/// one token per BCY.
fn finished() -> (Setup, Address, Address, Address) {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();
    let carol = s.contributor();
    s.price_one_to_one();

    s.whitelist(&alice);
    s.whitelist(&bob);
    s.client.contribute(&alice, &s.usdc.address, &600);
    s.client.contribute(&bob, &s.eur.address, &200);
    s.client.contribute(&carol, &s.usdc.address, &50);
    s.finish();
    (s, alice, bob, carol)
}

// ── Claims ───────────────────────────────────────────────────────────

#[test]
fn test_claim_transfers_allocation_once() {
    let (s, alice, bob, _) = finished();

    assert_eq!(s.client.token_allocation(&alice), 600);
    assert_eq!(s.client.claim_tokens(&alice), 600);
    assert_eq!(s.client.claim_tokens(&bob), 400);
    assert_eq!(s.security.balance(&alice), 600);
    assert_eq!(s.security.balance(&bob), 400);
    assert_eq!(s.security.balance(&s.client.address), SUPPLY - 1_000);

    assert!(s.client.has_claimed(&alice));
    assert_eq!(
        s.client.try_claim_tokens(&alice),
        Err(Ok(Error::AlreadyClaimed))
    );
}

#[test]
fn test_claim_marks_entries_claimed() {
    let (s, alice, _, _) = finished();
    let seq = s.client.contributions_of(&alice).get(0).unwrap().sequence;
    s.client.claim_tokens(&alice);
    assert_eq!(
        s.client.contribution(&seq).unwrap().status,
        EntryStatus::Claimed
    );
}

#[test]
fn test_claim_requires_qualified_value() {
    let (s, _, _, carol) = finished();
    assert_eq!(
        s.client.try_claim_tokens(&carol),
        Err(Ok(Error::NothingToClaim))
    );
}

#[test]
fn test_claim_requires_finished() {
    let s = Setup::new();
    let alice = s.contributor();
    s.price_one_to_one();
    s.whitelist(&alice);
    s.client.contribute(&alice, &s.usdc.address, &600);

    assert_eq!(
        s.client.try_claim_tokens(&alice),
        Err(Ok(Error::FundraiseNotFinished))
    );
    s.client.cancel_fundraise(&s.issuer);
    assert_eq!(
        s.client.try_claim_tokens(&alice),
        Err(Ok(Error::FundraiseCanceled))
    );
}

#[test]
fn test_claim_rechecks_current_rules() {
    let (s, alice, bob, _) = finished();
    s.rules.set_min_amount(&500);

    assert_eq!(
        s.client.try_claim_tokens(&bob),
        Err(Ok(Error::BelowMinAmount))
    );
    assert_eq!(s.client.claim_tokens(&alice), 600);
}

#[test]
fn test_allocation_excludes_presale_and_floors() {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();
    s.price_one_to_one();
    // 8_000 BCY of public cap buys 4_000 tokens
    s.client.set_presale(&s.issuer, &2_000, &6_000);

    s.whitelist(&alice);
    s.whitelist(&bob);
    s.client.contribute(&alice, &s.usdc.address, &333);
    s.client.contribute(&bob, &s.usdc.address, &1_000);
    s.finish();

    assert_eq!(s.client.token_allocation(&alice), 166);
    assert_eq!(s.client.claim_tokens(&alice), 166);
    assert_eq!(s.client.claim_tokens(&bob), 500);
}

#[test]
fn test_allocation_from_token_price() {
    let s = Setup::new();
    let alice = s.contributor();
    s.client.set_token_price_bcy(&s.issuer, &4);
    s.whitelist(&alice);
    s.client.contribute(&alice, &s.usdc.address, &1_000);
    s.finish();

    // 2_500 tokens for a 10_000 BCY cap
    assert_eq!(s.client.claim_tokens(&alice), 250);
}

#[test]
fn test_floor_division_never_exceeds_supply() {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();
    let carol = s.contributor();
    s.client.set_total_token_amount(&s.issuer, &7);

    s.whitelist(&alice);
    s.whitelist(&bob);
    s.whitelist(&carol);
    s.client.contribute(&alice, &s.usdc.address, &(HARD_CAP / 3));
    s.client.contribute(&bob, &s.usdc.address, &(HARD_CAP / 3));
    s.client.contribute(&carol, &s.usdc.address, &(HARD_CAP - 2 * (HARD_CAP / 3)));
    s.finish();

    let total = s.client.claim_tokens(&alice)
        + s.client.claim_tokens(&bob)
        + s.client.claim_tokens(&carol);
    // 2 + 2 + 2; one token stays undistributed
    assert_eq!(total, 6);
}

// ── Refunds ──────────────────────────────────────────────────────────

#[test]
fn test_refunds_closed_while_ongoing_by_default() {
    let s = Setup::new();
    let alice = s.contributor();
    s.client.contribute(&alice, &s.usdc.address, &100);
    assert_eq!(
        s.client.try_withdraw_contribution(&alice, &s.usdc.address),
        Err(Ok(Error::WithdrawalsNotAllowed))
    );
    assert_eq!(
        s.client.try_withdraw_all_contributions(&alice),
        Err(Ok(Error::WithdrawalsNotAllowed))
    );
}

#[test]
fn test_withdrawals_allowed_while_ongoing() {
    let s = Setup::new();
    let alice = s.contributor();
    s.client.allow_contribution_withdrawals(&s.issuer);
    s.whitelist(&alice);
    let seq = s.client.contribute(&alice, &s.usdc.address, &100);

    assert_eq!(s.client.withdraw_contribution(&alice, &s.usdc.address), 100);
    assert_eq!(s.usdc.balance(&alice), WALLET);
    assert_eq!(s.client.qualified_total(&s.usdc.address), 0);
    assert_eq!(s.client.sequence(), seq + 1);
    assert_eq!(s.client.historical_balance(&seq, &s.usdc.address), 100);
    assert_eq!(
        s.client.contribution(&seq).unwrap().status,
        EntryStatus::Refunded
    );
    assert_eq!(
        s.client.try_withdraw_contribution(&alice, &s.usdc.address),
        Err(Ok(Error::NothingToRefund))
    );
}

#[test]
fn test_cancel_refunds_everything() {
    let s = Setup::new();
    let alice = s.contributor();
    let bob = s.contributor();
    s.whitelist(&alice);
    s.client.contribute(&alice, &s.usdc.address, &300);
    s.client.contribute(&alice, &s.eur.address, &25);
    s.client.contribute(&bob, &s.usdc.address, &70);
    s.client.cancel_fundraise(&s.issuer);

    s.client.withdraw_all_contributions(&alice);
    s.client.withdraw_all_contributions(&bob);

    assert_eq!(s.usdc.balance(&alice), WALLET);
    assert_eq!(s.eur.balance(&alice), WALLET);
    assert_eq!(s.usdc.balance(&bob), WALLET);
    assert_eq!(s.usdc.balance(&s.client.address), 0);
    assert_totals_consistent(&s.client, &[alice.clone(), bob], &s.usdc.address);
    assert_eq!(
        s.client.try_withdraw_all_contributions(&alice),
        Err(Ok(Error::NothingToRefund))
    );
}

#[test]
fn test_expired_fundraise_refunds_everything() {
    let s = Setup::new();
    let alice = s.contributor();
    s.whitelist(&alice);
    s.client.contribute(&alice, &s.usdc.address, &100);

    s.set_time(END + EXPIRY + 1);
    assert_eq!(s.client.state(), FundraiseState::Expired);
    assert_eq!(s.client.withdraw_contribution(&alice, &s.usdc.address), 100);
    assert_eq!(s.usdc.balance(&alice), WALLET);
}

#[test]
fn test_delisted_currency_is_refundable_after_expiry() {
    let s = Setup::new();
    let alice = s.contributor();
    s.whitelist(&alice);
    s.client.contribute(&alice, &s.usdc.address, &500);
    s.registry.remove_currency(&s.usdc.address);

    s.set_time(END + EXPIRY + 1);
    assert_eq!(s.client.state(), FundraiseState::Expired);
    assert!(s.client.is_expired());
    assert_eq!(s.client.withdraw_contribution(&alice, &s.usdc.address), 500);
    assert_eq!(s.usdc.balance(&alice), WALLET);
    assert_eq!(s.client.qualified_total(&s.usdc.address), 0);
}

#[test]
fn test_delisted_currency_counts_at_recorded_value() {
    let s = Setup::new();
    let alice = s.contributor();
    s.price_one_to_one();
    s.whitelist(&alice);
    s.client.contribute(&alice, &s.eur.address, &600);
    s.registry.remove_currency(&s.eur.address);

    // 600 eur were recorded as 1_200 BCY, above the soft cap.
    s.set_time(END + EXPIRY + 1);
    assert_eq!(s.client.state(), FundraiseState::Ongoing);
    s.finish();
    assert_eq!(s.client.state(), FundraiseState::Finished);
    assert_eq!(s.client.claim_tokens(&alice), 1_200);
}

#[test]
fn test_finished_fundraise_refunds_buffered_only() {
    let (s, alice, _, carol) = finished();

    assert_eq!(
        s.client.try_withdraw_contribution(&alice, &s.usdc.address),
        Err(Ok(Error::NothingToRefund))
    );
    assert_eq!(s.client.withdraw_contribution(&carol, &s.usdc.address), 50);
    assert_eq!(s.usdc.balance(&carol), WALLET);
    assert_eq!(s.client.qualified_balance(&alice, &s.usdc.address), 600);
}

#[test]
fn test_refund_unknown_currency_is_empty() {
    let s = Setup::new();
    let alice = s.contributor();
    s.client.cancel_fundraise(&s.issuer);
    assert_eq!(
        s.client.try_withdraw_contribution(&alice, &s.eur.address),
        Err(Ok(Error::NothingToRefund))
    );
}

// ── Issuer payout ────────────────────────────────────────────────────

#[test]
fn test_release_funds_pays_qualified_only() {
    let (s, _, _, carol) = finished();

    assert_eq!(s.client.release_funds(&s.issuer, &s.usdc.address), 600);
    assert_eq!(s.client.release_funds(&s.issuer, &s.eur.address), 200);
    assert_eq!(s.usdc.balance(&s.issuer), 600);
    assert_eq!(s.eur.balance(&s.issuer), 200);
    assert_eq!(
        s.client.try_release_funds(&s.issuer, &s.usdc.address),
        Err(Ok(Error::NothingToRelease))
    );

    // Carol's buffered value is still hers.
    assert_eq!(s.usdc.balance(&s.client.address), 50);
    s.client.withdraw_contribution(&carol, &s.usdc.address);
}

#[test]
fn test_release_requires_finished_and_issuer() {
    let s = Setup::new();
    assert_eq!(
        s.client.try_release_funds(&s.issuer, &s.usdc.address),
        Err(Ok(Error::FundraiseNotFinished))
    );

    let (t, alice, _, _) = finished();
    assert_eq!(
        t.client.try_release_funds(&alice, &t.usdc.address),
        Err(Ok(Error::NotAuthorized))
    );
}

#[test]
fn test_top_up_after_finish() {
    let (s, _, _, _) = finished();
    token::StellarAssetClient::new(&s.env, &s.usdc.address).mint(&s.issuer, &1_000);
    let before = s.client.sequence();

    let seq = s.client.top_up(&s.issuer, &s.usdc.address, &250);

    assert_eq!(seq, before + 1);
    assert_eq!(s.client.qualified_total(&s.usdc.address), 600);
    assert_eq!(s.client.historical_balance(&seq, &s.usdc.address), 600);
    assert!(s.client.contribution(&seq).is_none());
    assert_eq!(s.client.release_funds(&s.issuer, &s.usdc.address), 850);
    assert_eq!(s.usdc.balance(&s.issuer), 1_600);
}

#[test]
fn test_top_up_rejected_before_finish() {
    let s = Setup::new();
    assert_eq!(
        s.client.try_top_up(&s.issuer, &s.usdc.address, &10),
        Err(Ok(Error::FundraiseNotFinished))
    );
}
