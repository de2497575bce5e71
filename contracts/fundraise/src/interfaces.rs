//! Collaborator contracts consumed by the fundraise.
//!
//! Both are plain contract interfaces: any contract exporting these
//! functions can be plugged in at `init` (or, for the rules, later through
//! `set_eligibility_rules`). Soroban rejects re-entry, so neither
//! collaborator can call back into the fundraise while it is mid-operation.

use soroban_sdk::{contractclient, contracttype, Address, Env};

use crate::Error;

/// Outcome of [`EligibilityRules::check`].
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Verdict {
    Accept = 0,
    MinAmount = 1,
    MaxAmount = 2,
    MaxContributors = 3,
}

impl Verdict {
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Verdict::Accept => Ok(()),
            Verdict::MinAmount => Err(Error::BelowMinAmount),
            Verdict::MaxAmount => Err(Error::AboveMaxAmount),
            Verdict::MaxContributors => Err(Error::MaxContributorsReached),
        }
    }
}

/// Values currency amounts in the base currency.
#[contractclient(name = "CurrencyConverterClient")]
pub trait CurrencyConverter {
    /// BCY value of `amount` units of `currency`; `None` if the currency is
    /// not accepted.
    fn to_base_currency(env: Env, amount: i128, currency: Address) -> Option<i128>;
}

/// Contributor eligibility policy.
#[contractclient(name = "EligibilityRulesClient")]
pub trait EligibilityRules {
    /// `amount` is the contributor's projected qualified BCY total and
    /// `contributor_count` the projected number of counted contributors.
    /// `currency` is `None` for the claim-time re-check.
    fn check(
        env: Env,
        contributor: Address,
        currency: Option<Address>,
        amount: i128,
        contributor_count: u32,
    ) -> Verdict;
}
