//! # Currency Registry
//!
//! Keeps the list of currencies a fundraise accepts and values them in the
//! base currency (BCY). Every registered currency carries a fixed-point rate:
//! the BCY value of one raw unit, scaled by [`RATE_SCALE`] (18 decimals).
//!
//! ```text
//! bcy = floor(amount * rate / 10^18)
//! ```
//!
//! Conversion always truncates so a contributor is never over-credited.
//! Intermediate products are computed in 256 bits.

#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, panic_with_error, Address, Env, I256,
};


/// Fixed-point scale used by every rate (10^18).
pub const RATE_SCALE: i128 = 1_000_000_000_000_000_000;

const DAY_IN_LEDGERS: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidRate = 3,
    CurrencyNotRegistered = 4,
    Overflow = 5,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum DataKey {
    /// Registry administrator (Instance).
    Admin,
    /// BCY rate of a registered currency (Persistent).
    Rate(Address),
}

#[contract]
pub struct CurrencyRegistry;

#[contractimpl]
impl CurrencyRegistry {
    /// Set the registry administrator. Callable once.
    pub fn init(env: Env, admin: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();
        env.storage().instance().set(&DataKey::Admin, &admin);
        bump_instance(&env);
        Ok(())
    }

    /// Register `currency` (or replace its rate).
    pub fn add_currency(env: Env, currency: Address, rate: i128) -> Result<(), Error> {
        require_admin(&env)?;
        if rate <= 0 {
            return Err(Error::InvalidRate);
        }
        let key = DataKey::Rate(currency);
        env.storage().persistent().set(&key, &rate);
        bump_persistent(&env, &key);
        Ok(())
    }

    /// Stop accepting `currency`.
    pub fn remove_currency(env: Env, currency: Address) -> Result<(), Error> {
        require_admin(&env)?;
        let key = DataKey::Rate(currency);
        if !env.storage().persistent().has(&key) {
            return Err(Error::CurrencyNotRegistered);
        }
        env.storage().persistent().remove(&key);
        Ok(())
    }

    pub fn is_accepted(env: Env, currency: Address) -> bool {
        env.storage().persistent().has(&DataKey::Rate(currency))
    }

    pub fn rate(env: Env, currency: Address) -> Option<i128> {
        load_rate(&env, currency)
    }

    /// Value `amount` of `currency` in BCY, or `None` when the currency is
    /// not registered.
    pub fn to_base_currency(env: Env, amount: i128, currency: Address) -> Option<i128> {
        let rate = load_rate(&env, currency)?;
        let value = I256::from_i128(&env, amount)
            .mul(&I256::from_i128(&env, rate))
            .div(&I256::from_i128(&env, RATE_SCALE));
        match value.to_i128() {
            Some(v) => Some(v),
            None => panic_with_error!(&env, Error::Overflow),
        }
    }
}

fn require_admin(env: &Env) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    admin.require_auth();
    bump_instance(env);
    Ok(())
}

fn load_rate(env: &Env, currency: Address) -> Option<i128> {
    let key = DataKey::Rate(currency);
    let rate: Option<i128> = env.storage().persistent().get(&key);
    if rate.is_some() {
        bump_persistent(env, &key);
    }
    rate
}

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}
