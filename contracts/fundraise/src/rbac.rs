//! # Role-Based Access Control
//!
//! Two roles exist:
//!
//! | Role      | Granted by        | May                                          |
//! |-----------|-------------------|----------------------------------------------|
//! | Issuer    | `init` (fixed)    | everything below, plus lifecycle and pricing |
//! | Manager   | Issuer            | whitelist, unwhitelist, reject contributors  |
//!
//! Every privileged entry point takes the caller explicitly, calls
//! `require_auth` on it, then checks its role here.

use soroban_sdk::{contracttype, Address, Env};

use crate::{events, storage, Error};

const DAY_IN_LEDGERS: u32 = 17_280;
const MANAGER_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const MANAGER_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RbacKey {
    Manager(Address),
}

pub fn is_issuer(env: &Env, address: &Address) -> Result<bool, Error> {
    Ok(storage::load_config(env)?.issuer == *address)
}

pub fn is_manager(env: &Env, address: &Address) -> bool {
    let key = RbacKey::Manager(address.clone());
    let found = env.storage().persistent().has(&key);
    if found {
        env.storage()
            .persistent()
            .extend_ttl(&key, MANAGER_LIFETIME_THRESHOLD, MANAGER_BUMP_AMOUNT);
    }
    found
}

pub fn is_issuer_or_manager(env: &Env, address: &Address) -> Result<bool, Error> {
    Ok(is_issuer(env, address)? || is_manager(env, address))
}

/// Authenticate `caller` and require the issuer role.
pub fn require_issuer(env: &Env, caller: &Address) -> Result<(), Error> {
    caller.require_auth();
    if !is_issuer(env, caller)? {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

/// Authenticate `caller` and require the issuer or manager role.
pub fn require_issuer_or_manager(env: &Env, caller: &Address) -> Result<(), Error> {
    caller.require_auth();
    if !is_issuer_or_manager(env, caller)? {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

pub fn add_manager(env: &Env, caller: &Address, manager: &Address) -> Result<(), Error> {
    require_issuer(env, caller)?;
    let key = RbacKey::Manager(manager.clone());
    env.storage().persistent().set(&key, &true);
    env.storage()
        .persistent()
        .extend_ttl(&key, MANAGER_LIFETIME_THRESHOLD, MANAGER_BUMP_AMOUNT);
    events::emit_manager_added(env, manager.clone(), caller.clone());
    Ok(())
}

pub fn remove_manager(env: &Env, caller: &Address, manager: &Address) -> Result<(), Error> {
    require_issuer(env, caller)?;
    env.storage()
        .persistent()
        .remove(&RbacKey::Manager(manager.clone()));
    events::emit_manager_removed(env, manager.clone(), caller.clone());
    Ok(())
}
