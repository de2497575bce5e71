//! Checked arithmetic. Every rate-based conversion truncates toward zero so
//! contributors are never over-credited.

use soroban_sdk::{Env, I256};

use crate::Error;

pub fn add(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_add(b).ok_or(Error::Overflow)
}

pub fn sub(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_sub(b).ok_or(Error::Overflow)
}

/// `floor(a * b / c)` for non-negative operands, with a 256-bit product.
pub fn mul_div_floor(env: &Env, a: i128, b: i128, c: i128) -> Result<i128, Error> {
    if a < 0 || b < 0 || c <= 0 {
        return Err(Error::Overflow);
    }
    I256::from_i128(env, a)
        .mul(&I256::from_i128(env, b))
        .div(&I256::from_i128(env, c))
        .to_i128()
        .ok_or(Error::Overflow)
}
