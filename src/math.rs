//! Checked integer math shared by the conversion engine and the ledger
//!
//! Every function is pure over `U256`; overflow and zero divisors surface as
//! [`VaultError::MathOverflow`] and [`VaultError::DivisionByZero`].

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BPS_DENOMINATOR, FEE_DENOMINATOR, FEE_NUMERATOR, SPLIT_ASSET_COEFF, SPLIT_DIVISOR,
    SPLIT_RESERVE_COEFF, SPLIT_SQUARE_COEFF,
};
use crate::error::{VaultError, VaultResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Floor,
    Ceiling,
}

/// Order of operations for proportional reserve claims.
///
/// `DivideFirst` truncates `amount / total` before scaling by the reserve,
/// which yields zero for any amount below `total`. It is kept so both
/// behaviours can be compared side by side.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisionOrder {
    #[default]
    MultiplyFirst,
    DivideFirst,
}

fn u(value: u64) -> U256 {
    U256::from(value)
}

pub(crate) fn add(a: U256, b: U256) -> VaultResult<U256> {
    a.checked_add(b).ok_or(VaultError::MathOverflow)
}

pub(crate) fn sub(a: U256, b: U256) -> VaultResult<U256> {
    a.checked_sub(b).ok_or(VaultError::MathOverflow)
}

pub(crate) fn mul(a: U256, b: U256) -> VaultResult<U256> {
    a.checked_mul(b).ok_or(VaultError::MathOverflow)
}

/// Computes `value * numerator / denominator` with the given rounding.
pub fn mul_div(
    value: U256,
    numerator: U256,
    denominator: U256,
    rounding: Rounding,
) -> VaultResult<U256> {
    if denominator.is_zero() {
        return Err(VaultError::DivisionByZero);
    }

    let product = mul(value, numerator)?;
    let quotient = product / denominator;

    match rounding {
        Rounding::Floor => Ok(quotient),
        Rounding::Ceiling => {
            if (product % denominator).is_zero() {
                Ok(quotient)
            } else {
                add(quotient, U256::from(1u64))
            }
        }
    }
}

/// Integer square root, rounded down (Babylonian method).
pub fn sqrt(y: U256) -> U256 {
    if y > u(3) {
        let mut z = y;
        let mut x = y / u(2) + u(1);
        while x < z {
            z = x;
            x = (y / x + x) / u(2);
        }
        z
    } else if !y.is_zero() {
        u(1)
    } else {
        U256::ZERO
    }
}

/// Constant-product output for an exact input, net of the 0.3% fee.
///
/// `amountOut = amountIn * 997 * reserveOut / (reserveIn * 1000 + amountIn * 997)`
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> VaultResult<U256> {
    if amount_in.is_zero() {
        return Ok(U256::ZERO);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(VaultError::DivisionByZero);
    }

    let amount_in_with_fee = mul(amount_in, u(FEE_NUMERATOR))?;
    let numerator = mul(amount_in_with_fee, reserve_out)?;
    let denominator = add(mul(reserve_in, u(FEE_DENOMINATOR))?, amount_in_with_fee)?;
    Ok(numerator / denominator)
}

/// Amount of B equivalent to `amount_a` of A at the pool's spot price.
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> VaultResult<U256> {
    if amount_a.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    mul_div(amount_a, reserve_b, reserve_a, Rounding::Floor)
}

/// Amounts a V2 router actually deposits out of `(desired0, desired1)`:
/// as much as possible at the pool's current ratio.
pub fn liquidity_amounts(
    desired0: U256,
    desired1: U256,
    reserve0: U256,
    reserve1: U256,
) -> VaultResult<(U256, U256)> {
    if reserve0.is_zero() && reserve1.is_zero() {
        return Ok((desired0, desired1));
    }

    let amount1_optimal = quote(desired0, reserve0, reserve1)?;
    if amount1_optimal <= desired1 {
        Ok((desired0, amount1_optimal))
    } else {
        let amount0_optimal = quote(desired1, reserve1, reserve0)?;
        Ok((amount0_optimal.min(desired0), desired1))
    }
}

/// Portion of a single-asset deposit to swap before adding liquidity.
///
/// Solves the constant-product invariant (0.3% fee included) for the swap
/// size that leaves the remaining deposit and the swap output in the pool's
/// post-swap ratio:
///
/// `s = (sqrt(r * (r * 3988009 + a * 3988000)) - r * 1997) / 1994`
pub fn optimal_swap_amount(reserve_in: U256, assets_in: U256) -> VaultResult<U256> {
    if reserve_in.is_zero() {
        return Err(VaultError::DivisionByZero);
    }

    let inner = add(
        mul(reserve_in, u(SPLIT_SQUARE_COEFF))?,
        mul(assets_in, u(SPLIT_ASSET_COEFF))?,
    )?;
    let root = sqrt(mul(reserve_in, inner)?);
    let offset = mul(reserve_in, u(SPLIT_RESERVE_COEFF))?;

    Ok(root.saturating_sub(offset) / u(SPLIT_DIVISOR))
}

/// Share of `reserve` owned by `amount` out of `total` units.
pub fn proportional_share(
    amount: U256,
    total: U256,
    reserve: U256,
    order: DivisionOrder,
    rounding: Rounding,
) -> VaultResult<U256> {
    if total.is_zero() {
        return Err(VaultError::DivisionByZero);
    }

    match order {
        DivisionOrder::MultiplyFirst => mul_div(amount, reserve, total, rounding),
        DivisionOrder::DivideFirst => mul(amount / total, reserve),
    }
}

/// Lower bound on `amount` after a basis-point tolerance.
pub fn apply_slippage(amount: U256, slippage_bps: u16) -> VaultResult<U256> {
    let keep = BPS_DENOMINATOR
        .checked_sub(u64::from(slippage_bps))
        .ok_or(VaultError::InvalidParameter("slippage above 100%"))?;
    mul_div(amount, u(keep), u(BPS_DENOMINATOR), Rounding::Floor)
}
