//! Position venues behind a vault
//!
//! A venue is the strategy a vault delegates its custody to: it knows how to
//! turn tokens pulled from a depositor into position units, how to unwind
//! position units into payout tokens, and whether the external market is
//! currently accepting either. The deposit/withdraw protocol only ever talks
//! to the [`PositionVenue`] trait, so the same vault drives a lending pool, a
//! staking derivative or a liquidity pair.

mod dual_lp;
mod lending;
mod passthrough;
mod single_lp;

pub use dual_lp::DualAssetLp;
pub use lending::LendingVenue;
pub use passthrough::PassThrough;
pub use single_lp::SingleSidedLp;

use alloy::primitives::{Address, U256};

use crate::chain::{Chain, FungibleLedger, SwapExecutor};
use crate::engine::Topology;
use crate::error::{VaultError, VaultResult};
use crate::math::{apply_slippage, optimal_swap_amount, sub};
use crate::types::{Inflow, PairReserves, Payout};

/// Accounts and tolerances a venue hook runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookContext {
    /// The vault holding the position
    pub vault: Address,
    /// Where unused deposit tokens are refunded; the vault itself when
    /// compounding harvested rewards
    pub depositor: Address,
    /// Tolerance applied to router minimums
    pub slippage_bps: u16,
}

/// Strategy capability a vault variant is built on
pub trait PositionVenue: Clone + std::fmt::Debug {
    fn topology(&self) -> Topology;

    /// Token share value is measured in
    fn asset(&self) -> Address;

    /// Token the vault holds as its position; rewards accrue against it
    fn position_token(&self) -> Address;

    /// Token harvested rewards must be swapped into before compounding
    fn compounding_token(&self) -> Address {
        self.asset()
    }

    /// Live pair state for LP venues
    fn pool_reserves(&self, _chain: &Chain) -> VaultResult<Option<PairReserves>> {
        Ok(None)
    }

    /// Position units held by `holder`, read live
    fn total_assets(&self, chain: &Chain, holder: Address) -> VaultResult<U256> {
        chain.balance_of(self.position_token(), holder)
    }

    /// Largest deposit the venue accepts right now, in asset units
    fn max_deposit(&self, _chain: &Chain) -> VaultResult<U256> {
        Ok(U256::MAX)
    }

    /// Position units the venue can unwind right now
    fn available_liquidity(&self, _chain: &Chain) -> VaultResult<U256> {
        Ok(U256::MAX)
    }

    /// Pull the deposit tokens from `from` into the vault
    fn pull(&self, chain: &mut Chain, vault: Address, from: Address, inflow: Inflow) -> VaultResult<()> {
        match inflow {
            Inflow::Single(amount) => chain.transfer_from(self.asset(), vault, from, vault, amount),
            Inflow::Pair { .. } => Err(VaultError::InvalidParameter(
                "venue takes a single deposit token",
            )),
        }
    }

    /// Put tokens already held by the vault to work, returning the position
    /// units gained
    fn on_deposit(&self, chain: &mut Chain, ctx: HookContext, inflow: Inflow) -> VaultResult<U256>;

    /// Unwind `units` of position into tokens held by the vault
    fn on_withdraw(&self, chain: &mut Chain, ctx: HookContext, units: U256) -> VaultResult<Payout>;
}

/// Outcome of a single-sided liquidity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ZapOutcome {
    pub liquidity: U256,
    /// Unused input token left with the account
    pub leftover_in: U256,
    /// Unused counter-token left with the account
    pub leftover_out: U256,
}

/// Enter `pair` with `amount` of `token_in` alone: swap the optimal split to
/// the counter-token, then add liquidity with both legs
pub(crate) fn zap_in(
    chain: &mut Chain,
    account: Address,
    pair: Address,
    token_in: Address,
    amount: U256,
    slippage_bps: u16,
) -> VaultResult<ZapOutcome> {
    let reserves = chain.pair_reserves(pair)?;
    let token_out = reserves.other(token_in)?;
    let (reserve_in, _) = reserves.oriented(token_in)?;

    let swap_amount = optimal_swap_amount(reserve_in, amount)?;
    if swap_amount.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    let swapped = chain.execute(account, swap_amount, token_in, token_out, pair)?;
    let remaining = sub(amount, swap_amount)?;

    let (desired0, desired1) = if token_in == reserves.token0 {
        (remaining, swapped)
    } else {
        (swapped, remaining)
    };
    let (used0, used1, liquidity) = chain.add_liquidity(
        account,
        pair,
        desired0,
        desired1,
        apply_slippage(desired0, slippage_bps)?,
        apply_slippage(desired1, slippage_bps)?,
    )?;

    let (used_in, used_out) = if token_in == reserves.token0 {
        (used0, used1)
    } else {
        (used1, used0)
    };
    Ok(ZapOutcome {
        liquidity,
        leftover_in: sub(remaining, used_in)?,
        leftover_out: sub(swapped, used_out)?,
    })
}

/// Return unused deposit tokens to the depositor
pub(crate) fn refund(
    chain: &mut Chain,
    ctx: HookContext,
    token: Address,
    amount: U256,
) -> VaultResult<()> {
    if amount.is_zero() || ctx.depositor == ctx.vault {
        return Ok(());
    }
    tracing::debug!("Refunding {} of {} to {}", amount, token, ctx.depositor);
    chain.transfer(token, ctx.vault, ctx.depositor, amount)
}

/// Router minimums for burning `lp` of a pair
pub(crate) fn removal_minimums(
    reserves: &PairReserves,
    lp: U256,
    slippage_bps: u16,
) -> VaultResult<(U256, U256)> {
    use crate::math::{mul_div, Rounding};

    let expected0 = mul_div(reserves.reserve0, lp, reserves.total_supply, Rounding::Floor)?;
    let expected1 = mul_div(reserves.reserve1, lp, reserves.total_supply, Rounding::Floor)?;
    Ok((
        apply_slippage(expected0, slippage_bps)?,
        apply_slippage(expected1, slippage_bps)?,
    ))
}
