//! Conversion engine: share <-> asset math for every vault topology
//!
//! All vault variants share the same share accounting:
//!
//! - `convert_to_shares(x) = supply == 0 ? x : x * supply / totalAssets`
//! - `convert_to_assets(s) = supply == 0 ? s : s * totalAssets / supply`
//!
//! where `totalAssets` is the vault's live position measured in *position
//! units* (receipt tokens for [`Topology::Rebasing`], LP tokens for the two
//! LP topologies). What differs per topology is how a deposit or payout in
//! the vault's accounting asset maps onto position units:
//!
//! | Topology        | accounting asset | position unit | mapping                       |
//! |-----------------|------------------|---------------|-------------------------------|
//! | `Rebasing`      | underlying       | receipt token | identity                      |
//! | `SingleLpToken` | one pair token   | pair LP token | swap-and-add / burn-and-swap  |
//! | `DualAssetLp`   | pair LP token    | pair LP token | identity (both tokens moved)  |
//!
//! Rounding always favours the vault: deposits and redemptions round down,
//! mints and withdrawals round up.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::math::{
    self, add, get_amount_out, mul, mul_div, optimal_swap_amount, proportional_share, sub,
    DivisionOrder, Rounding,
};
use crate::types::PairReserves;

/// Upper bound on search inputs, relative to the pool reserve
const SEARCH_RESERVE_MULTIPLE: u64 = 1_000_000;

/// Shape of the position behind a vault
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Single rebasing receipt (lending aToken, staking derivative)
    Rebasing,
    /// LP token of a pair, entered and exited with one of its tokens
    SingleLpToken,
    /// LP token of a pair, entered and exited with both tokens
    DualAssetLp,
}

/// Live inputs for one conversion, re-read from the venue on every call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Vault position in position units
    pub total_assets: U256,
    /// Vault share supply
    pub total_supply: U256,
    /// Pair state for LP topologies
    pub pool: Option<PairReserves>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionEngine {
    pub topology: Topology,
    /// Accounting asset; for `SingleLpToken` the pair side deposits arrive in
    pub asset: Address,
    pub division_order: DivisionOrder,
}

impl ConversionEngine {
    pub fn new(topology: Topology, asset: Address) -> Self {
        Self {
            topology,
            asset,
            division_order: DivisionOrder::default(),
        }
    }

    pub fn with_division_order(mut self, order: DivisionOrder) -> Self {
        self.division_order = order;
        self
    }

    // ========== Share accounting ==========

    pub fn convert_to_shares(
        &self,
        snapshot: &Snapshot,
        units: U256,
        rounding: Rounding,
    ) -> VaultResult<U256> {
        if snapshot.total_supply.is_zero() {
            return Ok(units);
        }
        mul_div(units, snapshot.total_supply, snapshot.total_assets, rounding)
    }

    pub fn convert_to_assets(
        &self,
        snapshot: &Snapshot,
        shares: U256,
        rounding: Rounding,
    ) -> VaultResult<U256> {
        if snapshot.total_supply.is_zero() {
            return Ok(shares);
        }
        mul_div(shares, snapshot.total_assets, snapshot.total_supply, rounding)
    }

    // ========== Previews ==========

    /// Shares minted for depositing `assets` (rounded down)
    pub fn preview_deposit(&self, snapshot: &Snapshot, assets: U256) -> VaultResult<U256> {
        let units = match self.topology {
            Topology::Rebasing | Topology::DualAssetLp => assets,
            Topology::SingleLpToken => self.lp_from_single_sided(pool(snapshot)?, assets)?,
        };
        self.convert_to_shares(snapshot, units, Rounding::Floor)
    }

    /// Assets required to mint exactly `shares` (rounded up)
    pub fn preview_mint(&self, snapshot: &Snapshot, shares: U256) -> VaultResult<U256> {
        let units = self.convert_to_assets(snapshot, shares, Rounding::Ceiling)?;
        match self.topology {
            Topology::Rebasing | Topology::DualAssetLp => Ok(units),
            Topology::SingleLpToken => self.single_sided_cost(pool(snapshot)?, units),
        }
    }

    /// Shares burned to pay out `assets` (rounded up)
    pub fn preview_withdraw(&self, snapshot: &Snapshot, assets: U256) -> VaultResult<U256> {
        let units = self.position_for_payout(snapshot, assets)?;
        self.convert_to_shares(snapshot, units, Rounding::Ceiling)
    }

    /// Assets paid out for redeeming `shares` (rounded down)
    pub fn preview_redeem(&self, snapshot: &Snapshot, shares: U256) -> VaultResult<U256> {
        let units = self.convert_to_assets(snapshot, shares, Rounding::Floor)?;
        self.payout_for_position(snapshot, units)
    }

    /// Position units that must be unwound to pay out `assets`
    pub fn position_for_payout(&self, snapshot: &Snapshot, assets: U256) -> VaultResult<U256> {
        match self.topology {
            Topology::Rebasing | Topology::DualAssetLp => Ok(assets),
            Topology::SingleLpToken => self.lp_for_single_sided_payout(pool(snapshot)?, assets),
        }
    }

    /// Accounting-asset value realized by unwinding `units` of position
    pub fn payout_for_position(&self, snapshot: &Snapshot, units: U256) -> VaultResult<U256> {
        match self.topology {
            Topology::Rebasing | Topology::DualAssetLp => Ok(units),
            Topology::SingleLpToken => self.virtual_assets(pool(snapshot)?, units),
        }
    }

    // ========== LP math ==========

    /// Value of `lp` tokens in the accounting asset: burn them, then swap the
    /// counter-asset back through the (post-burn) pool
    pub fn virtual_assets(&self, reserves: &PairReserves, lp: U256) -> VaultResult<U256> {
        if lp.is_zero() {
            return Ok(U256::ZERO);
        }
        if lp >= reserves.total_supply {
            return Err(VaultError::InsufficientLiquidity {
                pool: reserves.pair,
            });
        }
        let (reserve_in, reserve_out) = reserves.oriented(self.asset)?;
        let claim_in = mul_div(reserve_in, lp, reserves.total_supply, Rounding::Floor)?;
        let claim_out = mul_div(reserve_out, lp, reserves.total_supply, Rounding::Floor)?;

        let swapped = get_amount_out(
            claim_out,
            sub(reserve_out, claim_out)?,
            sub(reserve_in, claim_in)?,
        )?;
        add(claim_in, swapped)
    }

    /// LP minted by depositing `assets` of one side: swap the optimal split,
    /// then add liquidity with the remainder and the swap output
    pub fn lp_from_single_sided(&self, reserves: &PairReserves, assets: U256) -> VaultResult<U256> {
        Ok(self.single_sided_plan(reserves, assets)?.liquidity)
    }

    /// Full simulation of a single-sided entry
    pub fn single_sided_plan(
        &self,
        reserves: &PairReserves,
        assets: U256,
    ) -> VaultResult<SingleSidedPlan> {
        let (reserve_in, reserve_out) = reserves.oriented(self.asset)?;
        let swap_amount = optimal_swap_amount(reserve_in, assets)?;
        let swap_output = get_amount_out(swap_amount, reserve_in, reserve_out)?;

        let remaining = sub(assets, swap_amount)?;
        if remaining.is_zero() || swap_output.is_zero() {
            return Ok(SingleSidedPlan {
                swap_amount,
                swap_output,
                liquidity: U256::ZERO,
            });
        }
        let reserve_in = add(reserve_in, swap_amount)?;
        let reserve_out = sub(reserve_out, swap_output)?;

        // The router works in token0/token1 order against post-swap reserves
        let (desired0, desired1, reserve0, reserve1) = if self.asset == reserves.token0 {
            (remaining, swap_output, reserve_in, reserve_out)
        } else {
            (swap_output, remaining, reserve_out, reserve_in)
        };
        let (amount0, amount1) = math::liquidity_amounts(desired0, desired1, reserve0, reserve1)?;

        let by0 = mul_div(amount0, reserves.total_supply, reserve0, Rounding::Floor)?;
        let by1 = mul_div(amount1, reserves.total_supply, reserve1, Rounding::Floor)?;
        Ok(SingleSidedPlan {
            swap_amount,
            swap_output,
            liquidity: by0.min(by1),
        })
    }

    /// Smallest single-sided deposit that yields at least `lp` tokens
    pub fn single_sided_cost(&self, reserves: &PairReserves, lp: U256) -> VaultResult<U256> {
        let (reserve_in, _) = reserves.oriented(self.asset)?;
        let estimate = fair_value(reserves, reserve_in, lp)?;
        let cap = mul(reserve_in, U256::from(SEARCH_RESERVE_MULTIPLE))?;
        smallest_input(lp, estimate, cap, reserves.pair, |assets| {
            self.lp_from_single_sided(reserves, assets)
        })
    }

    /// Smallest LP amount whose unwind pays out at least `assets`
    pub fn lp_for_single_sided_payout(
        &self,
        reserves: &PairReserves,
        assets: U256,
    ) -> VaultResult<U256> {
        let (reserve_in, _) = reserves.oriented(self.asset)?;
        let estimate = mul_div(
            assets,
            reserves.total_supply,
            mul(reserve_in, U256::from(2u64))?,
            Rounding::Ceiling,
        )?;
        let cap = sub(reserves.total_supply, U256::from(1u64))?;
        smallest_input(assets, estimate, cap, reserves.pair, |lp| {
            self.virtual_assets(reserves, lp)
        })
    }

    /// Both token amounts backing `lp` tokens, for a dual-asset deposit.
    ///
    /// Rounded up so the liquidity added is never below `lp`.
    pub fn tokens_to_deposit(&self, reserves: &PairReserves, lp: U256) -> VaultResult<(U256, U256)> {
        let amount0 = proportional_share(
            lp,
            reserves.total_supply,
            reserves.reserve0,
            self.division_order,
            Rounding::Ceiling,
        )?;
        let amount1 = proportional_share(
            lp,
            reserves.total_supply,
            reserves.reserve1,
            self.division_order,
            Rounding::Ceiling,
        )?;
        Ok((amount0, amount1))
    }

    /// Both token amounts released by burning `lp` tokens
    pub fn tokens_for_withdrawal(
        &self,
        reserves: &PairReserves,
        lp: U256,
    ) -> VaultResult<(U256, U256)> {
        let amount0 = mul_div(reserves.reserve0, lp, reserves.total_supply, Rounding::Floor)?;
        let amount1 = mul_div(reserves.reserve1, lp, reserves.total_supply, Rounding::Floor)?;
        Ok((amount0, amount1))
    }
}

/// Intermediate amounts of a single-sided entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SingleSidedPlan {
    /// Deposit portion swapped into the counter-asset
    pub swap_amount: U256,
    /// Counter-asset received from the swap
    pub swap_output: U256,
    /// LP tokens minted by the subsequent add
    pub liquidity: U256,
}

fn pool(snapshot: &Snapshot) -> VaultResult<&PairReserves> {
    snapshot
        .pool
        .as_ref()
        .ok_or(VaultError::InvalidParameter("LP topology without pool reserves"))
}

/// Fee-free value of `lp` in the accounting asset (both sides at spot)
fn fair_value(reserves: &PairReserves, reserve_in: U256, lp: U256) -> VaultResult<U256> {
    mul_div(
        lp,
        mul(reserve_in, U256::from(2u64))?,
        reserves.total_supply,
        Rounding::Ceiling,
    )
}

/// Binary search for the smallest `x <= cap` with `f(x) >= target`
fn smallest_input(
    target: U256,
    estimate: U256,
    cap: U256,
    pool: Address,
    f: impl Fn(U256) -> VaultResult<U256>,
) -> VaultResult<U256> {
    if target.is_zero() {
        return Ok(U256::ZERO);
    }

    let one = U256::from(1u64);
    let mut low = U256::ZERO;
    let mut high = estimate.max(one).min(cap);
    while f(high)? < target {
        if high == cap {
            return Err(VaultError::InsufficientLiquidity { pool });
        }
        low = high;
        high = high.saturating_mul(U256::from(2u64)).min(cap);
    }

    while high - low > one {
        let mid = low + (high - low) / U256::from(2u64);
        if f(mid)? >= target {
            high = mid;
        } else {
            low = mid;
        }
    }
    Ok(high)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    fn reserves(reserve0: u64, reserve1: u64, supply: u64) -> PairReserves {
        PairReserves {
            pair: Address::repeat_byte(0xaa),
            token0: Address::repeat_byte(0x01),
            token1: Address::repeat_byte(0x02),
            reserve0: u(reserve0),
            reserve1: u(reserve1),
            total_supply: u(supply),
        }
    }

    fn snapshot(total_assets: u64, total_supply: u64) -> Snapshot {
        Snapshot {
            total_assets: u(total_assets),
            total_supply: u(total_supply),
            pool: None,
        }
    }

    fn rebasing() -> ConversionEngine {
        ConversionEngine::new(Topology::Rebasing, Address::repeat_byte(0x01))
    }

    #[test]
    fn test_zero_supply_bootstraps_one_to_one() {
        let engine = rebasing();
        let empty = snapshot(0, 0);
        assert_eq!(engine.preview_deposit(&empty, u(1_000)).unwrap(), u(1_000));
        assert_eq!(engine.preview_mint(&empty, u(1_000)).unwrap(), u(1_000));
        assert_eq!(engine.convert_to_assets(&empty, u(5), Rounding::Floor).unwrap(), u(5));
    }

    #[test]
    fn test_previews_round_in_vault_favour() {
        let engine = rebasing();
        // 3 shares backed by 10 assets
        let snap = snapshot(10, 3);

        // deposit 5 -> 1.5 shares -> 1
        assert_eq!(engine.preview_deposit(&snap, u(5)).unwrap(), u(1));
        // mint 1 -> 3.33 assets -> 4
        assert_eq!(engine.preview_mint(&snap, u(1)).unwrap(), u(4));
        // withdraw 5 -> 1.5 shares -> 2
        assert_eq!(engine.preview_withdraw(&snap, u(5)).unwrap(), u(2));
        // redeem 1 -> 3.33 assets -> 3
        assert_eq!(engine.preview_redeem(&snap, u(1)).unwrap(), u(3));
    }

    #[test]
    fn test_round_trip_never_gains() {
        let engine = rebasing();
        for (total_assets, total_supply) in [(1_000, 1_000), (1_337, 1_000), (7, 3), (10_000, 9_999)]
        {
            let snap = snapshot(total_assets, total_supply);
            for assets in [1u64, 2, 3, 99, 1_000, 12_345] {
                let shares = engine.convert_to_shares(&snap, u(assets), Rounding::Floor).unwrap();
                let back = engine.convert_to_assets(&snap, shares, Rounding::Floor).unwrap();
                assert!(back <= u(assets), "{assets} -> {shares} -> {back}");
            }
        }
    }

    #[test]
    fn test_supply_without_assets_is_an_error() {
        let engine = rebasing();
        assert_eq!(
            engine.preview_deposit(&snapshot(0, 10), u(1)),
            Err(VaultError::DivisionByZero)
        );
    }

    #[test]
    fn test_tokens_to_deposit_division_orders() {
        let pool = reserves(1_000_000, 1_000_000, 1_000_000);
        let engine = ConversionEngine::new(Topology::DualAssetLp, pool.pair);
        assert_eq!(engine.tokens_to_deposit(&pool, u(100)).unwrap(), (u(100), u(100)));

        let truncating = engine.with_division_order(DivisionOrder::DivideFirst);
        assert_eq!(
            truncating.tokens_to_deposit(&pool, u(100)).unwrap(),
            (U256::ZERO, U256::ZERO)
        );
        // Only whole multiples of the supply survive the early division
        assert_eq!(
            truncating.tokens_to_deposit(&pool, u(2_000_000)).unwrap(),
            (u(2_000_000), u(2_000_000))
        );
    }

    #[test]
    fn test_virtual_assets_below_fair_value() {
        let pool = reserves(1_000_000_000, 1_000_000_000, 1_000_000_000);
        let engine = ConversionEngine::new(Topology::SingleLpToken, pool.token0);

        let value = engine.virtual_assets(&pool, u(1_000_000)).unwrap();
        // 1M of each side; the swapped half loses the 0.3% fee plus impact
        assert!(value < u(2_000_000));
        assert!(value > u(1_990_000), "value {value}");
    }

    #[test]
    fn test_single_sided_deposit_then_value() {
        let pool = reserves(1_000_000_000, 4_000_000_000, 2_000_000_000);
        let engine = ConversionEngine::new(Topology::SingleLpToken, pool.token0);

        let plan = engine.single_sided_plan(&pool, u(10_000_000)).unwrap();
        assert!(plan.swap_amount > u(4_900_000) && plan.swap_amount < u(5_100_000));
        // fair value of the full deposit is 10M * 2e9 / (2 * 1e9) = 10M LP
        assert!(plan.liquidity < u(10_000_000));
        assert!(plan.liquidity > u(9_950_000), "liquidity {}", plan.liquidity);
    }

    #[test]
    fn test_single_sided_cost_is_minimal() {
        let pool = reserves(1_000_000_000, 1_000_000_000, 1_000_000_000);
        let engine = ConversionEngine::new(Topology::SingleLpToken, pool.token1);

        let lp = u(250_000);
        let cost = engine.single_sided_cost(&pool, lp).unwrap();
        assert!(engine.lp_from_single_sided(&pool, cost).unwrap() >= lp);
        assert!(engine.lp_from_single_sided(&pool, cost - u(1)).unwrap() < lp);
    }

    #[test]
    fn test_lp_for_payout_is_minimal() {
        let pool = reserves(1_000_000_000, 1_000_000_000, 1_000_000_000);
        let engine = ConversionEngine::new(Topology::SingleLpToken, pool.token0);

        let assets = u(500_000);
        let lp = engine.lp_for_single_sided_payout(&pool, assets).unwrap();
        assert!(engine.virtual_assets(&pool, lp).unwrap() >= assets);
        assert!(engine.virtual_assets(&pool, lp - u(1)).unwrap() < assets);
    }

    #[test]
    fn test_single_lp_preview_redeem_uses_virtual_assets() {
        let pool = reserves(1_000_000_000, 1_000_000_000, 1_000_000_000);
        let engine = ConversionEngine::new(Topology::SingleLpToken, pool.token0);
        let snap = Snapshot {
            total_assets: u(1_000_000),
            total_supply: u(1_000_000),
            pool: Some(pool),
        };

        let redeemed = engine.preview_redeem(&snap, u(1_000_000)).unwrap();
        assert_eq!(redeemed, engine.virtual_assets(&pool, u(1_000_000)).unwrap());
    }

    #[test]
    fn test_lp_topology_requires_pool() {
        let engine = ConversionEngine::new(Topology::SingleLpToken, Address::repeat_byte(1));
        assert!(engine.preview_deposit(&snapshot(0, 0), u(10)).is_err());
    }
}
