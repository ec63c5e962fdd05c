//! Liquidity pair entered and exited through one of its tokens

use alloy::primitives::{Address, U256};

use super::{refund, removal_minimums, zap_in, HookContext, PositionVenue};
use crate::chain::{Chain, FungibleLedger, SwapExecutor};
use crate::engine::Topology;
use crate::error::{VaultError, VaultResult};
use crate::math::add;
use crate::types::{Inflow, PairReserves, Payout};

/// Holds pair LP tokens while accounting in `asset`, one side of the pair.
///
/// Deposits swap the optimal split into the counter-token before adding
/// liquidity; withdrawals burn LP and swap the counter-token back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSidedLp {
    pub pair: Address,
    pub asset: Address,
    pub counter_token: Address,
}

impl SingleSidedLp {
    pub fn new(chain: &Chain, pair: Address, asset: Address) -> VaultResult<Self> {
        let reserves = chain.pair_reserves(pair)?;
        Ok(Self {
            pair,
            asset,
            counter_token: reserves.other(asset)?,
        })
    }
}

impl PositionVenue for SingleSidedLp {
    fn topology(&self) -> Topology {
        Topology::SingleLpToken
    }

    fn asset(&self) -> Address {
        self.asset
    }

    fn position_token(&self) -> Address {
        self.pair
    }

    fn pool_reserves(&self, chain: &Chain) -> VaultResult<Option<PairReserves>> {
        chain.pair_reserves(self.pair).map(Some)
    }

    fn max_deposit(&self, chain: &Chain) -> VaultResult<U256> {
        let reserves = chain.pair_reserves(self.pair)?;
        if reserves.reserve0.is_zero() || reserves.reserve1.is_zero() {
            return Ok(U256::ZERO);
        }
        Ok(U256::MAX)
    }

    fn on_deposit(&self, chain: &mut Chain, ctx: HookContext, inflow: Inflow) -> VaultResult<U256> {
        let Inflow::Single(amount) = inflow else {
            return Err(VaultError::InvalidParameter("single-sided venue takes one token"));
        };
        let outcome = zap_in(chain, ctx.vault, self.pair, self.asset, amount, ctx.slippage_bps)?;
        refund(chain, ctx, self.asset, outcome.leftover_in)?;
        refund(chain, ctx, self.counter_token, outcome.leftover_out)?;
        Ok(outcome.liquidity)
    }

    fn on_withdraw(&self, chain: &mut Chain, ctx: HookContext, units: U256) -> VaultResult<Payout> {
        let reserves = chain.pair_reserves(self.pair)?;
        let (min0, min1) = removal_minimums(&reserves, units, ctx.slippage_bps)?;
        let (amount0, amount1) = chain.remove_liquidity(ctx.vault, self.pair, units, min0, min1)?;

        let (kept, to_swap) = if self.asset == reserves.token0 {
            (amount0, amount1)
        } else {
            (amount1, amount0)
        };
        let swapped = chain.execute(ctx.vault, to_swap, self.counter_token, self.asset, self.pair)?;
        tracing::debug!(
            "Unwound {} LP of {}: kept {}, swapped {} for {}",
            units,
            self.pair,
            kept,
            to_swap,
            swapped
        );

        Ok(Payout::Single {
            token: self.asset,
            amount: add(kept, swapped)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ConversionEngine;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    fn setup() -> (Chain, SingleSidedLp, HookContext) {
        let mut chain = Chain::default();
        let weth = chain.deploy_token("WETH", 18);
        let usdc = chain.deploy_token("USDC", 18);
        let pair = chain.deploy_pair(weth, usdc).unwrap();
        chain
            .seed_pair(pair, u(1_000_000_000), u(2_000_000_000))
            .unwrap();

        let venue = SingleSidedLp::new(&chain, pair, usdc).unwrap();
        let vault = chain.new_address();
        let user = chain.new_address();
        let ctx = HookContext {
            vault,
            depositor: user,
            slippage_bps: 50,
        };
        (chain, venue, ctx)
    }

    #[test]
    fn test_deposit_matches_engine_simulation() {
        let (mut chain, venue, ctx) = setup();
        let reserves = chain.pair_reserves(venue.pair).unwrap();
        let engine = ConversionEngine::new(Topology::SingleLpToken, venue.asset);
        let expected = engine.lp_from_single_sided(&reserves, u(3_000_000)).unwrap();

        chain.mint(venue.asset, ctx.vault, u(3_000_000)).unwrap();
        let gained = venue
            .on_deposit(&mut chain, ctx, Inflow::Single(u(3_000_000)))
            .unwrap();
        assert_eq!(gained, expected);
        assert_eq!(venue.total_assets(&chain, ctx.vault).unwrap(), gained);
        // vault keeps no loose tokens after refunding dust
        assert_eq!(chain.balance_of(venue.asset, ctx.vault).unwrap(), U256::ZERO);
        assert_eq!(
            chain.balance_of(venue.counter_token, ctx.vault).unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn test_withdraw_matches_virtual_assets() {
        let (mut chain, venue, ctx) = setup();
        chain.mint(venue.asset, ctx.vault, u(3_000_000)).unwrap();
        let lp = venue
            .on_deposit(&mut chain, ctx, Inflow::Single(u(3_000_000)))
            .unwrap();

        let reserves = chain.pair_reserves(venue.pair).unwrap();
        let engine = ConversionEngine::new(Topology::SingleLpToken, venue.asset);
        let expected = engine.virtual_assets(&reserves, lp).unwrap();

        let payout = venue.on_withdraw(&mut chain, ctx, lp).unwrap();
        assert_eq!(
            payout,
            Payout::Single {
                token: venue.asset,
                amount: expected
            }
        );
        // two swaps and the fee cost a little, never more than a percent
        assert!(expected < u(3_000_000));
        assert!(expected > u(2_970_000), "round trip {expected}");
        assert_eq!(chain.balance_of(venue.asset, ctx.vault).unwrap(), expected);
    }
}
