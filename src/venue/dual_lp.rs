//! Liquidity pair entered and exited with both of its tokens

use alloy::primitives::{Address, U256};

use super::{refund, removal_minimums, zap_in, HookContext, PositionVenue};
use crate::chain::{Chain, FungibleLedger};
use crate::engine::Topology;
use crate::error::{VaultError, VaultResult};
use crate::math::{apply_slippage, sub};
use crate::types::{Inflow, PairReserves, Payout};

/// Holds pair LP tokens and accounts in LP units.
///
/// Depositors supply both tokens in the amounts backing the requested LP;
/// withdrawals hand back both tokens. Compounded rewards enter through
/// `token0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualAssetLp {
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
}

impl DualAssetLp {
    pub fn new(chain: &Chain, pair: Address) -> VaultResult<Self> {
        let reserves = chain.pair_reserves(pair)?;
        Ok(Self {
            pair,
            token0: reserves.token0,
            token1: reserves.token1,
        })
    }
}

impl PositionVenue for DualAssetLp {
    fn topology(&self) -> Topology {
        Topology::DualAssetLp
    }

    fn asset(&self) -> Address {
        self.pair
    }

    fn position_token(&self) -> Address {
        self.pair
    }

    fn compounding_token(&self) -> Address {
        self.token0
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

    fn pull(&self, chain: &mut Chain, vault: Address, from: Address, inflow: Inflow) -> VaultResult<()> {
        match inflow {
            Inflow::Pair { amount0, amount1 } => {
                chain.transfer_from(self.token0, vault, from, vault, amount0)?;
                chain.transfer_from(self.token1, vault, from, vault, amount1)
            }
            Inflow::Single(_) => Err(VaultError::InvalidParameter(
                "dual-asset deposits take both pair tokens",
            )),
        }
    }

    fn on_deposit(&self, chain: &mut Chain, ctx: HookContext, inflow: Inflow) -> VaultResult<U256> {
        match inflow {
            Inflow::Pair { amount0, amount1 } => {
                let (used0, used1, liquidity) = chain.add_liquidity(
                    ctx.vault,
                    self.pair,
                    amount0,
                    amount1,
                    apply_slippage(amount0, ctx.slippage_bps)?,
                    apply_slippage(amount1, ctx.slippage_bps)?,
                )?;
                refund(chain, ctx, self.token0, sub(amount0, used0)?)?;
                refund(chain, ctx, self.token1, sub(amount1, used1)?)?;
                Ok(liquidity)
            }
            // Harvest proceeds arrive as token0 only
            Inflow::Single(amount) => {
                let outcome =
                    zap_in(chain, ctx.vault, self.pair, self.token0, amount, ctx.slippage_bps)?;
                refund(chain, ctx, self.token0, outcome.leftover_in)?;
                refund(chain, ctx, self.token1, outcome.leftover_out)?;
                Ok(outcome.liquidity)
            }
        }
    }

    fn on_withdraw(&self, chain: &mut Chain, ctx: HookContext, units: U256) -> VaultResult<Payout> {
        let reserves = chain.pair_reserves(self.pair)?;
        let (min0, min1) = removal_minimums(&reserves, units, ctx.slippage_bps)?;
        let (amount0, amount1) = chain.remove_liquidity(ctx.vault, self.pair, units, min0, min1)?;
        Ok(Payout::Pair {
            token0: self.token0,
            amount0,
            token1: self.token1,
            amount1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    fn setup() -> (Chain, DualAssetLp, HookContext) {
        let mut chain = Chain::default();
        let dai = chain.deploy_token("DAI", 18);
        let usdc = chain.deploy_token("USDC", 18);
        let pair = chain.deploy_pair(dai, usdc).unwrap();
        chain.seed_pair(pair, u(1_000_000), u(1_000_000)).unwrap();

        let venue = DualAssetLp::new(&chain, pair).unwrap();
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
    fn test_pair_deposit_refunds_excess() {
        let (mut chain, venue, ctx) = setup();
        chain.mint(venue.token0, ctx.vault, u(100)).unwrap();
        chain.mint(venue.token1, ctx.vault, u(100)).unwrap();

        let lp = venue
            .on_deposit(
                &mut chain,
                ctx,
                Inflow::Pair {
                    amount0: u(100),
                    amount1: u(100),
                },
            )
            .unwrap();
        assert_eq!(lp, u(100));
        assert_eq!(chain.balance_of(venue.pair, ctx.vault).unwrap(), u(100));
        assert_eq!(chain.balance_of(venue.token0, ctx.depositor).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_slippage_bound_on_skewed_amounts() {
        let (mut chain, venue, ctx) = setup();
        chain.mint(venue.token0, ctx.vault, u(100)).unwrap();
        chain.mint(venue.token1, ctx.vault, u(200)).unwrap();

        // 100/200 against a 1:1 pool leaves token1 at half its desired amount
        assert!(matches!(
            venue.on_deposit(
                &mut chain,
                ctx,
                Inflow::Pair {
                    amount0: u(100),
                    amount1: u(200),
                },
            ),
            Err(VaultError::SlippageViolation { .. })
        ));
    }

    #[test]
    fn test_withdraw_pays_both_tokens() {
        let (mut chain, venue, ctx) = setup();
        chain.mint(venue.token0, ctx.vault, u(1_000)).unwrap();
        chain.mint(venue.token1, ctx.vault, u(1_000)).unwrap();
        venue
            .on_deposit(
                &mut chain,
                ctx,
                Inflow::Pair {
                    amount0: u(1_000),
                    amount1: u(1_000),
                },
            )
            .unwrap();

        let payout = venue.on_withdraw(&mut chain, ctx, u(500)).unwrap();
        assert_eq!(
            payout,
            Payout::Pair {
                token0: venue.token0,
                amount0: u(500),
                token1: venue.token1,
                amount1: u(500),
            }
        );
    }
}
