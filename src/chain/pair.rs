//! Uniswap V2 style constant-product pair and router
//!
//! The pair address doubles as its LP token, as on mainnet.

use alloy::primitives::{Address, U256};

use super::{Chain, FungibleLedger, SwapExecutor, Token};
use crate::constants::{FEE_DENOMINATOR, FEE_NUMERATOR, MINIMUM_LIQUIDITY};
use crate::error::{VaultError, VaultResult};
use crate::math::{self, mul, mul_div, sub, Rounding};
use crate::types::PairReserves;

#[derive(Debug, Clone)]
pub struct Pair {
    pub token0: Address,
    pub token1: Address,
    reserve0: U256,
    reserve1: U256,
}

impl Chain {
    /// Deploy an empty pair; tokens are sorted by address like the V2 factory
    pub fn deploy_pair(&mut self, token_a: Address, token_b: Address) -> VaultResult<Address> {
        if token_a == token_b {
            return Err(VaultError::InvalidParameter("identical pair tokens"));
        }
        self.token(token_a)?;
        self.token(token_b)?;

        let (token0, token1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        let pair = self.new_address();
        self.insert_token(pair, Token::new("UNI-V2", 18));
        self.pairs.insert(
            pair,
            Pair {
                token0,
                token1,
                reserve0: U256::ZERO,
                reserve1: U256::ZERO,
            },
        );
        Ok(pair)
    }

    fn pair(&self, pair: Address) -> VaultResult<&Pair> {
        self.pairs.get(&pair).ok_or(VaultError::UnknownPool(pair))
    }

    /// Live reserves and LP supply
    pub fn pair_reserves(&self, pair: Address) -> VaultResult<PairReserves> {
        let state = self.pair(pair)?;
        Ok(PairReserves {
            pair,
            token0: state.token0,
            token1: state.token1,
            reserve0: state.reserve0,
            reserve1: state.reserve1,
            total_supply: self.total_supply(pair)?,
        })
    }

    fn sync_pair(&mut self, pair: Address) -> VaultResult<()> {
        let (token0, token1) = {
            let state = self.pair(pair)?;
            (state.token0, state.token1)
        };
        let balance0 = self.balance_of(token0, pair)?;
        let balance1 = self.balance_of(token1, pair)?;
        let state = self
            .pairs
            .get_mut(&pair)
            .ok_or(VaultError::UnknownPool(pair))?;
        state.reserve0 = balance0;
        state.reserve1 = balance1;
        Ok(())
    }

    /// Mint LP for whatever was transferred in since the last sync
    pub fn pair_mint(&mut self, pair: Address, to: Address) -> VaultResult<U256> {
        let reserves = self.pair_reserves(pair)?;
        let amount0 = sub(self.balance_of(reserves.token0, pair)?, reserves.reserve0)?;
        let amount1 = sub(self.balance_of(reserves.token1, pair)?, reserves.reserve1)?;

        let liquidity = if reserves.total_supply.is_zero() {
            let minimum = U256::from(MINIMUM_LIQUIDITY);
            let root = math::sqrt(mul(amount0, amount1)?);
            if root <= minimum {
                return Err(VaultError::InsufficientLiquidity { pool: pair });
            }
            self.mint(pair, Address::ZERO, minimum)?;
            root - minimum
        } else {
            let by0 = mul_div(amount0, reserves.total_supply, reserves.reserve0, Rounding::Floor)?;
            let by1 = mul_div(amount1, reserves.total_supply, reserves.reserve1, Rounding::Floor)?;
            by0.min(by1)
        };
        if liquidity.is_zero() {
            return Err(VaultError::InsufficientLiquidity { pool: pair });
        }

        self.mint(pair, to, liquidity)?;
        self.sync_pair(pair)?;
        Ok(liquidity)
    }

    /// Burn the LP held by the pair itself and pay out both tokens
    pub fn pair_burn(&mut self, pair: Address, to: Address) -> VaultResult<(U256, U256)> {
        let reserves = self.pair_reserves(pair)?;
        let liquidity = self.balance_of(pair, pair)?;
        let balance0 = self.balance_of(reserves.token0, pair)?;
        let balance1 = self.balance_of(reserves.token1, pair)?;

        let amount0 = mul_div(liquidity, balance0, reserves.total_supply, Rounding::Floor)?;
        let amount1 = mul_div(liquidity, balance1, reserves.total_supply, Rounding::Floor)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(VaultError::InsufficientLiquidity { pool: pair });
        }

        self.token_mut(pair)?.burn(pair, liquidity)?;
        self.transfer(reserves.token0, pair, to, amount0)?;
        self.transfer(reserves.token1, pair, to, amount1)?;
        self.sync_pair(pair)?;
        Ok((amount0, amount1))
    }

    /// Low-level swap: send the outputs, then verify the fee-adjusted
    /// invariant against whatever was paid in
    pub fn pair_swap(
        &mut self,
        pair: Address,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    ) -> VaultResult<()> {
        let reserves = self.pair_reserves(pair)?;
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(VaultError::ZeroAssets);
        }
        if amount0_out >= reserves.reserve0 || amount1_out >= reserves.reserve1 {
            return Err(VaultError::InsufficientLiquidity { pool: pair });
        }

        if !amount0_out.is_zero() {
            self.transfer(reserves.token0, pair, to, amount0_out)?;
        }
        if !amount1_out.is_zero() {
            self.transfer(reserves.token1, pair, to, amount1_out)?;
        }

        let balance0 = self.balance_of(reserves.token0, pair)?;
        let balance1 = self.balance_of(reserves.token1, pair)?;
        let amount0_in = balance0.saturating_sub(sub(reserves.reserve0, amount0_out)?);
        let amount1_in = balance1.saturating_sub(sub(reserves.reserve1, amount1_out)?);
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(VaultError::ZeroAmount);
        }

        let fee = U256::from(FEE_DENOMINATOR - FEE_NUMERATOR);
        let scale = U256::from(FEE_DENOMINATOR);
        let adjusted0 = sub(mul(balance0, scale)?, mul(amount0_in, fee)?)?;
        let adjusted1 = sub(mul(balance1, scale)?, mul(amount1_in, fee)?)?;
        let k_before = mul(mul(reserves.reserve0, reserves.reserve1)?, mul(scale, scale)?)?;
        if mul(adjusted0, adjusted1)? < k_before {
            return Err(VaultError::InsufficientLiquidity { pool: pair });
        }

        self.sync_pair(pair)
    }

    /// Router `addLiquidity` in token0/token1 order.
    ///
    /// Deposits at the current pool ratio, using as much of the desired
    /// amounts as possible; any side falling under its minimum is a slippage
    /// violation. Returns `(amount0, amount1, liquidity)`.
    pub fn add_liquidity(
        &mut self,
        account: Address,
        pair: Address,
        amount0_desired: U256,
        amount1_desired: U256,
        amount0_min: U256,
        amount1_min: U256,
    ) -> VaultResult<(U256, U256, U256)> {
        let reserves = self.pair_reserves(pair)?;

        let (amount0, amount1) = math::liquidity_amounts(
            amount0_desired,
            amount1_desired,
            reserves.reserve0,
            reserves.reserve1,
        )?;
        if amount0 < amount0_min {
            return Err(VaultError::SlippageViolation {
                actual: amount0,
                bound: amount0_min,
            });
        }
        if amount1 < amount1_min {
            return Err(VaultError::SlippageViolation {
                actual: amount1,
                bound: amount1_min,
            });
        }

        self.transfer(reserves.token0, account, pair, amount0)?;
        self.transfer(reserves.token1, account, pair, amount1)?;
        let liquidity = self.pair_mint(pair, account)?;
        Ok((amount0, amount1, liquidity))
    }

    /// Router `removeLiquidity` in token0/token1 order
    pub fn remove_liquidity(
        &mut self,
        account: Address,
        pair: Address,
        liquidity: U256,
        amount0_min: U256,
        amount1_min: U256,
    ) -> VaultResult<(U256, U256)> {
        self.transfer(pair, account, pair, liquidity)?;
        let (amount0, amount1) = self.pair_burn(pair, account)?;
        if amount0 < amount0_min {
            return Err(VaultError::SlippageViolation {
                actual: amount0,
                bound: amount0_min,
            });
        }
        if amount1 < amount1_min {
            return Err(VaultError::SlippageViolation {
                actual: amount1,
                bound: amount1_min,
            });
        }
        Ok((amount0, amount1))
    }

    /// Seed a fresh pair with liquidity from a faucet, returning the LP minted
    pub fn seed_pair(&mut self, pair: Address, amount0: U256, amount1: U256) -> VaultResult<U256> {
        let reserves = self.pair_reserves(pair)?;
        let lp = self.new_address();
        self.mint(reserves.token0, lp, amount0)?;
        self.mint(reserves.token1, lp, amount1)?;
        let (_, _, liquidity) = self.add_liquidity(lp, pair, amount0, amount1, U256::ZERO, U256::ZERO)?;
        Ok(liquidity)
    }
}

impl SwapExecutor for Chain {
    fn execute(
        &mut self,
        account: Address,
        amount_in: U256,
        token_in: Address,
        token_out: Address,
        pool: Address,
    ) -> VaultResult<U256> {
        let reserves = self.pair_reserves(pool)?;
        if reserves.other(token_in)? != token_out {
            return Err(VaultError::InvalidRoute {
                from: token_in,
                to: token_out,
            });
        }
        if amount_in.is_zero() {
            return Err(VaultError::ZeroAmount);
        }

        let (reserve_in, reserve_out) = reserves.oriented(token_in)?;
        let amount_out = Self::quote(amount_in, reserve_in, reserve_out)?;
        if amount_out.is_zero() {
            return Err(VaultError::InsufficientLiquidity { pool });
        }

        self.transfer(token_in, account, pool, amount_in)?;
        let (amount0_out, amount1_out) = if token_out == reserves.token0 {
            (amount_out, U256::ZERO)
        } else {
            (U256::ZERO, amount_out)
        };
        self.pair_swap(pool, amount0_out, amount1_out, account)?;
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    fn setup() -> (Chain, Address, Address, Address) {
        let mut chain = Chain::default();
        let dai = chain.deploy_token("DAI", 18);
        let usdc = chain.deploy_token("USDC", 18);
        let pair = chain.deploy_pair(dai, usdc).unwrap();
        chain.seed_pair(pair, u(1_000_000), u(1_000_000)).unwrap();
        (chain, dai, usdc, pair)
    }

    #[test]
    fn test_first_mint_locks_minimum_liquidity() {
        let (chain, _dai, _usdc, pair) = setup();
        let reserves = chain.pair_reserves(pair).unwrap();
        assert_eq!(reserves.total_supply, u(1_000_000));
        assert_eq!(chain.balance_of(pair, Address::ZERO).unwrap(), u(MINIMUM_LIQUIDITY));
        assert_eq!(reserves.reserve0, u(1_000_000));
        assert_eq!(reserves.reserve1, u(1_000_000));
    }

    #[test]
    fn test_swap_matches_quote_and_keeps_invariant() {
        let (mut chain, dai, usdc, pair) = setup();
        let trader = chain.new_address();
        chain.mint(dai, trader, u(10_000)).unwrap();

        let before = chain.pair_reserves(pair).unwrap();
        let out = chain.execute(trader, u(10_000), dai, usdc, pair).unwrap();
        let (r_in, r_out) = before.oriented(dai).unwrap();
        assert_eq!(out, math::get_amount_out(u(10_000), r_in, r_out).unwrap());
        assert_eq!(chain.balance_of(usdc, trader).unwrap(), out);

        let after = chain.pair_reserves(pair).unwrap();
        assert!(after.reserve0 * after.reserve1 >= before.reserve0 * before.reserve1);
    }

    #[test]
    fn test_swap_rejects_foreign_token() {
        let (mut chain, dai, _usdc, pair) = setup();
        let weth = chain.deploy_token("WETH", 18);
        let trader = chain.new_address();
        chain.mint(dai, trader, u(100)).unwrap();
        assert!(matches!(
            chain.execute(trader, u(100), dai, weth, pair),
            Err(VaultError::InvalidRoute { .. })
        ));
    }

    #[test]
    fn test_add_and_remove_liquidity() {
        let (mut chain, dai, usdc, pair) = setup();
        let reserves = chain.pair_reserves(pair).unwrap();
        let lp = chain.new_address();
        chain.mint(dai, lp, u(1_000)).unwrap();
        chain.mint(usdc, lp, u(2_000)).unwrap();

        let (a0, a1, liquidity) = chain
            .add_liquidity(lp, pair, u(1_000), u(2_000), U256::ZERO, U256::ZERO)
            .unwrap();
        assert_eq!((a0, a1), (u(1_000), u(1_000)));
        assert_eq!(liquidity, u(1_000));
        let (token0_left, token1_left) = if reserves.token0 == dai {
            (u(0), u(1_000))
        } else {
            (u(1_000), u(0))
        };
        assert_eq!(chain.balance_of(reserves.token0, lp).unwrap(), token0_left);
        assert_eq!(chain.balance_of(reserves.token1, lp).unwrap(), token1_left);

        let (out0, out1) = chain
            .remove_liquidity(lp, pair, liquidity, u(999), u(999))
            .unwrap();
        assert_eq!((out0, out1), (u(1_000), u(1_000)));
    }

    #[test]
    fn test_remove_liquidity_slippage() {
        let (mut chain, dai, usdc, pair) = setup();
        let lp = chain.new_address();
        chain.mint(dai, lp, u(1_000)).unwrap();
        chain.mint(usdc, lp, u(1_000)).unwrap();
        let (_, _, liquidity) = chain
            .add_liquidity(lp, pair, u(1_000), u(1_000), U256::ZERO, U256::ZERO)
            .unwrap();

        assert!(matches!(
            chain.remove_liquidity(lp, pair, liquidity, u(1_001), U256::ZERO),
            Err(VaultError::SlippageViolation { .. })
        ));
    }
}
