//! Aave-style lending pool with a rebasing receipt token

use alloy::primitives::{Address, U256};

use super::{Chain, FungibleLedger, Token};
use crate::constants::{ray, BPS_DENOMINATOR};
use crate::error::{VaultError, VaultResult};
use crate::math::{add, mul_div, sub, Rounding};
use crate::types::ReserveStatus;

/// One reserve of a lending market.
///
/// Suppliers receive the rebasing receipt token 1:1; the pool's idle cash is
/// its balance of the underlying asset.
#[derive(Debug, Clone)]
pub struct LendingPool {
    pub asset: Address,
    pub receipt_token: Address,
    pub active: bool,
    pub frozen: bool,
    pub paused: bool,
    pub supply_cap: Option<U256>,
}

impl Chain {
    /// Deploy a reserve for `asset`, returning `(pool, receipt_token)`
    pub fn deploy_lending_pool(
        &mut self,
        asset: Address,
        receipt_symbol: impl Into<String>,
    ) -> VaultResult<(Address, Address)> {
        let decimals = self.token(asset)?.decimals;
        let pool = self.new_address();
        let receipt_token = self.new_address();
        self.insert_token(receipt_token, Token::rebasing(receipt_symbol, decimals));
        self.lending_pools.insert(
            pool,
            LendingPool {
                asset,
                receipt_token,
                active: true,
                frozen: false,
                paused: false,
                supply_cap: None,
            },
        );
        Ok((pool, receipt_token))
    }

    pub fn lending_pool(&self, pool: Address) -> VaultResult<&LendingPool> {
        self.lending_pools
            .get(&pool)
            .ok_or(VaultError::UnknownPool(pool))
    }

    fn lending_pool_mut(&mut self, pool: Address) -> VaultResult<&mut LendingPool> {
        self.lending_pools
            .get_mut(&pool)
            .ok_or(VaultError::UnknownPool(pool))
    }

    pub fn reserve_status(&self, pool: Address) -> VaultResult<ReserveStatus> {
        let reserve = self.lending_pool(pool)?;
        Ok(ReserveStatus {
            active: reserve.active,
            frozen: reserve.frozen,
            paused: reserve.paused,
            supply_cap: reserve.supply_cap,
            available_liquidity: self.balance_of(reserve.asset, pool)?,
        })
    }

    pub fn set_reserve_flags(
        &mut self,
        pool: Address,
        active: bool,
        frozen: bool,
        paused: bool,
    ) -> VaultResult<()> {
        let reserve = self.lending_pool_mut(pool)?;
        reserve.active = active;
        reserve.frozen = frozen;
        reserve.paused = paused;
        Ok(())
    }

    pub fn set_supply_cap(&mut self, pool: Address, cap: Option<U256>) -> VaultResult<()> {
        self.lending_pool_mut(pool)?.supply_cap = cap;
        Ok(())
    }

    /// Supply `amount` of the underlying from `from`, crediting receipt
    /// tokens to `on_behalf_of`
    pub fn lending_supply(
        &mut self,
        pool: Address,
        from: Address,
        amount: U256,
        on_behalf_of: Address,
    ) -> VaultResult<()> {
        if amount.is_zero() {
            return Err(VaultError::ZeroAmount);
        }
        let status = self.reserve_status(pool)?;
        if !status.accepts_deposits() {
            return Err(VaultError::CapacityExceeded {
                requested: amount,
                max: U256::ZERO,
            });
        }
        let reserve = self.lending_pool(pool)?.clone();
        if let Some(cap) = reserve.supply_cap {
            let supplied = self.total_supply(reserve.receipt_token)?;
            let room = cap.saturating_sub(supplied);
            if amount > room {
                return Err(VaultError::CapacityExceeded {
                    requested: amount,
                    max: room,
                });
            }
        }

        self.transfer(reserve.asset, from, pool, amount)?;
        self.mint(reserve.receipt_token, on_behalf_of, amount)
    }

    /// Redeem `amount` of receipt tokens held by `owner` for the underlying,
    /// paid to `to`
    pub fn lending_withdraw(
        &mut self,
        pool: Address,
        owner: Address,
        amount: U256,
        to: Address,
    ) -> VaultResult<()> {
        if amount.is_zero() {
            return Err(VaultError::ZeroAmount);
        }
        let status = self.reserve_status(pool)?;
        if !status.allows_withdrawals() {
            return Err(VaultError::CapacityExceeded {
                requested: amount,
                max: U256::ZERO,
            });
        }
        if amount > status.available_liquidity {
            return Err(VaultError::InsufficientLiquidity { pool });
        }

        let reserve = self.lending_pool(pool)?.clone();
        self.token_mut(reserve.receipt_token)?.burn(owner, amount)?;
        self.transfer(reserve.asset, pool, to, amount)
    }

    /// Lend out `amount` of idle cash to `borrower`, shrinking what suppliers
    /// can withdraw
    pub fn lending_borrow(&mut self, pool: Address, amount: U256, borrower: Address) -> VaultResult<()> {
        let asset = self.lending_pool(pool)?.asset;
        self.transfer(asset, pool, borrower, amount)
    }

    /// Grow the liquidity index by `bps` and fund the pool with the matching
    /// interest so receipts stay fully backed
    pub fn accrue_interest(&mut self, pool: Address, bps: u64) -> VaultResult<()> {
        let reserve = self.lending_pool(pool)?.clone();
        let before = self.total_supply(reserve.receipt_token)?;

        let receipt = self.token_mut(reserve.receipt_token)?;
        let index = mul_div(
            receipt.index(),
            add(U256::from(BPS_DENOMINATOR), U256::from(bps))?,
            U256::from(BPS_DENOMINATOR),
            Rounding::Floor,
        )?;
        receipt.set_index(index.max(ray()));

        let after = self.total_supply(reserve.receipt_token)?;
        let interest = sub(after, before)?;
        if !interest.is_zero() {
            self.mint(reserve.asset, pool, interest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    fn setup() -> (Chain, Address, Address, Address, Address) {
        let mut chain = Chain::default();
        let usdc = chain.deploy_token("USDC", 6);
        let (pool, a_usdc) = chain.deploy_lending_pool(usdc, "aUSDC").unwrap();
        let user = chain.new_address();
        chain.mint(usdc, user, u(10_000)).unwrap();
        (chain, usdc, pool, a_usdc, user)
    }

    #[test]
    fn test_supply_and_withdraw() {
        let (mut chain, usdc, pool, a_usdc, user) = setup();
        chain.lending_supply(pool, user, u(1_000), user).unwrap();
        assert_eq!(chain.balance_of(a_usdc, user).unwrap(), u(1_000));
        assert_eq!(chain.balance_of(usdc, pool).unwrap(), u(1_000));

        chain.lending_withdraw(pool, user, u(400), user).unwrap();
        assert_eq!(chain.balance_of(a_usdc, user).unwrap(), u(600));
        assert_eq!(chain.balance_of(usdc, user).unwrap(), u(9_400));
    }

    #[test]
    fn test_interest_rebases_receipts() {
        let (mut chain, usdc, pool, a_usdc, user) = setup();
        chain.lending_supply(pool, user, u(1_000), user).unwrap();
        chain.accrue_interest(pool, 100).unwrap();

        assert_eq!(chain.balance_of(a_usdc, user).unwrap(), u(1_010));
        assert_eq!(chain.balance_of(usdc, pool).unwrap(), u(1_010));
        chain.lending_withdraw(pool, user, u(1_010), user).unwrap();
    }

    #[test]
    fn test_frozen_and_paused_reserves() {
        let (mut chain, _usdc, pool, _a_usdc, user) = setup();
        chain.lending_supply(pool, user, u(100), user).unwrap();

        chain.set_reserve_flags(pool, true, true, false).unwrap();
        assert!(chain.lending_supply(pool, user, u(1), user).is_err());
        // frozen reserves still allow exits
        chain.lending_withdraw(pool, user, u(10), user).unwrap();

        chain.set_reserve_flags(pool, true, false, true).unwrap();
        assert!(chain.lending_withdraw(pool, user, u(10), user).is_err());
    }

    #[test]
    fn test_supply_cap_and_cash() {
        let (mut chain, _usdc, pool, _a_usdc, user) = setup();
        chain.set_supply_cap(pool, Some(u(500))).unwrap();
        assert!(matches!(
            chain.lending_supply(pool, user, u(501), user),
            Err(VaultError::CapacityExceeded { .. })
        ));
        chain.lending_supply(pool, user, u(500), user).unwrap();

        let borrower = chain.new_address();
        chain.lending_borrow(pool, u(450), borrower).unwrap();
        assert_eq!(
            chain.lending_withdraw(pool, user, u(100), user),
            Err(VaultError::InsufficientLiquidity { pool })
        );
    }
}
