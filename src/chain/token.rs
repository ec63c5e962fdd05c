//! ERC20 ledger, optionally rebasing through a liquidity index

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use crate::constants::{half_ray, ray};
use crate::error::{VaultError, VaultResult};
use crate::math::{add, mul, sub};

/// `a * b / RAY`, rounded half up
pub fn ray_mul(a: U256, b: U256) -> VaultResult<U256> {
    Ok(add(mul(a, b)?, half_ray())? / ray())
}

/// `a * RAY / b`, rounded half up
pub fn ray_div(a: U256, b: U256) -> VaultResult<U256> {
    if b.is_zero() {
        return Err(VaultError::DivisionByZero);
    }
    Ok(add(mul(a, ray())?, b / U256::from(2u64))? / b)
}

/// Fungible token balances and allowances.
///
/// A rebasing token stores scaled balances and reports
/// `scaled * index / RAY`, so yield accrues to every holder when the index
/// grows without any transfer.
#[derive(Debug, Clone)]
pub struct Token {
    pub symbol: String,
    pub decimals: u8,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    total_supply: U256,
    index: Option<U256>,
}

impl Token {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: U256::ZERO,
            index: None,
        }
    }

    /// Rebasing token starting at an index of one ray
    pub fn rebasing(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            index: Some(ray()),
            ..Self::new(symbol, decimals)
        }
    }

    pub fn is_rebasing(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> U256 {
        self.index.unwrap_or_else(ray)
    }

    pub(crate) fn set_index(&mut self, index: U256) {
        if self.index.is_some() {
            self.index = Some(index);
        }
    }

    fn to_scaled(&self, amount: U256) -> VaultResult<U256> {
        match self.index {
            Some(index) => ray_div(amount, index),
            None => Ok(amount),
        }
    }

    fn from_scaled(&self, scaled: U256) -> U256 {
        match self.index {
            Some(index) => ray_mul(scaled, index).unwrap_or(U256::MAX),
            None => scaled,
        }
    }

    fn scaled_balance(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.from_scaled(self.scaled_balance(owner))
    }

    pub fn total_supply(&self) -> U256 {
        self.from_scaled(self.total_supply)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Consume `amount` of `spender`'s allowance over `owner`.
    ///
    /// `U256::MAX` is the unlimited sentinel and is never decremented.
    pub fn spend_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> VaultResult<()> {
        let allowance = self.allowance(owner, spender);
        if allowance == U256::MAX {
            return Ok(());
        }
        if allowance < amount {
            return Err(VaultError::InsufficientAllowance {
                allowance,
                required: amount,
            });
        }
        self.allowances.insert((owner, spender), allowance - amount);
        Ok(())
    }

    /// Take up to `amount` worth of scaled balance from `owner`
    fn debit(&mut self, owner: Address, amount: U256) -> VaultResult<U256> {
        let balance = self.balance_of(owner);
        if balance < amount {
            return Err(VaultError::InsufficientBalance {
                balance,
                required: amount,
            });
        }
        let held = self.scaled_balance(owner);
        let scaled = self.to_scaled(amount)?.min(held);
        self.balances.insert(owner, held - scaled);
        Ok(scaled)
    }

    fn credit(&mut self, owner: Address, scaled: U256) -> VaultResult<()> {
        let held = self.scaled_balance(owner);
        self.balances.insert(owner, add(held, scaled)?);
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> VaultResult<()> {
        let scaled = self.debit(from, amount)?;
        self.credit(to, scaled)
    }

    pub fn mint(&mut self, to: Address, amount: U256) -> VaultResult<()> {
        let scaled = self.to_scaled(amount)?;
        self.total_supply = add(self.total_supply, scaled)?;
        self.credit(to, scaled)
    }

    pub fn burn(&mut self, from: Address, amount: U256) -> VaultResult<()> {
        let scaled = self.debit(from, amount)?;
        self.total_supply = sub(self.total_supply, scaled)?;
        Ok(())
    }
}
