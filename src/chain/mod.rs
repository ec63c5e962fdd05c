//! In-memory EVM-style ledger the vaults run against
//!
//! The [`Chain`] owns every external collaborator a vault talks to: ERC20
//! tokens, lending pools, constant-product pairs and rewards controllers,
//! plus the block clock and the event log. Vaults only reach it through the
//! capability traits defined here ([`FungibleLedger`], [`SwapExecutor`],
//! [`RewardsSource`]) and the venue adapters in [`crate::venue`].
//!
//! `Chain` is `Clone` so an entry point can snapshot it and roll back on
//! failure, which is how a reverted transaction behaves on a real ledger.

mod lending;
mod pair;
mod rewards;
mod token;

pub use lending::LendingPool;
pub use pair::Pair;
pub use rewards::RewardsController;
pub use token::{ray_div, ray_mul, Token};

use std::collections::HashMap;

use alloy::primitives::{Address, Log, U256};
use alloy::sol_types::SolEvent;

use crate::error::{VaultError, VaultResult};
use crate::math;

/// ERC20 surface the vault protocol needs
pub trait FungibleLedger {
    fn balance_of(&self, token: Address, owner: Address) -> VaultResult<U256>;

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: U256)
        -> VaultResult<()>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance unless it is the unlimited sentinel
    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> VaultResult<()>;

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> VaultResult<()>;
}

/// Single-hop exchange against a named constant-product pool
pub trait SwapExecutor {
    /// Pure constant-product quote with the 0.3% fee
    fn quote(amount_in: U256, reserve_in: U256, reserve_out: U256) -> VaultResult<U256>
    where
        Self: Sized,
    {
        math::get_amount_out(amount_in, reserve_in, reserve_out)
    }

    /// Swap `amount_in` of `token_in` held by `account` for `token_out`
    /// through `pool`; the output is credited to `account`
    fn execute(
        &mut self,
        account: Address,
        amount_in: U256,
        token_in: Address,
        token_out: Address,
        pool: Address,
    ) -> VaultResult<U256>;
}

/// External incentives accrued by a position
pub trait RewardsSource {
    /// Claim everything `holder` accrued on `positions`, paying `recipient`
    fn claim(
        &mut self,
        controller: Address,
        positions: &[Address],
        holder: Address,
        recipient: Address,
    ) -> VaultResult<U256>;

    fn unclaimed_balance(
        &self,
        controller: Address,
        position: Address,
        holder: Address,
    ) -> VaultResult<U256>;

    fn reward_token(&self, controller: Address) -> VaultResult<Address>;
}

/// Simulated ledger state
#[derive(Debug, Clone, Default)]
pub struct Chain {
    timestamp: u64,
    next_address: u64,
    tokens: HashMap<Address, Token>,
    lending_pools: HashMap<Address, LendingPool>,
    pairs: HashMap<Address, Pair>,
    controllers: HashMap<Address, RewardsController>,
    logs: Vec<Log>,
}

impl Chain {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    // ========== Clock ==========

    /// Current block timestamp
    pub fn now(&self) -> u64 {
        self.timestamp
    }

    /// Advance the clock by `seconds`
    pub fn warp(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }

    // ========== Accounts ==========

    /// Allocate a fresh, deterministic address
    pub fn new_address(&mut self) -> Address {
        self.next_address += 1;
        let mut bytes = [0u8; 20];
        bytes[0] = 0xc0;
        bytes[12..].copy_from_slice(&self.next_address.to_be_bytes());
        Address::from(bytes)
    }

    // ========== Tokens ==========

    pub fn deploy_token(&mut self, symbol: impl Into<String>, decimals: u8) -> Address {
        let address = self.new_address();
        self.tokens.insert(address, Token::new(symbol, decimals));
        address
    }

    pub(crate) fn insert_token(&mut self, address: Address, token: Token) {
        self.tokens.insert(address, token);
    }

    pub fn token(&self, address: Address) -> VaultResult<&Token> {
        self.tokens
            .get(&address)
            .ok_or(VaultError::UnknownToken(address))
    }

    pub(crate) fn token_mut(&mut self, address: Address) -> VaultResult<&mut Token> {
        self.tokens
            .get_mut(&address)
            .ok_or(VaultError::UnknownToken(address))
    }

    /// Faucet: create `amount` of `token` out of thin air for `to`
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> VaultResult<()> {
        self.token_mut(token)?.mint(to, amount)
    }

    pub fn total_supply(&self, token: Address) -> VaultResult<U256> {
        Ok(self.token(token)?.total_supply())
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> VaultResult<U256> {
        Ok(self.token(token)?.allowance(owner, spender))
    }

    // ========== Events ==========

    pub fn emit<E: SolEvent>(&mut self, emitter: Address, event: &E) {
        self.logs.push(Log {
            address: emitter,
            data: event.encode_log_data(),
        });
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Decoded events of type `E` emitted by `emitter`
    pub fn events<E: SolEvent>(&self, emitter: Address) -> Vec<E> {
        self.logs
            .iter()
            .filter(|log| log.address == emitter)
            .filter(|log| log.data.topics().first() == Some(&E::SIGNATURE_HASH))
            .filter_map(|log| E::decode_log_data(&log.data).ok())
            .collect()
    }
}

impl FungibleLedger for Chain {
    fn balance_of(&self, token: Address, owner: Address) -> VaultResult<U256> {
        Ok(self.token(token)?.balance_of(owner))
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> VaultResult<()> {
        self.token_mut(token)?.transfer(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> VaultResult<()> {
        let ledger = self.token_mut(token)?;
        if spender != from {
            ledger.spend_allowance(from, spender, amount)?;
        }
        ledger.transfer(from, to, amount)
    }

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> VaultResult<()> {
        self.token_mut(token)?.approve(owner, spender, amount);
        Ok(())
    }
}
