//! Tokenized vault over a position venue
//!
//! [`Vault`] is one generic implementation of the ERC-4626 surface for every
//! venue. It owns the share ledger, the unlock requests and the manager
//! configuration; everything else (the custodied position, pool reserves,
//! reward balances) is read back from the [`Chain`] on every call so that
//! `total_assets` always reflects the live position.
//!
//! Every mutating entry point takes the chain by `&mut` and runs atomically:
//! on error both the vault and the chain are restored to their state before
//! the call.

mod harvest;
mod protocol;
#[cfg(test)]
mod testing;
mod timelock;

pub use harvest::HarvestReport;

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use crate::chain::{Chain, RewardsSource, Token};
use crate::config::VaultParams;
use crate::engine::{ConversionEngine, Snapshot, Topology};
use crate::error::{VaultError, VaultResult};
use crate::math::Rounding;
use crate::types::{SwapRoute, UnlockRequest, VaultPosition};
use crate::venue::{HookContext, PositionVenue};

#[derive(Debug, Clone)]
pub struct Vault<V: PositionVenue> {
    address: Address,
    venue: V,
    engine: ConversionEngine,
    shares: Token,
    params: VaultParams,
    route: Option<SwapRoute>,
    rewards_controller: Option<Address>,
    unlock_requests: HashMap<Address, UnlockRequest>,
    next_request_id: u64,
}

impl<V: PositionVenue> Vault<V> {
    /// Deploy a vault over `venue`, allocating its address on `chain`
    pub fn new(chain: &mut Chain, venue: V, params: VaultParams) -> VaultResult<Self> {
        params.validate()?;

        let asset = chain.token(venue.asset())?;
        let shares = Token::new(format!("v{}", asset.symbol), asset.decimals);
        let engine = ConversionEngine::new(venue.topology(), venue.asset())
            .with_division_order(params.division_order);
        let address = chain.new_address();

        tracing::info!(
            "Deployed {:?} vault {} over asset {}",
            venue.topology(),
            address,
            venue.asset()
        );

        Ok(Self {
            address,
            venue,
            engine,
            shares,
            params,
            route: None,
            rewards_controller: None,
            unlock_requests: HashMap::new(),
            next_request_id: 1,
        })
    }

    /// Attach the incentives controller rewards are harvested from
    pub fn with_rewards_controller(mut self, controller: Address) -> Self {
        self.rewards_controller = Some(controller);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn asset(&self) -> Address {
        self.venue.asset()
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn topology(&self) -> Topology {
        self.engine.topology
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.engine
    }

    pub fn params(&self) -> &VaultParams {
        &self.params
    }

    pub fn route(&self) -> Option<SwapRoute> {
        self.route
    }

    pub fn symbol(&self) -> &str {
        &self.shares.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.shares.decimals
    }

    // ========== Share ledger ==========

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.shares.balance_of(owner)
    }

    pub fn total_supply(&self) -> U256 {
        self.shares.total_supply()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.shares.allowance(owner, spender)
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.shares.approve(owner, spender, amount);
    }

    /// Move shares between holders; shares earmarked by an unlock request
    /// cannot move
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> VaultResult<()> {
        self.ensure_free(from, amount)?;
        self.shares.transfer(from, to, amount)
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> VaultResult<()> {
        self.ensure_free(from, amount)?;
        let mut shares = self.shares.clone();
        if spender != from {
            shares.spend_allowance(from, spender, amount)?;
        }
        shares.transfer(from, to, amount)?;
        self.shares = shares;
        Ok(())
    }

    fn ensure_free(&self, owner: Address, amount: U256) -> VaultResult<()> {
        let earmarked = self.earmarked(owner);
        if earmarked.is_zero() {
            return Ok(());
        }
        let free = self.balance_of(owner).saturating_sub(earmarked);
        if amount > free {
            return Err(VaultError::SharesEarmarked { earmarked, free });
        }
        Ok(())
    }

    // ========== Accounting views ==========

    /// Live position held by the vault, in position units
    pub fn total_assets(&self, chain: &Chain) -> VaultResult<U256> {
        self.venue.total_assets(chain, self.address)
    }

    pub(crate) fn snapshot(&self, chain: &Chain) -> VaultResult<Snapshot> {
        Ok(Snapshot {
            total_assets: self.total_assets(chain)?,
            total_supply: self.total_supply(),
            pool: self.venue.pool_reserves(chain)?,
        })
    }

    /// Shares worth `assets` position units (rounded down).
    ///
    /// Position units are what [`Vault::total_assets`] counts: the LP token
    /// for both LP topologies, not the pair token a single-sided depositor
    /// pays in. Use [`Vault::preview_deposit`] for the latter.
    pub fn convert_to_shares(&self, chain: &Chain, assets: U256) -> VaultResult<U256> {
        self.engine
            .convert_to_shares(&self.snapshot(chain)?, assets, Rounding::Floor)
    }

    /// Position units backing `shares` (rounded down); see
    /// [`Vault::convert_to_shares`] for the unit
    pub fn convert_to_assets(&self, chain: &Chain, shares: U256) -> VaultResult<U256> {
        self.engine
            .convert_to_assets(&self.snapshot(chain)?, shares, Rounding::Floor)
    }

    /// Shares minted for `assets` of [`Vault::asset`], the token a depositor
    /// pays in
    pub fn preview_deposit(&self, chain: &Chain, assets: U256) -> VaultResult<U256> {
        self.engine.preview_deposit(&self.snapshot(chain)?, assets)
    }

    /// Deposit-token amount needed to mint `shares`
    pub fn preview_mint(&self, chain: &Chain, shares: U256) -> VaultResult<U256> {
        self.engine.preview_mint(&self.snapshot(chain)?, shares)
    }

    /// Shares burned to pay out `assets` of the deposit token
    pub fn preview_withdraw(&self, chain: &Chain, assets: U256) -> VaultResult<U256> {
        self.engine.preview_withdraw(&self.snapshot(chain)?, assets)
    }

    /// Deposit-token amount paid out for `shares`; for a single-sided LP vault
    /// this is the value after unwinding and swapping back
    pub fn preview_redeem(&self, chain: &Chain, shares: U256) -> VaultResult<U256> {
        self.engine.preview_redeem(&self.snapshot(chain)?, shares)
    }

    // ========== Capacity ==========

    pub fn max_deposit(&self, chain: &Chain, _receiver: Address) -> VaultResult<U256> {
        self.venue.max_deposit(chain)
    }

    pub fn max_mint(&self, chain: &Chain, receiver: Address) -> VaultResult<U256> {
        let max_assets = self.max_deposit(chain, receiver)?;
        if max_assets == U256::MAX || max_assets.is_zero() {
            return Ok(max_assets);
        }
        self.engine
            .convert_to_shares(&self.snapshot(chain)?, max_assets, Rounding::Floor)
    }

    /// Shares `owner` can redeem right now: unlocked shares, capped by what
    /// the venue can pay out
    pub fn max_redeem(&self, chain: &Chain, owner: Address) -> VaultResult<U256> {
        let redeemable = self.unlocked_shares(chain, owner);
        if redeemable.is_zero() {
            return Ok(U256::ZERO);
        }

        let liquidity = self.venue.available_liquidity(chain)?;
        if liquidity == U256::MAX {
            return Ok(redeemable);
        }
        let liquid_shares =
            self.engine
                .convert_to_shares(&self.snapshot(chain)?, liquidity, Rounding::Floor)?;
        Ok(redeemable.min(liquid_shares))
    }

    pub fn max_withdraw(&self, chain: &Chain, owner: Address) -> VaultResult<U256> {
        let shares = self.max_redeem(chain, owner)?;
        if shares.is_zero() {
            return Ok(U256::ZERO);
        }
        self.preview_redeem(chain, shares)
    }

    // ========== Rewards ==========

    /// Rewards accrued to the vault's position and not yet harvested
    pub fn unclaimed_rewards(&self, chain: &Chain) -> VaultResult<U256> {
        match self.rewards_controller {
            Some(controller) => {
                chain.unclaimed_balance(controller, self.venue.position_token(), self.address)
            }
            None => Ok(U256::ZERO),
        }
    }

    /// Holder summary
    pub fn position(&self, chain: &Chain, owner: Address) -> VaultResult<VaultPosition> {
        let shares = self.balance_of(owner);
        let assets = if shares.is_zero() {
            U256::ZERO
        } else {
            self.preview_redeem(chain, shares)?
        };
        Ok(VaultPosition {
            shares,
            assets,
            earmarked: self.earmarked(owner),
        })
    }

    // ========== Internals ==========

    fn hook_context(&self, depositor: Address) -> HookContext {
        HookContext {
            vault: self.address,
            depositor,
            slippage_bps: self.params.liquidity_slippage_bps,
        }
    }

    fn ensure_manager(&self, caller: Address) -> VaultResult<()> {
        if caller != self.params.manager {
            return Err(VaultError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Run `op` as one transaction: on error, the vault and chain are put
    /// back exactly as they were
    fn atomic<T>(
        &mut self,
        chain: &mut Chain,
        op: impl FnOnce(&mut Self, &mut Chain) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let vault_before = self.clone();
        let chain_before = chain.clone();

        match op(self, chain) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!("Vault {} call reverted: {}", self.address, err);
                *self = vault_before;
                *chain = chain_before;
                Err(err)
            }
        }
    }
}
