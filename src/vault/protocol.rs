//! Deposit / withdraw protocol
//!
//! Entry: convert, pull tokens, hand them to the venue, mint against the
//! position actually gained. Exit: timelock gate, capacity, allowance, burn,
//! unwind through the venue, pay out. Shares are burned before the venue is
//! touched.

use alloy::primitives::{Address, U256};

use super::Vault;
use crate::chain::{Chain, FungibleLedger};
use crate::contracts::{Deposit, Withdraw};
use crate::engine::{Snapshot, Topology};
use crate::error::{VaultError, VaultResult};
use crate::math::Rounding;
use crate::types::{Inflow, Payout};
use crate::venue::PositionVenue;

impl<V: PositionVenue> Vault<V> {
    /// Deposit `assets` from `caller`, minting shares to `receiver`.
    ///
    /// `assets` is in [`Vault::asset`] units: the lending or staking token,
    /// the single pair token of a single-sided LP vault, or LP tokens whose
    /// backing pair tokens are pulled for a dual-asset vault.
    ///
    /// Fails with `SlippageViolation` if fewer than `min_shares_out` shares
    /// would be minted.
    pub fn deposit(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        receiver: Address,
        assets: U256,
        min_shares_out: U256,
    ) -> VaultResult<U256> {
        self.atomic(chain, |vault, chain| {
            if assets.is_zero() {
                return Err(VaultError::ZeroAssets);
            }
            let max = vault.max_deposit(chain, receiver)?;
            if assets > max {
                return Err(VaultError::CapacityExceeded {
                    requested: assets,
                    max,
                });
            }

            let snapshot = vault.snapshot(chain)?;
            if vault.engine.preview_deposit(&snapshot, assets)?.is_zero() {
                return Err(VaultError::ZeroShares);
            }

            let gained = vault.enter(chain, caller, &snapshot, assets)?;
            let shares = vault
                .engine
                .convert_to_shares(&snapshot, gained, Rounding::Floor)?;
            if shares.is_zero() {
                return Err(VaultError::ZeroShares);
            }
            if shares < min_shares_out {
                return Err(VaultError::SlippageViolation {
                    actual: shares,
                    bound: min_shares_out,
                });
            }

            vault.finish_deposit(chain, caller, receiver, assets, shares)?;
            Ok(shares)
        })
    }

    /// Mint exactly `shares` to `receiver`, pulling the required assets from
    /// `caller`.
    ///
    /// Fails with `SlippageViolation` if that takes more than `max_assets_in`.
    pub fn mint(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        receiver: Address,
        shares: U256,
        max_assets_in: U256,
    ) -> VaultResult<U256> {
        self.atomic(chain, |vault, chain| {
            if shares.is_zero() {
                return Err(VaultError::ZeroShares);
            }
            let max = vault.max_mint(chain, receiver)?;
            if shares > max {
                return Err(VaultError::CapacityExceeded {
                    requested: shares,
                    max,
                });
            }

            let snapshot = vault.snapshot(chain)?;
            let assets = vault.engine.preview_mint(&snapshot, shares)?;
            if assets.is_zero() {
                return Err(VaultError::ZeroAssets);
            }
            if assets > max_assets_in {
                return Err(VaultError::SlippageViolation {
                    actual: assets,
                    bound: max_assets_in,
                });
            }

            let required = vault
                .engine
                .convert_to_assets(&snapshot, shares, Rounding::Ceiling)?;
            let gained = vault.enter(chain, caller, &snapshot, assets)?;
            if gained < required {
                return Err(VaultError::SlippageViolation {
                    actual: gained,
                    bound: required,
                });
            }

            vault.finish_deposit(chain, caller, receiver, assets, shares)?;
            Ok(assets)
        })
    }

    /// Burn `owner`'s shares to pay out `assets` to `receiver`.
    ///
    /// `assets` is in the same deposit-token units as [`Vault::deposit`].
    ///
    /// For single-asset payouts `min_amount_out` bounds the tokens actually
    /// received; for dual-asset vaults it bounds the LP unwound, and each
    /// token leg is protected by the liquidity slippage tolerance.
    pub fn withdraw(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        receiver: Address,
        owner: Address,
        assets: U256,
        min_amount_out: U256,
    ) -> VaultResult<U256> {
        self.atomic(chain, |vault, chain| {
            if assets.is_zero() {
                return Err(VaultError::ZeroAssets);
            }
            let snapshot = vault.snapshot(chain)?;
            let units = vault.engine.position_for_payout(&snapshot, assets)?;
            let shares = vault
                .engine
                .convert_to_shares(&snapshot, units, Rounding::Ceiling)?;
            if shares.is_zero() {
                return Err(VaultError::ZeroShares);
            }

            vault.exit(chain, caller, receiver, owner, shares, units, min_amount_out)?;
            Ok(shares)
        })
    }

    /// Burn exactly `shares` of `owner`, paying the proceeds to `receiver`
    pub fn redeem(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        receiver: Address,
        owner: Address,
        shares: U256,
        min_amount_out: U256,
    ) -> VaultResult<U256> {
        self.atomic(chain, |vault, chain| {
            if shares.is_zero() {
                return Err(VaultError::ZeroShares);
            }
            let snapshot = vault.snapshot(chain)?;
            let units = vault
                .engine
                .convert_to_assets(&snapshot, shares, Rounding::Floor)?;
            if vault.engine.payout_for_position(&snapshot, units)?.is_zero() {
                return Err(VaultError::ZeroAssets);
            }

            vault.exit(chain, caller, receiver, owner, shares, units, min_amount_out)
        })
    }

    /// Tokens a depositor supplies for `assets` of accounting asset
    fn inflow_for(&self, snapshot: &Snapshot, assets: U256) -> VaultResult<Inflow> {
        match self.engine.topology {
            Topology::DualAssetLp => {
                let reserves = snapshot
                    .pool
                    .as_ref()
                    .ok_or(VaultError::InvalidParameter("dual-asset vault without a pool"))?;
                let (amount0, amount1) = self.engine.tokens_to_deposit(reserves, assets)?;
                if amount0.is_zero() || amount1.is_zero() {
                    return Err(VaultError::ZeroAssets);
                }
                Ok(Inflow::Pair { amount0, amount1 })
            }
            Topology::Rebasing | Topology::SingleLpToken => Ok(Inflow::Single(assets)),
        }
    }

    /// Pull the deposit and put it to work, returning position units gained
    fn enter(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        snapshot: &Snapshot,
        assets: U256,
    ) -> VaultResult<U256> {
        let inflow = self.inflow_for(snapshot, assets)?;
        self.venue.pull(chain, self.address, caller, inflow)?;
        self.venue.on_deposit(chain, self.hook_context(caller), inflow)
    }

    fn finish_deposit(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        receiver: Address,
        assets: U256,
        shares: U256,
    ) -> VaultResult<()> {
        self.shares.mint(receiver, shares)?;
        chain.emit(
            self.address,
            &Deposit {
                sender: caller,
                owner: receiver,
                assets,
                shares,
            },
        );
        tracing::info!(
            "Deposit into {}: caller={} receiver={} assets={} shares={}",
            self.address,
            caller,
            receiver,
            assets,
            shares
        );
        Ok(())
    }

    /// Shared exit path; returns the accounting-asset amount paid out
    #[allow(clippy::too_many_arguments)]
    fn exit(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        receiver: Address,
        owner: Address,
        shares: U256,
        units: U256,
        min_amount_out: U256,
    ) -> VaultResult<U256> {
        self.settle_exit(chain, caller, owner, shares)?;

        let payout = self
            .venue
            .on_withdraw(chain, self.hook_context(owner), units)?;
        let assets = match payout {
            Payout::Single { amount, .. } => amount,
            Payout::Pair { .. } => units,
        };
        if assets < min_amount_out {
            return Err(VaultError::SlippageViolation {
                actual: assets,
                bound: min_amount_out,
            });
        }

        chain.emit(
            self.address,
            &Withdraw {
                sender: caller,
                receiver,
                owner,
                assets,
                shares,
            },
        );
        self.pay(chain, receiver, payout)?;

        tracing::info!(
            "Withdraw from {}: caller={} receiver={} owner={} assets={} shares={}",
            self.address,
            caller,
            receiver,
            owner,
            assets,
            shares
        );
        Ok(assets)
    }

    /// Every check and share-side effect of an exit, done before the venue is
    /// called: unlock gate, capacity, allowance, burn, request consumed
    fn settle_exit(
        &mut self,
        chain: &Chain,
        caller: Address,
        owner: Address,
        shares: U256,
    ) -> VaultResult<()> {
        self.check_unlock(chain, owner, shares)?;

        let max = self.max_redeem(chain, owner)?;
        if shares > max {
            return Err(VaultError::CapacityExceeded {
                requested: shares,
                max,
            });
        }

        if caller != owner {
            self.shares.spend_allowance(owner, caller, shares)?;
        }
        self.shares.burn(owner, shares)?;
        self.unlock_requests.remove(&owner);
        Ok(())
    }

    fn pay(&self, chain: &mut Chain, receiver: Address, payout: Payout) -> VaultResult<()> {
        match payout {
            Payout::Single { token, amount } => chain.transfer(token, self.address, receiver, amount),
            Payout::Pair {
                token0,
                amount0,
                token1,
                amount1,
            } => {
                chain.transfer(token0, self.address, receiver, amount0)?;
                chain.transfer(token1, self.address, receiver, amount1)
            }
        }
    }
}
