//! Two-phase unlock: request, cool down, then withdraw or cancel
//!
//! With a non-zero lock period every exit must go through a matured request
//! and may burn at most the shares it earmarked. Expiry is checked lazily
//! against the chain clock when the withdrawal arrives. Earmarked shares
//! cannot be transferred while the request is pending.

use alloy::primitives::{Address, U256};

use super::Vault;
use crate::chain::Chain;
use crate::contracts::{UnlockCancelled, UnlockRequested};
use crate::error::{VaultError, VaultResult};
use crate::types::UnlockRequest;
use crate::venue::PositionVenue;

impl<V: PositionVenue> Vault<V> {
    /// Earmark `shares` of `owner` for a timelocked exit.
    ///
    /// Only timelocked vaults take requests, so earmarked shares can never
    /// leave through an exit that skips the request.
    ///
    /// `caller` must be the owner or hold an allowance covering `shares`.
    pub fn request_unlock(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        owner: Address,
        shares: U256,
    ) -> VaultResult<UnlockRequest> {
        self.atomic(chain, |vault, chain| {
            if !vault.is_timelocked() {
                return Err(VaultError::NotTimelocked);
            }
            if shares.is_zero() {
                return Err(VaultError::ZeroShares);
            }
            if caller != owner {
                let allowance = vault.allowance(owner, caller);
                if allowance < shares {
                    return Err(VaultError::InsufficientAllowance {
                        allowance,
                        required: shares,
                    });
                }
            }
            if let Some(existing) = vault.unlock_requests.get(&owner) {
                return Err(VaultError::UnlockAlreadyRequested { id: existing.id });
            }
            let balance = vault.balance_of(owner);
            if shares > balance {
                return Err(VaultError::InsufficientBalance {
                    balance,
                    required: shares,
                });
            }

            let request = UnlockRequest {
                id: vault.next_request_id,
                started_at: chain.now(),
                shares,
            };
            vault.next_request_id += 1;
            vault.unlock_requests.insert(owner, request);

            chain.emit(
                vault.address,
                &UnlockRequested {
                    owner,
                    id: U256::from(request.id),
                    shares,
                    startedAt: request.started_at,
                },
            );
            tracing::info!(
                "Unlock request {} on {}: owner={} shares={} unlocks_at={}",
                request.id,
                vault.address,
                owner,
                shares,
                request.unlocks_at(vault.params.lock_period)
            );
            Ok(request)
        })
    }

    /// Drop `owner`'s pending request; only the owner may cancel
    pub fn cancel_unlock(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        owner: Address,
    ) -> VaultResult<()> {
        self.atomic(chain, |vault, chain| {
            if caller != owner {
                return Err(VaultError::Unauthorized { caller });
            }
            let request = vault
                .unlock_requests
                .remove(&owner)
                .ok_or(VaultError::NoUnlockRequest { owner })?;

            chain.emit(
                vault.address,
                &UnlockCancelled {
                    owner,
                    id: U256::from(request.id),
                },
            );
            tracing::info!("Unlock request {} on {} cancelled", request.id, vault.address);
            Ok(())
        })
    }

    pub fn user_unlock_requests(&self, owner: Address) -> Option<UnlockRequest> {
        self.unlock_requests.get(&owner).copied()
    }

    /// Cooldown in seconds; zero when the vault allows instant exits
    pub fn get_lock_period(&self) -> u64 {
        self.params.lock_period
    }

    pub fn is_timelocked(&self) -> bool {
        self.params.lock_period > 0
    }

    /// Shares reserved by `owner`'s pending request
    pub fn earmarked(&self, owner: Address) -> U256 {
        self.unlock_requests
            .get(&owner)
            .map(|request| request.shares)
            .unwrap_or_default()
    }

    /// Shares `owner` may burn right now, ignoring venue liquidity
    pub(crate) fn unlocked_shares(&self, chain: &Chain, owner: Address) -> U256 {
        let balance = self.balance_of(owner);
        if !self.is_timelocked() {
            return balance;
        }
        match self.unlock_requests.get(&owner) {
            Some(request) if request.is_mature(chain.now(), self.params.lock_period) => {
                request.shares.min(balance)
            }
            _ => U256::ZERO,
        }
    }

    /// Gate an exit of `shares` by `owner` on a matured request
    pub(crate) fn check_unlock(&self, chain: &Chain, owner: Address, shares: U256) -> VaultResult<()> {
        if !self.is_timelocked() {
            return Ok(());
        }
        let request = self
            .unlock_requests
            .get(&owner)
            .ok_or(VaultError::NoUnlockRequest { owner })?;

        let unlocks_at = request.unlocks_at(self.params.lock_period);
        if chain.now() < unlocks_at {
            return Err(VaultError::StillLocked { unlocks_at });
        }
        if shares > request.shares {
            return Err(VaultError::ExceedsUnlockRequest {
                requested: shares,
                unlocked: request.shares,
            });
        }
        Ok(())
    }
}
