//! Vault types for user-facing API

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Pending request to unlock shares from a timelocked vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRequest {
    /// Monotonic request id, unique per vault
    pub id: u64,
    /// Block timestamp at which the cooldown started
    pub started_at: u64,
    /// Shares reserved for the exit
    pub shares: U256,
}

impl UnlockRequest {
    /// First timestamp at which the reserved shares may be withdrawn
    pub fn unlocks_at(&self, lock_period: u64) -> u64 {
        self.started_at.saturating_add(lock_period)
    }

    /// Whether the cooldown has fully elapsed at `now`
    pub fn is_mature(&self, now: u64, lock_period: u64) -> bool {
        now >= self.unlocks_at(lock_period)
    }
}

/// Path used to liquidate harvested reward tokens into the vault asset.
///
/// When `intermediate_token` is the vault asset itself the route is a single
/// hop through `pair1`; otherwise rewards go reward -> intermediate through
/// `pair1`, then intermediate -> asset through `pair2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub intermediate_token: Address,
    pub pair1: Address,
    pub pair2: Address,
}

impl SwapRoute {
    /// Single hop straight into `asset`
    pub fn direct(asset: Address, pair: Address) -> Self {
        Self {
            intermediate_token: asset,
            pair1: pair,
            pair2: Address::ZERO,
        }
    }

    /// Two hops through `intermediate`
    pub fn via(intermediate: Address, pair1: Address, pair2: Address) -> Self {
        Self {
            intermediate_token: intermediate,
            pair1,
            pair2,
        }
    }

    pub fn is_single_hop(&self, asset: Address) -> bool {
        self.intermediate_token == asset
    }
}

/// Tokens pulled from a depositor, in venue terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inflow {
    /// One token: the vault asset
    Single(U256),
    /// Both sides of a pair, ordered as the pair's token0 / token1
    Pair { amount0: U256, amount1: U256 },
}

/// Tokens released by a venue on exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payout {
    Single { token: Address, amount: U256 },
    Pair {
        token0: Address,
        amount0: U256,
        token1: Address,
        amount1: U256,
    },
}

/// Holder's position in a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPosition {
    /// Share balance
    pub shares: U256,
    /// Equivalent value in vault accounting units
    pub assets: U256,
    /// Shares reserved by a pending unlock request
    pub earmarked: U256,
}

impl VaultPosition {
    /// Shares that can move freely
    pub fn free_shares(&self) -> U256 {
        self.shares.saturating_sub(self.earmarked)
    }
}
