//! Vault engine for Rust
//!
//! Share accounting, timelocked exits and auto-compounding harvests for
//! ERC-4626 style vaults over lending pools, staking derivatives and
//! Uniswap V2 style liquidity pools.
//!
//! # Features
//!
//! - Deposit / mint / withdraw / redeem with rounding in the vault's favour
//! - Optional cooldown between an unlock request and the exit
//! - Reward harvesting through a one- or two-hop swap route, paying the caller
//! - Live pair reserves and single-sided quotes over JSON-RPC
//!
//! # Example
//!
//! ```rust,ignore
//! use vault_engine::{Chain, LendingVenue, Vault, VaultParams};
//! use alloy::primitives::{address, U256};
//!
//! let manager = address!("00000000000000000000000000000000000a11ce");
//! let alice = address!("000000000000000000000000000000000000a11c");
//!
//! let mut chain = Chain::new(1_700_000_000);
//! let usdc = chain.deploy_token("USDC", 6);
//! let (pool, _) = chain.deploy_lending_pool(usdc, "aUSDC")?;
//! let venue = LendingVenue::new(&chain, pool)?;
//! let mut vault = Vault::new(&mut chain, venue, VaultParams::new(manager))?;
//!
//! chain.mint(usdc, alice, U256::from(1_000))?;
//! chain.approve(usdc, alice, vault.address(), U256::MAX)?;
//! let shares = vault.deposit(&mut chain, alice, alice, U256::from(1_000), U256::ZERO)?;
//! ```

pub mod chain;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod math;
pub mod oracle;
pub mod types;
pub mod vault;
pub mod venue;

// Re-export main types for convenience
pub use chain::{Chain, FungibleLedger, RewardsSource, SwapExecutor};
pub use config::{NetworkConfig, VaultParams};
pub use engine::{ConversionEngine, SingleSidedPlan, Snapshot, Topology};
pub use error::{eyre, Context, Report, Result, VaultError, VaultResult};
pub use math::{DivisionOrder, Rounding};
pub use oracle::PairOracle;
pub use types::{
    Inflow, PairReserves, Payout, ReserveStatus, SwapRoute, UnlockRequest, VaultPosition,
};
pub use vault::{HarvestReport, Vault};
pub use venue::{DualAssetLp, HookContext, LendingVenue, PassThrough, PositionVenue, SingleSidedLp};
