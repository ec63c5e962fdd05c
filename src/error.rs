//! Error types for the vault engine
//!
//! Vault operations fail with a typed [`VaultError`] so callers can tell a
//! cooldown apart from a slippage bound or a missing allowance. The RPC and
//! configuration layer uses `eyre` for ergonomic error handling with context.

use alloy::primitives::{Address, U256};

pub use eyre::{eyre, Context, Report, Result};

/// Result alias for vault and ledger operations
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// Every way a vault operation can abort.
///
/// All of them leave the vault and the ledger exactly as they were before the
/// call started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// A deposit or mint converted to zero shares
    #[error("operation would mint or burn zero shares")]
    ZeroShares,

    /// A withdrawal or redemption converted to zero assets
    #[error("operation would move zero assets")]
    ZeroAssets,

    /// Zero was passed where a positive amount is required
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Caller is not the vault manager
    #[error("caller {caller} is not the vault manager")]
    Unauthorized { caller: Address },

    /// Requested amount is above the matching max* bound
    #[error("requested {requested} exceeds capacity {max}")]
    CapacityExceeded { requested: U256, max: U256 },

    /// Realized output fell outside a caller-supplied bound
    #[error("slippage bound violated: got {actual}, bound {bound}")]
    SlippageViolation { actual: U256, bound: U256 },

    /// Unlock request exists but its cooldown has not elapsed
    #[error("shares are still locked until {unlocks_at}")]
    StillLocked { unlocks_at: u64 },

    /// Claimed rewards are below the configured harvest threshold
    #[error("harvest claimed {claimed}, below minimum {minimum}")]
    BelowHarvestThreshold { claimed: U256, minimum: U256 },

    /// Spender allowance does not cover the amount
    #[error("allowance {allowance} is below required {required}")]
    InsufficientAllowance { allowance: U256, required: U256 },

    /// Holder balance does not cover the amount
    #[error("balance {balance} is below required {required}")]
    InsufficientBalance { balance: U256, required: U256 },

    /// Pool reserves or cash cannot satisfy the request
    #[error("insufficient liquidity in {pool}")]
    InsufficientLiquidity { pool: Address },

    #[error("arithmetic overflow")]
    MathOverflow,

    #[error("division by zero")]
    DivisionByZero,

    /// Harvest attempted before a swap route was configured
    #[error("no swap route configured")]
    RouteNotSet,

    /// Configured route does not connect the reward token to the vault asset
    #[error("swap route does not connect {from} to {to}")]
    InvalidRoute { from: Address, to: Address },

    /// Harvest incentive above the hard cap
    #[error("reinvest reward of {bps} bps exceeds cap of {max}")]
    RewardBpsTooHigh { bps: u16, max: u16 },

    /// Parameter outside its allowed range
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Withdrawal from a timelocked vault without a pending request
    #[error("no unlock request for {owner}")]
    NoUnlockRequest { owner: Address },

    /// Unlock requests only exist on vaults with a lock period
    #[error("vault has no lock period")]
    NotTimelocked,

    /// Owner already has an outstanding unlock request
    #[error("unlock request {id} already pending")]
    UnlockAlreadyRequested { id: u64 },

    /// Shares are reserved by an unlock request and cannot move this way
    #[error("{earmarked} shares are earmarked for unlock, only {free} are free")]
    SharesEarmarked { earmarked: U256, free: U256 },

    /// Withdrawal burns more shares than the matured request covers
    #[error("burning {requested} shares exceeds unlocked {unlocked}")]
    ExceedsUnlockRequest { requested: U256, unlocked: U256 },

    #[error("unknown token {0}")]
    UnknownToken(Address),

    #[error("unknown pool {0}")]
    UnknownPool(Address),
}
