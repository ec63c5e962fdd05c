//! Pool and venue snapshots

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Live reserves of a constant-product pair.
///
/// Never stored by a vault: it is read from the pool on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReserves {
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    /// Total supply of the pair's LP token
    pub total_supply: U256,
}

impl PairReserves {
    /// The counterpart of `token` in this pair
    pub fn other(&self, token: Address) -> VaultResult<Address> {
        if token == self.token0 {
            Ok(self.token1)
        } else if token == self.token1 {
            Ok(self.token0)
        } else {
            Err(VaultError::UnknownToken(token))
        }
    }

    /// Reserves ordered as `(reserve of token, reserve of its counterpart)`
    pub fn oriented(&self, token: Address) -> VaultResult<(U256, U256)> {
        if token == self.token0 {
            Ok((self.reserve0, self.reserve1))
        } else if token == self.token1 {
            Ok((self.reserve1, self.reserve0))
        } else {
            Err(VaultError::UnknownToken(token))
        }
    }

    pub fn contains(&self, token: Address) -> bool {
        token == self.token0 || token == self.token1
    }
}

/// Operational state of a lending reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveStatus {
    pub active: bool,
    pub frozen: bool,
    pub paused: bool,
    /// Maximum total receipt supply, `None` for uncapped
    pub supply_cap: Option<U256>,
    /// Underlying cash the pool can pay out right now
    pub available_liquidity: U256,
}

impl ReserveStatus {
    /// New deposits are accepted
    pub fn accepts_deposits(&self) -> bool {
        self.active && !self.frozen && !self.paused
    }

    /// Withdrawals are processed (frozen reserves still allow exits)
    pub fn allows_withdrawals(&self) -> bool {
        self.active && !self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserves() -> PairReserves {
        PairReserves {
            pair: Address::repeat_byte(0xaa),
            token0: Address::repeat_byte(0x01),
            token1: Address::repeat_byte(0x02),
            reserve0: U256::from(10u64),
            reserve1: U256::from(20u64),
            total_supply: U256::from(14u64),
        }
    }

    #[test]
    fn test_oriented() {
        let r = reserves();
        assert_eq!(r.oriented(r.token0).unwrap(), (U256::from(10u64), U256::from(20u64)));
        assert_eq!(r.oriented(r.token1).unwrap(), (U256::from(20u64), U256::from(10u64)));
        assert_eq!(r.other(r.token0).unwrap(), r.token1);
        assert!(r.oriented(Address::ZERO).is_err());
    }

    #[test]
    fn test_reserve_status_flags() {
        let mut status = ReserveStatus {
            active: true,
            frozen: false,
            paused: false,
            supply_cap: None,
            available_liquidity: U256::ZERO,
        };
        assert!(status.accepts_deposits());
        status.frozen = true;
        assert!(!status.accepts_deposits());
        assert!(status.allows_withdrawals());
        status.paused = true;
        assert!(!status.allows_withdrawals());
    }
}
