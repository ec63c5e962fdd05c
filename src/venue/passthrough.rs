//! Pass-through custody of a staking derivative

use alloy::primitives::{Address, U256};

use super::{HookContext, PositionVenue};
use crate::chain::Chain;
use crate::engine::Topology;
use crate::error::{VaultError, VaultResult};
use crate::types::{Inflow, Payout};

/// The vault simply holds the token; yield arrives by rebasing or by
/// compounded rewards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassThrough {
    pub token: Address,
}

impl PassThrough {
    pub fn new(token: Address) -> Self {
        Self { token }
    }
}

impl PositionVenue for PassThrough {
    fn topology(&self) -> Topology {
        Topology::Rebasing
    }

    fn asset(&self) -> Address {
        self.token
    }

    fn position_token(&self) -> Address {
        self.token
    }

    fn on_deposit(&self, _chain: &mut Chain, _ctx: HookContext, inflow: Inflow) -> VaultResult<U256> {
        match inflow {
            Inflow::Single(amount) => Ok(amount),
            Inflow::Pair { .. } => Err(VaultError::InvalidParameter(
                "pass-through venue takes a single asset",
            )),
        }
    }

    fn on_withdraw(&self, _chain: &mut Chain, _ctx: HookContext, units: U256) -> VaultResult<Payout> {
        Ok(Payout::Single {
            token: self.token,
            amount: units,
        })
    }
}
