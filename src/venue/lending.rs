//! Lending pool venue: supplies the asset and holds the rebasing receipt

use alloy::primitives::{Address, U256};

use super::{HookContext, PositionVenue};
use crate::chain::Chain;
use crate::engine::Topology;
use crate::error::{VaultError, VaultResult};
use crate::types::{Inflow, Payout};

/// Custody through an Aave-style reserve.
///
/// Share value is the receipt balance, which rebases as interest accrues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingVenue {
    pub pool: Address,
    pub asset: Address,
    pub receipt_token: Address,
}

impl LendingVenue {
    pub fn new(chain: &Chain, pool: Address) -> VaultResult<Self> {
        let reserve = chain.lending_pool(pool)?;
        Ok(Self {
            pool,
            asset: reserve.asset,
            receipt_token: reserve.receipt_token,
        })
    }
}

impl PositionVenue for LendingVenue {
    fn topology(&self) -> Topology {
        Topology::Rebasing
    }

    fn asset(&self) -> Address {
        self.asset
    }

    fn position_token(&self) -> Address {
        self.receipt_token
    }

    fn max_deposit(&self, chain: &Chain) -> VaultResult<U256> {
        let status = chain.reserve_status(self.pool)?;
        if !status.accepts_deposits() {
            return Ok(U256::ZERO);
        }
        match status.supply_cap {
            Some(cap) => Ok(cap.saturating_sub(chain.total_supply(self.receipt_token)?)),
            None => Ok(U256::MAX),
        }
    }

    fn available_liquidity(&self, chain: &Chain) -> VaultResult<U256> {
        let status = chain.reserve_status(self.pool)?;
        if !status.allows_withdrawals() {
            return Ok(U256::ZERO);
        }
        Ok(status.available_liquidity)
    }

    fn on_deposit(&self, chain: &mut Chain, ctx: HookContext, inflow: Inflow) -> VaultResult<U256> {
        let Inflow::Single(amount) = inflow else {
            return Err(VaultError::InvalidParameter("lending venue takes a single asset"));
        };
        let before = self.total_assets(chain, ctx.vault)?;
        chain.lending_supply(self.pool, ctx.vault, amount, ctx.vault)?;
        let after = self.total_assets(chain, ctx.vault)?;
        Ok(after.saturating_sub(before))
    }

    fn on_withdraw(&self, chain: &mut Chain, ctx: HookContext, units: U256) -> VaultResult<Payout> {
        chain.lending_withdraw(self.pool, ctx.vault, units, ctx.vault)?;
        Ok(Payout::Single {
            token: self.asset,
            amount: units,
        })
    }
}
