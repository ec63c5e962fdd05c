//! Incentives controller paying a reward token to position holders

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use super::{Chain, FungibleLedger, RewardsSource};
use crate::error::{VaultError, VaultResult};
use crate::math::add;

#[derive(Debug, Clone)]
pub struct RewardsController {
    pub reward_token: Address,
    /// Unclaimed rewards keyed by `(position token, holder)`
    accrued: HashMap<(Address, Address), U256>,
}

impl Chain {
    pub fn deploy_rewards_controller(&mut self, reward_token: Address) -> VaultResult<Address> {
        self.token(reward_token)?;
        let controller = self.new_address();
        self.controllers.insert(
            controller,
            RewardsController {
                reward_token,
                accrued: HashMap::new(),
            },
        );
        Ok(controller)
    }

    fn controller(&self, controller: Address) -> VaultResult<&RewardsController> {
        self.controllers
            .get(&controller)
            .ok_or(VaultError::UnknownPool(controller))
    }

    /// Credit `amount` of rewards to `holder` of `position`, funding the
    /// controller with freshly minted reward tokens
    pub fn accrue_rewards(
        &mut self,
        controller: Address,
        position: Address,
        holder: Address,
        amount: U256,
    ) -> VaultResult<()> {
        let reward_token = self.controller(controller)?.reward_token;
        self.mint(reward_token, controller, amount)?;

        let state = self
            .controllers
            .get_mut(&controller)
            .ok_or(VaultError::UnknownPool(controller))?;
        let entry = state.accrued.entry((position, holder)).or_default();
        *entry = add(*entry, amount)?;
        Ok(())
    }
}

impl RewardsSource for Chain {
    fn claim(
        &mut self,
        controller: Address,
        positions: &[Address],
        holder: Address,
        recipient: Address,
    ) -> VaultResult<U256> {
        let reward_token = self.controller(controller)?.reward_token;
        let state = self
            .controllers
            .get_mut(&controller)
            .ok_or(VaultError::UnknownPool(controller))?;

        let mut claimed = U256::ZERO;
        for position in positions {
            if let Some(amount) = state.accrued.remove(&(*position, holder)) {
                claimed = add(claimed, amount)?;
            }
        }

        if !claimed.is_zero() {
            self.transfer(reward_token, controller, recipient, claimed)?;
        }
        Ok(claimed)
    }

    fn unclaimed_balance(
        &self,
        controller: Address,
        position: Address,
        holder: Address,
    ) -> VaultResult<U256> {
        Ok(self
            .controller(controller)?
            .accrued
            .get(&(position, holder))
            .copied()
            .unwrap_or_default())
    }

    fn reward_token(&self, controller: Address) -> VaultResult<Address> {
        Ok(self.controller(controller)?.reward_token)
    }
}
