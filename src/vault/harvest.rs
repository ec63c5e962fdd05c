//! Harvest / reinvest and manager configuration
//!
//! A harvest claims the position's rewards, swaps them along the configured
//! route into the compounding token, pays the caller an incentive and feeds
//! the rest back into the venue without minting shares.

use alloy::primitives::{Address, U256};

use super::Vault;
use crate::chain::{Chain, FungibleLedger, RewardsSource, SwapExecutor};
use crate::constants::{MAX_REINVEST_REWARD_BPS, REINVEST_REWARD_DENOMINATOR};
use crate::contracts::{Harvest, MinTokensToHarvestUpdated, ReinvestRewardBpsUpdated, RouteSet};
use crate::error::{VaultError, VaultResult};
use crate::math::{mul_div, sub, Rounding};
use crate::types::{Inflow, SwapRoute};
use crate::venue::PositionVenue;

/// What one harvest did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestReport {
    pub claimed: U256,
    pub swapped: U256,
    pub caller_reward: U256,
    pub reinvested: U256,
    /// Position units added to the vault
    pub position_gained: U256,
}

impl<V: PositionVenue> Vault<V> {
    /// Claim, liquidate and compound rewards.
    ///
    /// Fails if the claim is below the configured minimum, if the route is
    /// missing or no longer connects the reward token to the compounding
    /// token, or if the swap output is below `min_amount_out`.
    pub fn harvest(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        min_amount_out: U256,
    ) -> VaultResult<HarvestReport> {
        self.atomic(chain, |vault, chain| {
            let controller = vault
                .rewards_controller
                .ok_or(VaultError::InvalidParameter("vault has no rewards controller"))?;
            let reward_token = chain.reward_token(controller)?;
            let route = vault.route.ok_or(VaultError::RouteNotSet)?;
            vault.validate_route(chain, reward_token, route)?;

            let claimed = chain.claim(
                controller,
                &[vault.venue.position_token()],
                vault.address,
                vault.address,
            )?;
            let minimum = vault.params.min_tokens_to_harvest;
            if claimed.is_zero() || claimed < minimum {
                return Err(VaultError::BelowHarvestThreshold { claimed, minimum });
            }

            let swapped = vault.liquidate(chain, reward_token, route, claimed)?;
            if swapped < min_amount_out {
                return Err(VaultError::SlippageViolation {
                    actual: swapped,
                    bound: min_amount_out,
                });
            }

            let target = vault.venue.compounding_token();
            let caller_reward = mul_div(
                swapped,
                U256::from(vault.params.reinvest_reward_bps),
                U256::from(REINVEST_REWARD_DENOMINATOR),
                Rounding::Floor,
            )?;
            if !caller_reward.is_zero() {
                chain.transfer(target, vault.address, caller, caller_reward)?;
            }

            let reinvested = sub(swapped, caller_reward)?;
            // Router dust from earlier compounds is swept in with this one
            let compounding = if target == vault.venue.position_token() {
                reinvested
            } else {
                chain.balance_of(target, vault.address)?
            };
            let position_gained = vault.venue.on_deposit(
                chain,
                vault.hook_context(vault.address),
                Inflow::Single(compounding),
            )?;

            chain.emit(
                vault.address,
                &Harvest {
                    caller,
                    claimed,
                    swapped,
                    callerReward: caller_reward,
                    reinvested,
                },
            );
            tracing::info!(
                "Harvest on {}: claimed={} swapped={} caller_reward={} reinvested={} gained={}",
                vault.address,
                claimed,
                swapped,
                caller_reward,
                reinvested,
                position_gained
            );

            Ok(HarvestReport {
                claimed,
                swapped,
                caller_reward,
                reinvested,
                position_gained,
            })
        })
    }

    /// Route must still lead from `reward_token` to the compounding token
    fn validate_route(&self, chain: &Chain, reward_token: Address, route: SwapRoute) -> VaultResult<()> {
        let target = self.venue.compounding_token();
        let first = chain.pair_reserves(route.pair1)?;
        if !first.contains(reward_token) || first.other(reward_token)? != route.intermediate_token {
            return Err(VaultError::InvalidRoute {
                from: reward_token,
                to: route.intermediate_token,
            });
        }
        if route.is_single_hop(target) {
            return Ok(());
        }

        let second = chain.pair_reserves(route.pair2)?;
        if !second.contains(route.intermediate_token)
            || second.other(route.intermediate_token)? != target
        {
            return Err(VaultError::InvalidRoute {
                from: route.intermediate_token,
                to: target,
            });
        }
        Ok(())
    }

    fn liquidate(
        &self,
        chain: &mut Chain,
        reward_token: Address,
        route: SwapRoute,
        amount: U256,
    ) -> VaultResult<U256> {
        let target = self.venue.compounding_token();
        let first = chain.execute(
            self.address,
            amount,
            reward_token,
            route.intermediate_token,
            route.pair1,
        )?;
        if route.is_single_hop(target) {
            return Ok(first);
        }
        chain.execute(
            self.address,
            first,
            route.intermediate_token,
            target,
            route.pair2,
        )
    }

    // ========== Manager configuration ==========

    pub fn set_route(&mut self, chain: &mut Chain, caller: Address, route: SwapRoute) -> VaultResult<()> {
        self.ensure_manager(caller)?;
        self.route = Some(route);
        chain.emit(
            self.address,
            &RouteSet {
                intermediateToken: route.intermediate_token,
                pair1: route.pair1,
                pair2: route.pair2,
            },
        );
        tracing::info!(
            "Route on {} set: via {} ({} / {})",
            self.address,
            route.intermediate_token,
            route.pair1,
            route.pair2
        );
        Ok(())
    }

    pub fn update_min_tokens_to_harvest(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        min_tokens: U256,
    ) -> VaultResult<()> {
        self.ensure_manager(caller)?;
        self.params.min_tokens_to_harvest = min_tokens;
        chain.emit(
            self.address,
            &MinTokensToHarvestUpdated {
                minTokens: min_tokens,
            },
        );
        tracing::info!("Min tokens to harvest on {} set to {}", self.address, min_tokens);
        Ok(())
    }

    pub fn update_reinvest_reward_bps(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        bps: u16,
    ) -> VaultResult<()> {
        self.ensure_manager(caller)?;
        if bps > MAX_REINVEST_REWARD_BPS {
            return Err(VaultError::RewardBpsTooHigh {
                bps,
                max: MAX_REINVEST_REWARD_BPS,
            });
        }
        self.params.reinvest_reward_bps = bps;
        chain.emit(self.address, &ReinvestRewardBpsUpdated { bps });
        tracing::info!("Reinvest reward on {} set to {} bps", self.address, bps);
        Ok(())
    }
}
