//! Constants and precision values for the vault engine

use alloy::primitives::U256;

/// Uniswap V2 swap fee numerator (0.3% fee => 997 / 1000)
pub const FEE_NUMERATOR: u64 = 997;

/// Uniswap V2 swap fee denominator
pub const FEE_DENOMINATOR: u64 = 1000;

/// Closed-form single-sided split: `1997^2`
pub const SPLIT_SQUARE_COEFF: u64 = 3_988_009;

/// Closed-form single-sided split: `4 * 997 * 1000`
pub const SPLIT_ASSET_COEFF: u64 = 3_988_000;

/// Closed-form single-sided split: `2 - fee` scaled by 1000
pub const SPLIT_RESERVE_COEFF: u64 = 1997;

/// Closed-form single-sided split: `2 * (1 - fee)` scaled by 1000
pub const SPLIT_DIVISOR: u64 = 1994;

/// Liquidity permanently locked by the first mint of a pair
pub const MINIMUM_LIQUIDITY: u64 = 1000;

/// Harvest incentive denominator (`reward = swapped * bps / 1000`)
pub const REINVEST_REWARD_DENOMINATOR: u64 = 1000;

/// Hard cap on the harvest incentive parameter
pub const MAX_REINVEST_REWARD_BPS: u16 = 150;

/// Basis points denominator used for liquidity slippage tolerances
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default tolerance applied to add/remove liquidity minimums (0.5%)
pub const DEFAULT_LIQUIDITY_SLIPPAGE_BPS: u16 = 50;

/// Aave ray precision (1e27) used by the lending pool liquidity index
pub fn ray() -> U256 {
    U256::from(10u64).pow(U256::from(27u64))
}

/// Half a ray, for half-up rounding
pub fn half_ray() -> U256 {
    ray() / U256::from(2u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_coefficients() {
        // (2 - 0.003) * 1000 = 1997, and its square is the reserve coefficient
        assert_eq!(SPLIT_RESERVE_COEFF * SPLIT_RESERVE_COEFF, SPLIT_SQUARE_COEFF);
        assert_eq!(4 * FEE_NUMERATOR * FEE_DENOMINATOR, SPLIT_ASSET_COEFF);
        assert_eq!(2 * FEE_NUMERATOR, SPLIT_DIVISOR);
    }

    #[test]
    fn test_ray() {
        assert_eq!(ray(), U256::from(10u64).pow(U256::from(27u64)));
        assert_eq!(half_ray() * U256::from(2u64), ray());
    }
}
