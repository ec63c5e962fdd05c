//! Uniswap V2 pair contract bindings

use alloy::sol;

sol! {
    /// Reserve/price oracle surface of a constant-product pair
    #[sol(rpc)]
    interface IUniswapV2Pair {
        /// First token of the pair (lower address)
        function token0() external view returns (address);

        /// Second token of the pair
        function token1() external view returns (address);

        /// Current reserves and the timestamp of the last update
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);

        /// Total supply of LP tokens
        function totalSupply() external view returns (uint256);
    }
}
