//! ABI declarations: vault events and the token/pair interfaces read over RPC

pub mod erc20;
pub mod pair;
pub mod vault;

pub use erc20::*;
pub use pair::*;
pub use vault::*;
