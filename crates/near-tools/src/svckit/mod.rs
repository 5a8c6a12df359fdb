//! Service Kit - Agent Tools
//!
//! NEAR tools that implement `agent_core::Tool`.

mod faucet;
mod nft;
mod tx_info;

pub use faucet::GetTestnetTokensTool;
pub use nft::MintNftTool;
pub use tx_info::TransactionInfoTool;
