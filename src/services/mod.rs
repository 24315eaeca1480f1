// All service modules
pub mod chain_client;
pub mod token_transfer;

// Re-export for convenience
pub use chain_client::{ChainClient, TronNodeClient};
pub use token_transfer::TokenTransferService;

/// The concrete service wired against the HTTP node client.
pub type TronService = TokenTransferService<TronNodeClient>;
