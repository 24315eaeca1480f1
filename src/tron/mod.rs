// TRON primitives: address codec and amount conversion
pub mod address;
pub mod amount;

pub use address::TronAddress;
