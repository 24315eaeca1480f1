/// Application constants

// Native coin scaling
pub const TRX_DECIMALS: u32 = 6;
pub const SUN_PER_TRX: u64 = 1_000_000;

// Defaults for state-changing calls
pub const DEFAULT_FEE_LIMIT_SUN: u64 = 10_000_000;
pub const DEFAULT_ACTIVATION_AMOUNT_SUN: u64 = 1_000_000; // 1 TRX

// TRC-20 metadata fallbacks when a contract field cannot be read
pub const UNKNOWN_TOKEN_NAME: &str = "Unknown";
pub const UNKNOWN_TOKEN_SYMBOL: &str = "UNK";
pub const DEFAULT_TOKEN_DECIMALS: u32 = 6;

// Transfer history paging
pub const TRANSFER_PAGE_DEFAULT: u32 = 20;
pub const TRANSFER_PAGE_MAX: u32 = 200;

// HTTP client
pub const UPSTREAM_TIMEOUT_SECS: u64 = 30;

// API version
pub const API_VERSION: &str = "v1";
