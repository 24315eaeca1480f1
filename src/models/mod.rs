// Shared response and domain value types

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// TRC-20 token metadata. Fields a contract does not expose (or that fail to
/// decode) fall back to "Unknown" / "UNK" / 6 instead of failing the call.
#[derive(Debug, Clone, Serialize)]
pub struct TokenMeta {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Acknowledged broadcast of a state-changing call. Having a transaction id
/// does not imply on-chain finality.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub raw: String,
    pub decimals: u32,
    pub balance: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenAllowance {
    pub raw: String,
    pub decimals: u32,
    pub allowance: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrxBalance {
    pub balance_sun: String,
    pub balance_trx: String,
}

/// One page of TRC-20 transfer history, passed through from the history
/// endpoint unmodified, plus the cursor for the next page.
#[derive(Debug, Clone, Serialize)]
pub struct TransferPage {
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Per-request overrides for state-changing calls. Absent fields fall back
/// to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferOpts {
    pub signing_key: Option<String>,
    pub fee_limit: Option<u64>,
}

/// A human amount as it arrives on the wire: either a JSON string or a JSON
/// number, normalized to its decimal-string form before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn as_decimal_string(&self) -> String {
        match self {
            AmountInput::Text(s) => s.trim().to_string(),
            AmountInput::Number(n) => n.to_string(),
        }
    }
}
