//! Seam to the TRON node: a `ChainClient` capability trait plus the HTTP
//! implementation speaking the node's wallet API and TronGrid.

use crate::{
    config::Config,
    constants::UPSTREAM_TIMEOUT_SECS,
    error::{AppError, Result},
    models::TransferPage,
    tron::TronAddress,
};
use async_trait::async_trait;
use num_bigint::BigUint;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use std::time::Duration;
use url::Url;

/// Placeholder caller for constant reads; no identity is involved.
const CONSTANT_CALLER_HEX: &str = "410000000000000000000000000000000000000000";

/// A typed argument to a TRC-20 contract method, ABI-encoded as one 32-byte
/// word on the wire.
#[derive(Debug, Clone)]
pub enum ContractArg {
    Address(TronAddress),
    Uint(BigUint),
}

/// Encode call arguments as concatenated 32-byte words, hex-encoded the way
/// `triggersmartcontract` expects its `parameter` field.
pub fn abi_encode(args: &[ContractArg]) -> Result<String> {
    let mut out = Vec::with_capacity(args.len() * 32);
    for arg in args {
        let mut word = [0u8; 32];
        match arg {
            ContractArg::Address(address) => {
                // ABI addresses carry the 20-byte hash, not the 0x41 prefix
                word[12..].copy_from_slice(address.pubkey_hash());
            }
            ContractArg::Uint(value) => {
                let bytes = value.to_bytes_be();
                if bytes.len() > 32 {
                    return Err(AppError::InvalidAmount(value.to_string()));
                }
                word[32 - bytes.len()..].copy_from_slice(&bytes);
            }
        }
        out.extend_from_slice(&word);
    }
    Ok(hex::encode(out))
}

/// Decode an unsigned integer from a constant-call result blob.
pub fn decode_uint(words: &[String]) -> Result<BigUint> {
    let first = words
        .first()
        .ok_or_else(|| AppError::Upstream("Empty constant result".to_string()))?;
    let bytes = hex::decode(first)
        .map_err(|e| AppError::Upstream(format!("Bad constant result hex: {}", e)))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Decode an ABI string from a constant-call result blob. Handles both the
/// dynamic string layout (offset, length, data) and the fixed bytes32 layout
/// some older token contracts use. Returns None instead of failing so the
/// caller can fall back to a sentinel.
pub fn decode_string(words: &[String]) -> Option<String> {
    let bytes = hex::decode(words.first()?).ok()?;
    if bytes.len() >= 64 {
        let offset = usize_word(&bytes[..32])?;
        let len_start = offset.checked_add(32)?;
        if len_start <= bytes.len() {
            let len = usize_word(bytes.get(offset..len_start)?)?;
            let data = bytes.get(len_start..len_start.checked_add(len)?)?;
            return utf8_trimmed(data);
        }
    }
    // bytes32 fallback: right-padded with NULs
    let first_word = bytes.get(..32.min(bytes.len()))?;
    let end = first_word.iter().position(|&b| b == 0).unwrap_or(first_word.len());
    utf8_trimmed(&first_word[..end])
}

fn usize_word(word: &[u8]) -> Option<usize> {
    let value = BigUint::from_bytes_be(word);
    usize::try_from(&value).ok()
}

fn utf8_trimmed(data: &[u8]) -> Option<String> {
    let s = String::from_utf8(data.to_vec()).ok()?;
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// The capability the transfer layer consumes from the chain. Every call is
/// stateless with respect to prior calls, so one client is safe to share
/// across concurrent operations.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native TRX balance in sun.
    async fn trx_balance(&self, address: &TronAddress) -> Result<BigUint>;

    /// Read-only contract call; returns the raw constant-result words.
    async fn constant_call(
        &self,
        contract: &TronAddress,
        selector: &str,
        args: &[ContractArg],
    ) -> Result<Vec<String>>;

    /// Build, sign and broadcast a contract call; returns the transaction id.
    async fn send_contract(
        &self,
        contract: &TronAddress,
        selector: &str,
        args: &[ContractArg],
        fee_limit: u64,
        signing_key: &str,
    ) -> Result<String>;

    /// One page of TRC-20 transfer history for a holder.
    async fn transfer_history(
        &self,
        holder: &TronAddress,
        limit: u32,
        fingerprint: Option<&str>,
    ) -> Result<TransferPage>;

    /// The address controlled by a signing key.
    fn derive_address(&self, signing_key: &str) -> Result<TronAddress>;

    /// Build, sign and broadcast a plain TRX transfer; returns the broadcast
    /// receipt unmodified.
    async fn send_trx(
        &self,
        to: &TronAddress,
        amount_sun: u64,
        signing_key: &str,
    ) -> Result<serde_json::Value>;
}

/// HTTP client for a TRON full node (and TronGrid for history).
pub struct TronNodeClient {
    node_host: String,
    grid_host: String,
    api_key: Option<String>,
    client: reqwest::Client,
    secp: Secp256k1<secp256k1::All>,
}

impl TronNodeClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            node_host: config.tron_host.clone(),
            grid_host: config.grid_host().to_string(),
            api_key: config.tron_api_key.clone(),
            client,
            secp: Secp256k1::new(),
        })
    }

    fn apply_api_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("TRON-PRO-API-KEY", key.as_str()),
            None => request,
        }
    }

    async fn post_wallet(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.node_host, path);
        let request = self.apply_api_key(self.client.post(&url)).json(&body);
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{} request failed: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("{} response parse failed: {}", path, e)))
    }

    fn parse_signing_key(&self, signing_key: &str) -> Result<SecretKey> {
        let trimmed = signing_key.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped)
            .map_err(|_| AppError::BadRequest("Signing key is not valid hex".to_string()))?;
        SecretKey::from_slice(&bytes)
            .map_err(|_| AppError::BadRequest("Signing key is not a valid secp256k1 scalar".to_string()))
    }

    /// Attach a recoverable signature over the transaction digest. The digest
    /// is recomputed from raw_data_hex rather than trusting the node's txID.
    fn sign_transaction(
        &self,
        mut tx: serde_json::Value,
        signing_key: &str,
    ) -> Result<serde_json::Value> {
        let digest: [u8; 32] = match tx.get("raw_data_hex").and_then(|v| v.as_str()) {
            Some(raw_hex) => {
                let raw = hex::decode(raw_hex)
                    .map_err(|e| AppError::Upstream(format!("Bad raw_data_hex: {}", e)))?;
                Sha256::digest(&raw).into()
            }
            None => {
                let txid = tx
                    .get("txID")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| AppError::Upstream("Transaction has no txID".to_string()))?;
                hex::decode(txid)
                    .ok()
                    .and_then(|bytes| bytes.try_into().ok())
                    .ok_or_else(|| AppError::Upstream("Transaction txID is malformed".to_string()))?
            }
        };

        let secret = self.parse_signing_key(signing_key)?;
        let message = Message::from_slice(&digest)
            .map_err(|e| AppError::Internal(format!("Digest rejected: {}", e)))?;
        let signature = self.secp.sign_ecdsa_recoverable(&message, &secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut sig_bytes = [0u8; 65];
        sig_bytes[..64].copy_from_slice(&compact);
        sig_bytes[64] = recovery_id.to_i32() as u8;

        tx["signature"] = serde_json::json!([hex::encode(sig_bytes)]);
        Ok(tx)
    }

    async fn broadcast(&self, signed: serde_json::Value) -> Result<serde_json::Value> {
        let receipt = self
            .post_wallet("wallet/broadcasttransaction", signed)
            .await?;

        let accepted = receipt
            .get("result")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !accepted {
            return Err(AppError::Upstream(format!(
                "Broadcast rejected: {}",
                broadcast_failure_message(&receipt)
            )));
        }
        Ok(receipt)
    }
}

fn broadcast_failure_message(receipt: &serde_json::Value) -> String {
    let code = receipt.get("code").and_then(|v| v.as_str()).unwrap_or("unknown");
    let message = receipt
        .get("message")
        .and_then(|v| v.as_str())
        .map(decode_node_message)
        .unwrap_or_default();
    if message.is_empty() {
        code.to_string()
    } else {
        format!("{}: {}", code, message)
    }
}

/// Node error messages arrive hex-encoded; fall back to the raw text when
/// they are not.
fn decode_node_message(message: &str) -> String {
    hex::decode(message)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}

fn trigger_result_ok(response: &serde_json::Value) -> Result<()> {
    let ok = response
        .get("result")
        .and_then(|r| r.get("result"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if ok {
        return Ok(());
    }
    let message = response
        .get("result")
        .and_then(|r| r.get("message"))
        .and_then(|v| v.as_str())
        .map(decode_node_message)
        .unwrap_or_else(|| "Contract call rejected".to_string());
    Err(AppError::Upstream(message))
}

#[async_trait]
impl ChainClient for TronNodeClient {
    async fn trx_balance(&self, address: &TronAddress) -> Result<BigUint> {
        let body = serde_json::json!({
            "address": address.to_hex(),
            "visible": false,
        });
        let account = self.post_wallet("wallet/getaccount", body).await?;
        // A never-funded account comes back as an empty object
        let balance = account.get("balance").and_then(|v| v.as_u64()).unwrap_or(0);
        Ok(BigUint::from(balance))
    }

    async fn constant_call(
        &self,
        contract: &TronAddress,
        selector: &str,
        args: &[ContractArg],
    ) -> Result<Vec<String>> {
        let body = serde_json::json!({
            "owner_address": CONSTANT_CALLER_HEX,
            "contract_address": contract.to_hex(),
            "function_selector": selector,
            "parameter": abi_encode(args)?,
        });
        let response = self
            .post_wallet("wallet/triggerconstantcontract", body)
            .await?;
        trigger_result_ok(&response)?;

        let words = response
            .get("constant_result")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(words)
    }

    async fn send_contract(
        &self,
        contract: &TronAddress,
        selector: &str,
        args: &[ContractArg],
        fee_limit: u64,
        signing_key: &str,
    ) -> Result<String> {
        let owner = self.derive_address(signing_key)?;
        let body = serde_json::json!({
            "owner_address": owner.to_hex(),
            "contract_address": contract.to_hex(),
            "function_selector": selector,
            "parameter": abi_encode(args)?,
            "fee_limit": fee_limit,
            "call_value": 0,
        });
        let response = self
            .post_wallet("wallet/triggersmartcontract", body)
            .await?;
        trigger_result_ok(&response)?;

        let tx = response
            .get("transaction")
            .cloned()
            .ok_or_else(|| AppError::Upstream("Node returned no transaction".to_string()))?;
        let signed = self.sign_transaction(tx, signing_key)?;
        let txid = signed
            .get("txID")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::Upstream("Transaction has no txID".to_string()))?;

        self.broadcast(signed).await?;
        Ok(txid)
    }

    async fn transfer_history(
        &self,
        holder: &TronAddress,
        limit: u32,
        fingerprint: Option<&str>,
    ) -> Result<TransferPage> {
        let mut url = Url::parse(&format!(
            "{}/v1/accounts/{}/transactions/trc20",
            self.grid_host,
            holder.to_base58()
        ))
        .map_err(|e| AppError::Internal(format!("Invalid TronGrid URL: {}", e)))?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        if let Some(cursor) = fingerprint {
            url.query_pairs_mut().append_pair("fingerprint", cursor);
        }

        let response = self
            .apply_api_key(self.client.get(url))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("TronGrid request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "TronGrid {}",
                response.status().as_u16()
            )));
        }

        let page: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("TronGrid response parse failed: {}", e)))?;
        let next = page
            .get("meta")
            .and_then(|meta| meta.get("fingerprint"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(TransferPage {
            data: page,
            fingerprint: next,
        })
    }

    fn derive_address(&self, signing_key: &str) -> Result<TronAddress> {
        let secret = self.parse_signing_key(signing_key)?;
        let public = PublicKey::from_secret_key(&self.secp, &secret);
        // Uncompressed key without the 0x04 tag, Keccak-256, last 20 bytes
        let digest = Keccak256::digest(&public.serialize_uncompressed()[1..]);
        let hash: [u8; 20] = digest[12..]
            .try_into()
            .map_err(|_| AppError::Internal("Keccak digest has unexpected length".to_string()))?;
        Ok(TronAddress::from_pubkey_hash(&hash))
    }

    async fn send_trx(
        &self,
        to: &TronAddress,
        amount_sun: u64,
        signing_key: &str,
    ) -> Result<serde_json::Value> {
        let owner = self.derive_address(signing_key)?;
        let body = serde_json::json!({
            "to_address": to.to_hex(),
            "owner_address": owner.to_hex(),
            "amount": amount_sun,
        });
        let tx = self.post_wallet("wallet/createtransaction", body).await?;
        if let Some(error) = tx.get("Error").and_then(|v| v.as_str()) {
            return Err(AppError::Upstream(error.to_string()));
        }

        let signed = self.sign_transaction(tx, signing_key)?;
        self.broadcast(signed).await
    }
}
