//! TRC-20 orchestration: address normalization, amount conversion and chain
//! calls composed into one operation per method.
//!
//! Every method validates its inputs before touching the network. None of
//! them retries: resubmitting a broadcast contract call with the same
//! parameters would double-spend, so retry policy stays with the caller.
//! Cancelling an in-flight operation only stops awaiting the result; once
//! the broadcast request has been issued the on-chain effect is not undone.

use crate::{
    config::Config,
    constants::{
        DEFAULT_ACTIVATION_AMOUNT_SUN, DEFAULT_TOKEN_DECIMALS, TRX_DECIMALS, UNKNOWN_TOKEN_NAME,
        UNKNOWN_TOKEN_SYMBOL,
    },
    error::{AppError, Result},
    models::{
        TokenAllowance, TokenBalance, TokenMeta, TransferOpts, TransferPage, TransferResult,
        TrxBalance,
    },
    services::chain_client::{decode_string, decode_uint, ChainClient, ContractArg},
    tron::{amount, TronAddress},
    utils::clamp_page_limit,
};
use num_bigint::BigUint;
use std::sync::Arc;

pub struct TokenTransferService<C: ChainClient> {
    client: Arc<C>,
    default_signing_key: Option<String>,
    default_fee_limit: u64,
}

impl<C: ChainClient> TokenTransferService<C> {
    pub fn new(client: Arc<C>, default_signing_key: Option<String>, default_fee_limit: u64) -> Self {
        Self {
            client,
            default_signing_key,
            default_fee_limit,
        }
    }

    pub fn from_config(client: Arc<C>, config: &Config) -> Self {
        Self::new(
            client,
            config.sender_private_key.clone(),
            config.fee_limit_sun,
        )
    }

    fn resolve_signing_key(&self, opts: &TransferOpts) -> Result<String> {
        opts.signing_key
            .clone()
            .or_else(|| self.default_signing_key.clone())
            .ok_or(AppError::MissingCredential)
    }

    /// Token decimal precision, with the documented fallback when the
    /// contract does not answer or returns something undecodable.
    async fn token_decimals(&self, token: &TronAddress) -> u32 {
        let words = match self.client.constant_call(token, "decimals()", &[]).await {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!("decimals() read failed for {}: {}", token, err);
                return DEFAULT_TOKEN_DECIMALS;
            }
        };
        decode_uint(&words)
            .ok()
            .and_then(|value| u32::try_from(&value).ok())
            .unwrap_or_else(|| {
                tracing::warn!("decimals() result undecodable for {}", token);
                DEFAULT_TOKEN_DECIMALS
            })
    }

    async fn token_field(&self, token: &TronAddress, selector: &str) -> Option<String> {
        match self.client.constant_call(token, selector, &[]).await {
            Ok(words) => decode_string(&words),
            Err(err) => {
                tracing::warn!("{} read failed for {}: {}", selector, token, err);
                None
            }
        }
    }

    /// Token metadata with per-field leniency: a field that cannot be read
    /// falls back to its sentinel instead of failing the whole call.
    pub async fn token_meta(&self, token: &str) -> Result<TokenMeta> {
        let token = TronAddress::parse(token)?;

        let name = self
            .token_field(&token, "name()")
            .await
            .unwrap_or_else(|| UNKNOWN_TOKEN_NAME.to_string());
        let symbol = self
            .token_field(&token, "symbol()")
            .await
            .unwrap_or_else(|| UNKNOWN_TOKEN_SYMBOL.to_string());
        let decimals = self.token_decimals(&token).await;

        Ok(TokenMeta {
            name,
            symbol,
            decimals,
        })
    }

    pub async fn token_balance(&self, token: &str, holder: &str) -> Result<TokenBalance> {
        let token = TronAddress::parse(token)?;
        let holder = TronAddress::parse(holder)?;

        let words = self
            .client
            .constant_call(&token, "balanceOf(address)", &[ContractArg::Address(holder)])
            .await?;
        let raw = decode_uint(&words)?;
        let decimals = self.token_decimals(&token).await;

        Ok(TokenBalance {
            raw: raw.to_string(),
            decimals,
            balance: amount::from_smallest_units(&raw, decimals),
        })
    }

    pub async fn allowance(&self, token: &str, owner: &str, spender: &str) -> Result<TokenAllowance> {
        let token = TronAddress::parse(token)?;
        let owner = TronAddress::parse(owner)?;
        let spender = TronAddress::parse(spender)?;

        let words = self
            .client
            .constant_call(
                &token,
                "allowance(address,address)",
                &[ContractArg::Address(owner), ContractArg::Address(spender)],
            )
            .await?;
        let raw = decode_uint(&words)?;
        let decimals = self.token_decimals(&token).await;

        Ok(TokenAllowance {
            raw: raw.to_string(),
            decimals,
            allowance: amount::from_smallest_units(&raw, decimals),
        })
    }

    pub async fn transfer(
        &self,
        token: &str,
        to: &str,
        amount_human: &str,
        opts: &TransferOpts,
    ) -> Result<TransferResult> {
        let token = TronAddress::parse(token)?;
        let to = TronAddress::parse(to)?;
        let signing_key = self.resolve_signing_key(opts)?;
        let fee_limit = opts.fee_limit.unwrap_or(self.default_fee_limit);

        let raw = self.to_raw_amount(&token, amount_human).await?;
        let txid = self
            .client
            .send_contract(
                &token,
                "transfer(address,uint256)",
                &[ContractArg::Address(to), ContractArg::Uint(raw)],
                fee_limit,
                &signing_key,
            )
            .await?;

        tracing::info!("TRC20 transfer broadcasted: {}", txid);
        Ok(TransferResult {
            transaction_id: txid,
        })
    }

    pub async fn approve(
        &self,
        token: &str,
        spender: &str,
        amount_human: &str,
        opts: &TransferOpts,
    ) -> Result<TransferResult> {
        let token = TronAddress::parse(token)?;
        let spender = TronAddress::parse(spender)?;
        let signing_key = self.resolve_signing_key(opts)?;
        let fee_limit = opts.fee_limit.unwrap_or(self.default_fee_limit);

        let raw = self.to_raw_amount(&token, amount_human).await?;
        let txid = self
            .client
            .send_contract(
                &token,
                "approve(address,uint256)",
                &[ContractArg::Address(spender), ContractArg::Uint(raw)],
                fee_limit,
                &signing_key,
            )
            .await?;

        tracing::info!("TRC20 approve broadcasted: {}", txid);
        Ok(TransferResult {
            transaction_id: txid,
        })
    }

    pub async fn transfer_from(
        &self,
        token: &str,
        from: &str,
        to: &str,
        amount_human: &str,
        opts: &TransferOpts,
    ) -> Result<TransferResult> {
        let token = TronAddress::parse(token)?;
        let from = TronAddress::parse(from)?;
        let to = TronAddress::parse(to)?;
        let signing_key = self.resolve_signing_key(opts)?;
        let fee_limit = opts.fee_limit.unwrap_or(self.default_fee_limit);

        let raw = self.to_raw_amount(&token, amount_human).await?;
        let txid = self
            .client
            .send_contract(
                &token,
                "transferFrom(address,address,uint256)",
                &[
                    ContractArg::Address(from),
                    ContractArg::Address(to),
                    ContractArg::Uint(raw),
                ],
                fee_limit,
                &signing_key,
            )
            .await?;

        tracing::info!("TRC20 transferFrom broadcasted: {}", txid);
        Ok(TransferResult {
            transaction_id: txid,
        })
    }

    /// One page of TRC-20 transfer history; the holder is handed to the
    /// history endpoint in its base58 form.
    pub async fn transfer_history(
        &self,
        holder: &str,
        limit: Option<u32>,
        fingerprint: Option<&str>,
    ) -> Result<TransferPage> {
        let holder = TronAddress::parse(holder)?;
        let limit = clamp_page_limit(limit);
        self.client.transfer_history(&holder, limit, fingerprint).await
    }

    pub async fn trx_balance(&self, address: &str) -> Result<TrxBalance> {
        let address = TronAddress::parse(address)?;
        let sun = self.client.trx_balance(&address).await?;

        Ok(TrxBalance {
            balance_sun: sun.to_string(),
            balance_trx: amount::from_smallest_units(&sun, TRX_DECIMALS),
        })
    }

    /// Activate a fresh account by sending it a small TRX amount (1 TRX by
    /// default) from the address behind the signing key.
    pub async fn activate(
        &self,
        to: &str,
        amount_sun: Option<u64>,
        opts: &TransferOpts,
    ) -> Result<serde_json::Value> {
        let to = TronAddress::parse(to)?;
        let signing_key = self.resolve_signing_key(opts)?;
        let amount_sun = amount_sun.unwrap_or(DEFAULT_ACTIVATION_AMOUNT_SUN);

        let receipt = self.client.send_trx(&to, amount_sun, &signing_key).await?;
        tracing::info!("Address activation broadcasted to {}", to);
        Ok(receipt)
    }

    async fn to_raw_amount(&self, token: &TronAddress, amount_human: &str) -> Result<BigUint> {
        let decimals = self.token_decimals(token).await;
        amount::to_smallest_units(amount_human, decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const TOKEN_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";
    const HOLDER_B58: &str = "TNPeeaaFB7K9cmo4uQpcU32zGK8G1NYqeL";
    const OWNER_HEX: &str = "418840e6c55b9ada326d211d818c34a994aeced808";

    #[derive(Debug, Clone)]
    struct SentCall {
        selector: String,
        parameter: String,
        fee_limit: u64,
        signing_key: String,
    }

    #[derive(Default)]
    struct MockChain {
        decimals: Option<u32>,
        name: Option<String>,
        symbol: Option<String>,
        read_result: Option<BigUint>,
        txid: String,
        constant_calls: Mutex<u32>,
        sends: Mutex<Vec<SentCall>>,
        trx_sends: Mutex<Vec<(String, u64, String)>>,
        history_calls: Mutex<Vec<(String, u32, Option<String>)>>,
    }

    impl MockChain {
        fn usdt_like() -> Self {
            Self {
                decimals: Some(6),
                name: Some("Tether USD".to_string()),
                symbol: Some("USDT".to_string()),
                read_result: Some(BigUint::from(1_500_000u64)),
                txid: "deadbeef".to_string(),
                ..Default::default()
            }
        }

        fn chain_calls(&self) -> u32 {
            *self.constant_calls.lock().unwrap()
                + self.sends.lock().unwrap().len() as u32
                + self.trx_sends.lock().unwrap().len() as u32
                + self.history_calls.lock().unwrap().len() as u32
        }
    }

    fn uint_word(value: u64) -> Vec<String> {
        vec![format!("{:064x}", value)]
    }

    fn string_blob(text: &str) -> Vec<String> {
        let mut blob = vec![0u8; 31];
        blob.push(0x20);
        blob.extend_from_slice(&[0u8; 31]);
        blob.push(text.len() as u8);
        blob.extend_from_slice(text.as_bytes());
        let padded = blob.len().div_ceil(32) * 32;
        blob.resize(padded, 0);
        vec![hex::encode(blob)]
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn trx_balance(&self, _address: &TronAddress) -> crate::error::Result<BigUint> {
            *self.constant_calls.lock().unwrap() += 1;
            Ok(self.read_result.clone().unwrap_or_default())
        }

        async fn constant_call(
            &self,
            _contract: &TronAddress,
            selector: &str,
            _args: &[ContractArg],
        ) -> crate::error::Result<Vec<String>> {
            *self.constant_calls.lock().unwrap() += 1;
            let unavailable = || AppError::Upstream(format!("{} unavailable", selector));
            match selector {
                "decimals()" => self
                    .decimals
                    .map(|d| uint_word(d as u64))
                    .ok_or_else(unavailable),
                "name()" => self
                    .name
                    .as_deref()
                    .map(string_blob)
                    .ok_or_else(unavailable),
                "symbol()" => self
                    .symbol
                    .as_deref()
                    .map(string_blob)
                    .ok_or_else(unavailable),
                "balanceOf(address)" | "allowance(address,address)" => self
                    .read_result
                    .as_ref()
                    .map(|v| vec![format!("{:064x}", v)])
                    .ok_or_else(unavailable),
                other => Err(AppError::Upstream(format!("unexpected selector {}", other))),
            }
        }

        async fn send_contract(
            &self,
            _contract: &TronAddress,
            selector: &str,
            args: &[ContractArg],
            fee_limit: u64,
            signing_key: &str,
        ) -> crate::error::Result<String> {
            self.sends.lock().unwrap().push(SentCall {
                selector: selector.to_string(),
                parameter: crate::services::chain_client::abi_encode(args)?,
                fee_limit,
                signing_key: signing_key.to_string(),
            });
            Ok(self.txid.clone())
        }

        async fn transfer_history(
            &self,
            holder: &TronAddress,
            limit: u32,
            fingerprint: Option<&str>,
        ) -> crate::error::Result<TransferPage> {
            self.history_calls.lock().unwrap().push((
                holder.to_base58(),
                limit,
                fingerprint.map(str::to_string),
            ));
            Ok(TransferPage {
                data: serde_json::json!({ "data": [] }),
                fingerprint: Some("next".to_string()),
            })
        }

        fn derive_address(&self, _signing_key: &str) -> crate::error::Result<TronAddress> {
            TronAddress::parse(OWNER_HEX)
        }

        async fn send_trx(
            &self,
            to: &TronAddress,
            amount_sun: u64,
            signing_key: &str,
        ) -> crate::error::Result<serde_json::Value> {
            self.trx_sends.lock().unwrap().push((
                to.to_base58(),
                amount_sun,
                signing_key.to_string(),
            ));
            Ok(serde_json::json!({ "result": true }))
        }
    }

    fn service(mock: MockChain) -> TokenTransferService<MockChain> {
        TokenTransferService::new(Arc::new(mock), None, 10_000_000)
    }

    fn service_with_default_key(mock: MockChain) -> TokenTransferService<MockChain> {
        TokenTransferService::new(Arc::new(mock), Some("default-key".to_string()), 10_000_000)
    }

    #[tokio::test]
    async fn transfer_converts_amount_and_passes_fee_limit() {
        let svc = service(MockChain::usdt_like());
        let opts = TransferOpts {
            signing_key: Some("request-key".to_string()),
            fee_limit: Some(15_000_000),
        };

        let result = svc.transfer(TOKEN_HEX, HOLDER_B58, "10.5", &opts).await.unwrap();
        assert_eq!(result.transaction_id, "deadbeef");

        let sends = svc.client.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        let sent = &sends[0];
        assert_eq!(sent.selector, "transfer(address,uint256)");
        assert_eq!(sent.fee_limit, 15_000_000);
        assert_eq!(sent.signing_key, "request-key");
        // second word is the raw amount: 10.5 at 6 decimals
        assert_eq!(sent.parameter[64..], format!("{:064x}", 10_500_000u64));
    }

    #[tokio::test]
    async fn transfer_falls_back_to_configured_defaults() {
        let svc = service_with_default_key(MockChain::usdt_like());

        svc.transfer(TOKEN_HEX, HOLDER_B58, "1", &TransferOpts::default())
            .await
            .unwrap();

        let sends = svc.client.sends.lock().unwrap();
        assert_eq!(sends[0].fee_limit, 10_000_000);
        assert_eq!(sends[0].signing_key, "default-key");
    }

    #[tokio::test]
    async fn transfer_without_any_key_is_rejected_before_io() {
        let svc = service(MockChain::usdt_like());

        let err = svc
            .transfer(TOKEN_HEX, HOLDER_B58, "1", &TransferOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingCredential));
        assert_eq!(svc.client.chain_calls(), 0);
    }

    #[tokio::test]
    async fn invalid_address_fails_before_io() {
        let svc = service_with_default_key(MockChain::usdt_like());

        let err = svc
            .token_balance("not-an-address", HOLDER_B58)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAddress(_)));
        assert_eq!(svc.client.chain_calls(), 0);
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected() {
        let svc = service_with_default_key(MockChain::usdt_like());

        let err = svc
            .transfer(TOKEN_HEX, HOLDER_B58, "1,000", &TransferOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert!(svc.client.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn meta_reads_all_fields() {
        let svc = service(MockChain::usdt_like());
        let meta = svc.token_meta(TOKEN_HEX).await.unwrap();
        assert_eq!(meta.name, "Tether USD");
        assert_eq!(meta.symbol, "USDT");
        assert_eq!(meta.decimals, 6);
    }

    #[tokio::test]
    async fn meta_falls_back_per_field() {
        let mock = MockChain {
            txid: "ignored".to_string(),
            ..Default::default()
        };
        let meta = service(mock).token_meta(TOKEN_HEX).await.unwrap();
        assert_eq!(meta.name, "Unknown");
        assert_eq!(meta.symbol, "UNK");
        assert_eq!(meta.decimals, 6);
    }

    #[tokio::test]
    async fn balance_converts_with_fetched_decimals() {
        let svc = service(MockChain::usdt_like());
        let balance = svc.token_balance(TOKEN_HEX, HOLDER_B58).await.unwrap();
        assert_eq!(balance.raw, "1500000");
        assert_eq!(balance.decimals, 6);
        assert_eq!(balance.balance, "1.5");
    }

    #[tokio::test]
    async fn allowance_uses_three_addresses() {
        let svc = service(MockChain::usdt_like());
        let allowance = svc
            .allowance(TOKEN_HEX, HOLDER_B58, OWNER_HEX)
            .await
            .unwrap();
        assert_eq!(allowance.allowance, "1.5");
    }

    #[tokio::test]
    async fn transfer_from_encodes_three_args() {
        let svc = service_with_default_key(MockChain::usdt_like());
        svc.transfer_from(TOKEN_HEX, OWNER_HEX, HOLDER_B58, "2", &TransferOpts::default())
            .await
            .unwrap();

        let sends = svc.client.sends.lock().unwrap();
        assert_eq!(sends[0].selector, "transferFrom(address,address,uint256)");
        // three 32-byte words
        assert_eq!(sends[0].parameter.len(), 192);
    }

    #[tokio::test]
    async fn history_clamps_limit_and_normalizes_holder() {
        let svc = service(MockChain::usdt_like());

        svc.transfer_history(OWNER_HEX, Some(1000), Some("cursor"))
            .await
            .unwrap();
        svc.transfer_history(HOLDER_B58, None, None).await.unwrap();

        let calls = svc.client.history_calls.lock().unwrap();
        assert_eq!(calls[0].0, HOLDER_B58); // hex input handed over as base58
        assert_eq!(calls[0].1, 200);
        assert_eq!(calls[0].2.as_deref(), Some("cursor"));
        assert_eq!(calls[1].1, 20);
    }

    #[tokio::test]
    async fn trx_balance_scales_sun() {
        let svc = service(MockChain::usdt_like());
        let balance = svc.trx_balance(HOLDER_B58).await.unwrap();
        assert_eq!(balance.balance_sun, "1500000");
        assert_eq!(balance.balance_trx, "1.5");
    }

    #[tokio::test]
    async fn activate_defaults_to_one_trx() {
        let svc = service_with_default_key(MockChain::usdt_like());
        svc.activate(HOLDER_B58, None, &TransferOpts::default())
            .await
            .unwrap();

        let sends = svc.client.trx_sends.lock().unwrap();
        assert_eq!(sends[0], (HOLDER_B58.to_string(), 1_000_000, "default-key".to_string()));
    }

    #[tokio::test]
    async fn activate_without_key_is_rejected() {
        let svc = service(MockChain::usdt_like());
        let err = svc
            .activate(HOLDER_B58, None, &TransferOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingCredential));
        assert_eq!(svc.client.chain_calls(), 0);
    }
}
