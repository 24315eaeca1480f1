use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{
        AmountInput, ApiResponse, TokenAllowance, TokenBalance, TokenMeta, TransferOpts,
        TransferPage, TransferResult, TrxBalance,
    },
    tron::TronAddress,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct MetaRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct BalanceRequest {
    pub token: String,
    pub holder: String,
}

#[derive(Debug, Deserialize)]
pub struct AllowanceRequest {
    pub token: String,
    pub owner: String,
    pub spender: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub token: String,
    pub to: String,
    pub amount: AmountInput,
    pub signing_key: Option<String>,
    pub fee_limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub token: String,
    pub spender: String,
    pub amount: AmountInput,
    pub signing_key: Option<String>,
    pub fee_limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TransferFromRequest {
    pub token: String,
    pub from: String,
    pub to: String,
    pub amount: AmountInput,
    pub signing_key: Option<String>,
    pub fee_limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub to: String,
    pub amount_sun: Option<u64>,
    pub signing_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransfersQuery {
    pub limit: Option<u32>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub address: String,
    pub address_hex: String,
    pub trx: TrxBalance,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// GET /api/v1/account/{address}
pub async fn get_account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<AccountResponse>>> {
    require("address", &address)?;
    let parsed = TronAddress::parse(&address)?;
    let trx = state.tron.trx_balance(&address).await?;

    Ok(Json(ApiResponse::success(AccountResponse {
        address: parsed.to_base58(),
        address_hex: parsed.to_hex(),
        trx,
    })))
}

/// GET /api/v1/account/{address}/transfers
pub async fn get_transfer_history(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<TransfersQuery>,
) -> Result<Json<ApiResponse<TransferPage>>> {
    require("address", &address)?;
    let page = state
        .tron
        .transfer_history(&address, query.limit, query.fingerprint.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// POST /api/v1/account/activate
pub async fn activate_account(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    require("to", &req.to)?;
    let opts = TransferOpts {
        signing_key: req.signing_key,
        fee_limit: None,
    };
    let receipt = state.tron.activate(&req.to, req.amount_sun, &opts).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt))))
}

/// POST /api/v1/trc20/meta
pub async fn get_token_meta(
    State(state): State<AppState>,
    Json(req): Json<MetaRequest>,
) -> Result<Json<ApiResponse<TokenMeta>>> {
    require("token", &req.token)?;
    let meta = state.tron.token_meta(&req.token).await?;
    Ok(Json(ApiResponse::success(meta)))
}

/// POST /api/v1/trc20/balance
pub async fn get_token_balance(
    State(state): State<AppState>,
    Json(req): Json<BalanceRequest>,
) -> Result<Json<ApiResponse<TokenBalance>>> {
    require("token", &req.token)?;
    require("holder", &req.holder)?;
    let balance = state.tron.token_balance(&req.token, &req.holder).await?;
    Ok(Json(ApiResponse::success(balance)))
}

/// POST /api/v1/trc20/allowance
pub async fn get_allowance(
    State(state): State<AppState>,
    Json(req): Json<AllowanceRequest>,
) -> Result<Json<ApiResponse<TokenAllowance>>> {
    require("token", &req.token)?;
    require("owner", &req.owner)?;
    require("spender", &req.spender)?;
    let allowance = state
        .tron
        .allowance(&req.token, &req.owner, &req.spender)
        .await?;
    Ok(Json(ApiResponse::success(allowance)))
}

/// POST /api/v1/trc20/transfer
pub async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferResult>>)> {
    require("token", &req.token)?;
    require("to", &req.to)?;
    let opts = TransferOpts {
        signing_key: req.signing_key,
        fee_limit: req.fee_limit,
    };
    let result = state
        .tron
        .transfer(&req.token, &req.to, &req.amount.as_decimal_string(), &opts)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

/// POST /api/v1/trc20/approve
pub async fn approve(
    State(state): State<AppState>,
    Json(req): Json<ApproveRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferResult>>)> {
    require("token", &req.token)?;
    require("spender", &req.spender)?;
    let opts = TransferOpts {
        signing_key: req.signing_key,
        fee_limit: req.fee_limit,
    };
    let result = state
        .tron
        .approve(&req.token, &req.spender, &req.amount.as_decimal_string(), &opts)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

/// POST /api/v1/trc20/transfer-from
pub async fn transfer_from(
    State(state): State<AppState>,
    Json(req): Json<TransferFromRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferResult>>)> {
    require("token", &req.token)?;
    require("from", &req.from)?;
    require("to", &req.to)?;
    let opts = TransferOpts {
        signing_key: req.signing_key,
        fee_limit: req.fee_limit,
    };
    let result = state
        .tron
        .transfer_from(
            &req.token,
            &req.from,
            &req.to,
            &req.amount.as_decimal_string(),
            &opts,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}
