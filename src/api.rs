use canton_ledger::contracts::TokenMetadata;
use canton_ledger::{ActiveContract, ContractId, Party, TokenName};
use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{Route, State, get, post, routes};
use rust_decimal::Decimal;

use crate::Services;
use crate::holdings::TokenBalance;
use crate::mirror::{TransactionRecord, UserRecord};
use crate::transfer::TransferOutcome;

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct TokenView {
    contract_id: ContractId,
    issuer: Party,
    token_name: TokenName,
    currency: String,
    quantity_precision: u32,
    price_precision: u32,
    total_supply: Decimal,
    description: String,
}

impl From<ActiveContract<TokenMetadata>> for TokenView {
    fn from(contract: ActiveContract<TokenMetadata>) -> Self {
        Self {
            contract_id: contract.contract_id,
            issuer: contract.payload.issuer,
            token_name: contract.payload.token_name,
            currency: contract.payload.currency,
            quantity_precision: contract.payload.quantity_precision,
            price_precision: contract.payload.price_precision,
            total_supply: contract.payload.total_supply,
            description: contract.payload.description,
        }
    }
}

/// Terminal state of a transfer proposal as reported to API and CLI
/// consumers. `Stale` is a success from the caller's point of view:
/// the proposal was already resolved by someone else.
#[derive(Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
enum TransferStateView {
    Completed {
        holding_id: Option<ContractId>,
        is_legacy: bool,
    },
    Rejected {
        is_legacy: bool,
        tokens_restored: bool,
    },
    Stale {
        message: String,
    },
}

impl From<TransferOutcome> for TransferStateView {
    fn from(outcome: TransferOutcome) -> Self {
        match outcome {
            TransferOutcome::Completed {
                holding_id,
                is_legacy,
            } => Self::Completed {
                holding_id,
                is_legacy,
            },
            TransferOutcome::Rejected {
                is_legacy,
                tokens_restored,
            } => Self::Rejected {
                is_legacy,
                tokens_restored,
            },
            TransferOutcome::Stale { message } => Self::Stale { message },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CreateTokenRequest {
    issuer: Party,
    token_name: TokenName,
    currency: String,
    quantity_precision: u32,
    price_precision: u32,
    total_supply: Decimal,
    description: String,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum CreateTokenResponse {
    #[serde(rename = "true")]
    Success { contract_id: ContractId },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum ListTokensResponse {
    #[serde(rename = "true")]
    Success { tokens: Vec<TokenView> },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct UpdateSupplyRequest {
    issuer: Party,
    token_name: TokenName,
    new_total_supply: Decimal,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum UpdateSupplyResponse {
    #[serde(rename = "true")]
    Success { contract_id: ContractId },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum HoldingsResponse {
    #[serde(rename = "true")]
    Success { holdings: Vec<TokenBalance> },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct TransferRequest {
    sender: Party,
    recipient: Party,
    issuer: Party,
    token_name: TokenName,
    amount: Decimal,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum TransferResponse {
    #[serde(rename = "true")]
    Success {
        proposal_id: ContractId,
        requires_acceptance: bool,
    },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct ResolveTransferRequest {
    party: Party,
    proposal_id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum ResolveTransferResponse {
    #[serde(rename = "true")]
    Success { outcome: TransferStateView },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct MintTokensRequest {
    issuer: Party,
    recipient: Party,
    token_name: TokenName,
    amount: Decimal,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum MintResponse {
    #[serde(rename = "true")]
    Success { holding_id: ContractId },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct BurnTokensRequest {
    owner: Party,
    issuer: Party,
    token_name: TokenName,
    amount: Decimal,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum BurnResponse {
    #[serde(rename = "true")]
    Success { remainder_id: Option<ContractId> },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct ResolvePartyRequest {
    subject: String,
    display_name: String,
    email: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum ResolvePartyResponse {
    #[serde(rename = "true")]
    Success { user: UserRecord },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct LogoutRequest {
    subject: String,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum LogoutResponse {
    #[serde(rename = "true")]
    Success { message: String },
    #[serde(rename = "false")]
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "success")]
enum TransactionsResponse {
    #[serde(rename = "true")]
    Success {
        transactions: Vec<TransactionRecord>,
    },
    #[serde(rename = "false")]
    Error { error: String },
}

#[get("/health")]
fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

#[post("/tokens", format = "json", data = "<request>")]
async fn create_token(
    request: Json<CreateTokenRequest>,
    services: &State<Services>,
) -> Json<CreateTokenResponse> {
    let CreateTokenRequest {
        issuer,
        token_name,
        currency,
        quantity_precision,
        price_precision,
        total_supply,
        description,
    } = request.into_inner();

    let metadata = TokenMetadata {
        issuer: issuer.clone(),
        token_name,
        currency,
        quantity_precision,
        price_precision,
        total_supply,
        description,
    };

    match services.registry.create_token(&issuer, metadata).await {
        Ok(contract_id) => Json(CreateTokenResponse::Success { contract_id }),
        Err(e) => Json(CreateTokenResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[get("/tokens")]
async fn list_tokens(services: &State<Services>) -> Json<ListTokensResponse> {
    match services.registry.list_tokens().await {
        Ok(tokens) => Json(ListTokensResponse::Success {
            tokens: tokens.into_iter().map(TokenView::from).collect(),
        }),
        Err(e) => Json(ListTokensResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/tokens/supply", format = "json", data = "<request>")]
async fn update_supply(
    request: Json<UpdateSupplyRequest>,
    services: &State<Services>,
) -> Json<UpdateSupplyResponse> {
    match services
        .registry
        .update_total_supply(
            &request.issuer,
            &request.token_name,
            request.new_total_supply,
        )
        .await
    {
        Ok(contract_id) => Json(UpdateSupplyResponse::Success { contract_id }),
        Err(e) => Json(UpdateSupplyResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[get("/holdings/<party>")]
async fn holdings(party: &str, services: &State<Services>) -> Json<HoldingsResponse> {
    let owner = match Party::new(party) {
        Ok(owner) => owner,
        Err(e) => {
            return Json(HoldingsResponse::Error {
                error: e.to_string(),
            });
        }
    };

    match services.holdings.balances(&owner).await {
        Ok(holdings) => Json(HoldingsResponse::Success { holdings }),
        Err(e) => Json(HoldingsResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/transfers", format = "json", data = "<request>")]
async fn propose_transfer(
    request: Json<TransferRequest>,
    services: &State<Services>,
) -> Json<TransferResponse> {
    match services
        .transfers
        .propose(
            &request.sender,
            &request.recipient,
            &request.issuer,
            &request.token_name,
            request.amount,
        )
        .await
    {
        Ok(receipt) => Json(TransferResponse::Success {
            proposal_id: receipt.proposal_id,
            requires_acceptance: receipt.requires_acceptance,
        }),
        Err(e) => Json(TransferResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/transfers/accept", format = "json", data = "<request>")]
async fn accept_transfer(
    request: Json<ResolveTransferRequest>,
    services: &State<Services>,
) -> Json<ResolveTransferResponse> {
    match services
        .transfers
        .accept(&request.party, &request.proposal_id)
        .await
    {
        Ok(outcome) => Json(ResolveTransferResponse::Success {
            outcome: outcome.into(),
        }),
        Err(e) => Json(ResolveTransferResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/transfers/reject", format = "json", data = "<request>")]
async fn reject_transfer(
    request: Json<ResolveTransferRequest>,
    services: &State<Services>,
) -> Json<ResolveTransferResponse> {
    match services
        .transfers
        .reject(&request.party, &request.proposal_id)
        .await
    {
        Ok(outcome) => Json(ResolveTransferResponse::Success {
            outcome: outcome.into(),
        }),
        Err(e) => Json(ResolveTransferResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/mint", format = "json", data = "<request>")]
async fn mint_tokens(
    request: Json<MintTokensRequest>,
    services: &State<Services>,
) -> Json<MintResponse> {
    match services
        .minting
        .mint(
            &request.issuer,
            &request.recipient,
            &request.token_name,
            request.amount,
        )
        .await
    {
        Ok(holding_id) => Json(MintResponse::Success { holding_id }),
        Err(e) => Json(MintResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/burn", format = "json", data = "<request>")]
async fn burn_tokens(
    request: Json<BurnTokensRequest>,
    services: &State<Services>,
) -> Json<BurnResponse> {
    match services
        .minting
        .burn(
            &request.owner,
            &request.issuer,
            &request.token_name,
            request.amount,
        )
        .await
    {
        Ok(remainder_id) => Json(BurnResponse::Success { remainder_id }),
        Err(e) => Json(BurnResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/parties/resolve", format = "json", data = "<request>")]
async fn resolve_party(
    request: Json<ResolvePartyRequest>,
    services: &State<Services>,
) -> Json<ResolvePartyResponse> {
    let ResolvePartyRequest {
        subject,
        display_name,
        email,
    } = request.into_inner();

    match services.accounts.resolve(&subject, &display_name, email).await {
        Ok(user) => Json(ResolvePartyResponse::Success { user }),
        Err(e) => Json(ResolvePartyResponse::Error {
            error: e.to_string(),
        }),
    }
}

#[post("/auth/logout", format = "json", data = "<request>")]
async fn logout(request: Json<LogoutRequest>, services: &State<Services>) -> Json<LogoutResponse> {
    if request.subject.trim().is_empty() {
        return Json(LogoutResponse::Error {
            error: "subject must not be empty".to_string(),
        });
    }

    services.accounts.logout(&request.subject);
    Json(LogoutResponse::Success {
        message: "Session cleared".to_string(),
    })
}

#[get("/transactions/<party>")]
async fn transactions(party: &str, services: &State<Services>) -> Json<TransactionsResponse> {
    let party = match Party::new(party) {
        Ok(party) => party,
        Err(e) => {
            return Json(TransactionsResponse::Error {
                error: e.to_string(),
            });
        }
    };

    let transactions = services.mirror.transactions_for(&party).await;
    Json(TransactionsResponse::Success { transactions })
}

pub(crate) fn routes() -> Vec<Route> {
    routes![
        health,
        create_token,
        list_tokens,
        update_supply,
        holdings,
        propose_transfer,
        accept_transfer,
        reject_transfer,
        mint_tokens,
        burn_tokens,
        resolve_party,
        logout,
        transactions,
    ]
}
