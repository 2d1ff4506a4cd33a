use rust_decimal::Decimal;
use std::slice;
use tracing::info;

use crate::client::{ActiveContract, LedgerClient};
use crate::contracts::{TokenMetadata, UpdateTotalSupplyArgs};
use crate::error::LedgerError;
use crate::templates::LogicalTemplate;
use crate::{ContractId, Party, TokenName};

/// Create the metadata contract for a new token class under the current
/// template version.
pub async fn create_token(
    client: &LedgerClient,
    issuer: &Party,
    metadata: &TokenMetadata,
) -> Result<ContractId, LedgerError> {
    let template = client.catalog().current(LogicalTemplate::TokenMetadata);
    let created = client
        .create(slice::from_ref(issuer), &template, metadata)
        .await?;
    info!(
        token = %metadata.token_name,
        contract_id = %created.contract_id,
        "token metadata created"
    );
    Ok(created.contract_id)
}

pub async fn list_tokens(
    client: &LedgerClient,
    reader: &Party,
) -> Result<Vec<ActiveContract<TokenMetadata>>, LedgerError> {
    client
        .query_merged(
            slice::from_ref(reader),
            LogicalTemplate::TokenMetadata,
            &serde_json::json!({}),
        )
        .await
}

pub async fn find_token(
    client: &LedgerClient,
    reader: &Party,
    issuer: &Party,
    token_name: &TokenName,
) -> Result<Option<ActiveContract<TokenMetadata>>, LedgerError> {
    let filter = serde_json::json!({ "issuer": issuer, "tokenName": token_name });
    let matches = client
        .query_merged(
            slice::from_ref(reader),
            LogicalTemplate::TokenMetadata,
            &filter,
        )
        .await?;
    Ok(matches.into_iter().next())
}

/// Exercise `UpdateTotalSupply` on the token's metadata contract.
/// Returns `None` when no metadata contract exists for the token.
pub async fn update_total_supply(
    client: &LedgerClient,
    issuer: &Party,
    token_name: &TokenName,
    new_total_supply: Decimal,
) -> Result<Option<ContractId>, LedgerError> {
    let Some(metadata) = find_token(client, issuer, issuer, token_name).await? else {
        return Ok(None);
    };
    let result = client
        .exercise(
            slice::from_ref(issuer),
            &metadata.template_id,
            &metadata.contract_id,
            "UpdateTotalSupply",
            &UpdateTotalSupplyArgs { new_total_supply },
        )
        .await?;
    Ok(Some(
        result.result_contract_id().unwrap_or(metadata.contract_id),
    ))
}
