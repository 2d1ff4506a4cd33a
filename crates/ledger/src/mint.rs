use rust_decimal::Decimal;
use std::slice;
use tracing::info;

use crate::client::{ActiveContract, LedgerClient};
use crate::contracts::{BurnArgs, EmptyArgs, MintRequest, TokenHolding};
use crate::error::LedgerError;
use crate::templates::LogicalTemplate;
use crate::{ContractId, Party};

/// Mint tokens: create a `MintRequest` contract, then exercise
/// `ExecuteMint` on it in the same call. There is no user-visible
/// intermediate state. Returns the recipient's new holding contract id.
pub async fn mint(
    client: &LedgerClient,
    issuer: &Party,
    request: &MintRequest,
) -> Result<ContractId, LedgerError> {
    let template = client.catalog().current(LogicalTemplate::MintRequest);
    let act_as = slice::from_ref(issuer);

    let created = client.create(act_as, &template, request).await?;
    let result = client
        .exercise(
            act_as,
            &template,
            &created.contract_id,
            "ExecuteMint",
            &EmptyArgs {},
        )
        .await?;

    let holding_id = result
        .result_contract_id()
        .or_else(|| {
            result
                .created_with_entity("TokenHolding")
                .map(|event| event.contract_id.clone())
        })
        .ok_or(LedgerError::EmptyResult)?;

    info!(
        recipient = %request.recipient,
        token = %request.token_name,
        amount = %request.mint_amount,
        holding_id = %holding_id,
        "mint executed"
    );
    Ok(holding_id)
}

/// Self-burn: exercise `Burn` on the owner's holding. Returns the
/// remainder holding id, absent when the holding was burned in full.
pub async fn burn(
    client: &LedgerClient,
    owner: &Party,
    holding: &ActiveContract<TokenHolding>,
    amount: Decimal,
) -> Result<Option<ContractId>, LedgerError> {
    let result = client
        .exercise(
            slice::from_ref(owner),
            &holding.template_id,
            &holding.contract_id,
            "Burn",
            &BurnArgs {
                burn_amount: amount,
            },
        )
        .await?;
    Ok(result.result_contract_id())
}

/// Issuer-initiated burn: `IssuerBurn` on a holding owned by someone
/// else, authorized by the issuer.
pub async fn issuer_burn(
    client: &LedgerClient,
    issuer: &Party,
    holding: &ActiveContract<TokenHolding>,
    amount: Decimal,
) -> Result<Option<ContractId>, LedgerError> {
    let result = client
        .exercise(
            slice::from_ref(issuer),
            &holding.template_id,
            &holding.contract_id,
            "IssuerBurn",
            &BurnArgs {
                burn_amount: amount,
            },
        )
        .await?;
    Ok(result.result_contract_id())
}
