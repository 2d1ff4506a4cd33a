use rust_decimal::Decimal;
use std::slice;

use crate::client::{ActiveContract, LedgerClient};
use crate::contracts::TokenHolding;
use crate::error::LedgerError;
use crate::templates::LogicalTemplate;
use crate::{Party, TokenName};

/// All active holdings owned by `owner`, across both template versions.
pub async fn holdings_for(
    client: &LedgerClient,
    owner: &Party,
) -> Result<Vec<ActiveContract<TokenHolding>>, LedgerError> {
    client
        .query_merged(
            slice::from_ref(owner),
            LogicalTemplate::TokenHolding,
            &serde_json::json!({ "owner": owner }),
        )
        .await
}

/// Holdings of one token class owned by `owner`.
pub async fn holdings_of_token(
    client: &LedgerClient,
    owner: &Party,
    issuer: &Party,
    token_name: &TokenName,
) -> Result<Vec<ActiveContract<TokenHolding>>, LedgerError> {
    client
        .query_merged(
            slice::from_ref(owner),
            LogicalTemplate::TokenHolding,
            &serde_json::json!({
                "owner": owner,
                "issuer": issuer,
                "tokenName": token_name,
            }),
        )
        .await
}

/// Freshly fetched holding able to cover `amount`, or `None` when no
/// single holding suffices. The `None` case is what rejects a transfer
/// or burn before any ledger write happens.
pub async fn find_spendable(
    client: &LedgerClient,
    owner: &Party,
    issuer: &Party,
    token_name: &TokenName,
    amount: Decimal,
) -> Result<Option<ActiveContract<TokenHolding>>, LedgerError> {
    let holdings = holdings_of_token(client, owner, issuer, token_name).await?;
    Ok(pick_spendable(holdings, amount))
}

/// Pick the largest holding when it can cover `amount`. Holdings are not
/// merged or split here; a total balance spread over several smaller
/// holdings does not qualify.
pub fn pick_spendable(
    mut holdings: Vec<ActiveContract<TokenHolding>>,
    amount: Decimal,
) -> Option<ActiveContract<TokenHolding>> {
    holdings.sort_by(|a, b| b.payload.amount.cmp(&a.payload.amount));
    holdings
        .into_iter()
        .next()
        .filter(|holding| holding.payload.amount >= amount)
}

/// Sum of the holding amounts, the party's spendable balance.
pub fn total_amount(holdings: &[ActiveContract<TokenHolding>]) -> Decimal {
    holdings.iter().map(|holding| holding.payload.amount).sum()
}
