//! Balance queries. The ledger tracks a balance as any number of holding
//! contracts; this service aggregates them per token class for display
//! and refreshes the mirror rows from the result.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use canton_ledger::{holding, LedgerClient, Party, TokenName};

use crate::error::GatewayError;
use crate::mirror::{HoldingRecord, MirrorStore};

/// Aggregated position in one token class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub issuer: Party,
    pub token_name: TokenName,
    pub amount: Decimal,
    /// Number of holding contracts backing the balance. A transfer or
    /// burn spends from a single contract, so a fragmented balance may
    /// not be spendable in one piece.
    pub holding_count: usize,
}

pub struct HoldingsService {
    client: Arc<LedgerClient>,
    mirror: Arc<MirrorStore>,
}

impl HoldingsService {
    pub fn new(client: Arc<LedgerClient>, mirror: Arc<MirrorStore>) -> Self {
        Self { client, mirror }
    }

    /// Per-token balances of `owner`, freshly queried from the ledger.
    pub async fn balances(&self, owner: &Party) -> Result<Vec<TokenBalance>, GatewayError> {
        let holdings = holding::holdings_for(&self.client, owner).await?;

        let mut aggregated: BTreeMap<(Party, TokenName), (Decimal, usize)> = BTreeMap::new();
        for contract in &holdings {
            let key = (
                contract.payload.issuer.clone(),
                contract.payload.token_name.clone(),
            );
            let entry = aggregated.entry(key).or_insert((Decimal::ZERO, 0));
            entry.0 += contract.payload.amount;
            entry.1 += 1;
        }

        let balances: Vec<TokenBalance> = aggregated
            .into_iter()
            .map(|((issuer, token_name), (amount, holding_count))| TokenBalance {
                issuer,
                token_name,
                amount,
                holding_count,
            })
            .collect();

        let rows = balances
            .iter()
            .map(|balance| HoldingRecord {
                owner: owner.clone(),
                issuer: balance.issuer.clone(),
                token_name: balance.token_name.clone(),
                amount: balance.amount,
                updated_at: Utc::now(),
            })
            .collect();
        if let Err(err) = self.mirror.replace_holdings_for(owner, rows).await {
            warn!(%err, owner = %owner, "failed to mirror holdings snapshot");
        }

        Ok(balances)
    }

    /// Spendable balance of `owner` in one token class.
    pub async fn token_balance(
        &self,
        owner: &Party,
        issuer: &Party,
        token_name: &TokenName,
    ) -> Result<Decimal, GatewayError> {
        let holdings =
            holding::holdings_of_token(&self.client, owner, issuer, token_name).await?;
        Ok(holding::total_amount(&holdings))
    }
}
