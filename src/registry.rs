//! Token registry orchestration: metadata creation, listing, and supply
//! updates, with the mirror refreshed after each successful ledger call.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use canton_ledger::contracts::TokenMetadata;
use canton_ledger::{token, ActiveContract, ContractId, LedgerClient, Party, TokenName};

use crate::error::GatewayError;
use crate::mirror::{MirrorStore, TokenRecord};

pub struct RegistryService {
    client: Arc<LedgerClient>,
    mirror: Arc<MirrorStore>,
    operator: Party,
}

impl RegistryService {
    pub fn new(client: Arc<LedgerClient>, mirror: Arc<MirrorStore>, operator: Party) -> Self {
        Self {
            client,
            mirror,
            operator,
        }
    }

    /// Create the metadata contract for a new token class. The (issuer,
    /// token name) pair must not already exist; this is checked against a
    /// fresh ledger query, not the mirror.
    pub async fn create_token(
        &self,
        issuer: &Party,
        metadata: TokenMetadata,
    ) -> Result<ContractId, GatewayError> {
        if metadata.total_supply < Decimal::ZERO {
            return Err(GatewayError::validation("total supply must not be negative"));
        }
        if token::find_token(&self.client, issuer, issuer, &metadata.token_name)
            .await?
            .is_some()
        {
            return Err(GatewayError::validation(format!(
                "token {} already exists for issuer {}",
                metadata.token_name, issuer
            )));
        }

        let contract_id = token::create_token(&self.client, issuer, &metadata).await?;

        if let Err(err) = self.mirror.upsert_token(TokenRecord::from(&metadata)).await {
            warn!(%err, token = %metadata.token_name, "failed to mirror created token");
        }
        Ok(contract_id)
    }

    /// List every token class visible to the operator, across both
    /// template versions. The mirror rows are refreshed from the result.
    pub async fn list_tokens(
        &self,
    ) -> Result<Vec<ActiveContract<TokenMetadata>>, GatewayError> {
        let tokens = token::list_tokens(&self.client, &self.operator).await?;
        for contract in &tokens {
            if let Err(err) = self
                .mirror
                .upsert_token(TokenRecord::from(&contract.payload))
                .await
            {
                warn!(%err, token = %contract.payload.token_name, "failed to mirror token");
            }
        }
        Ok(tokens)
    }

    /// Exercise `UpdateTotalSupply` on the token's metadata contract and
    /// return the resulting contract id.
    pub async fn update_total_supply(
        &self,
        issuer: &Party,
        token_name: &TokenName,
        new_total_supply: Decimal,
    ) -> Result<ContractId, GatewayError> {
        if new_total_supply < Decimal::ZERO {
            return Err(GatewayError::validation("total supply must not be negative"));
        }

        let contract_id =
            token::update_total_supply(&self.client, issuer, token_name, new_total_supply)
                .await?
                .ok_or_else(|| GatewayError::UnknownToken {
                    issuer: issuer.clone(),
                    token_name: token_name.clone(),
                })?;

        match token::find_token(&self.client, issuer, issuer, token_name).await {
            Ok(Some(updated)) => {
                if let Err(err) = self
                    .mirror
                    .upsert_token(TokenRecord::from(&updated.payload))
                    .await
                {
                    warn!(%err, token = %token_name, "failed to mirror updated supply");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(%err, token = %token_name, "failed to re-read updated token"),
        }
        Ok(contract_id)
    }
}
