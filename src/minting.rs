//! Mint and burn orchestration. Both directions pre-check against a fresh
//! ledger snapshot so obvious failures never reach the ledger, which
//! enforces the same rules again.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use canton_ledger::contracts::{MintRequest, TokenHolding};
use canton_ledger::{
    holding, mint, token, ActiveContract, ContractId, LedgerClient, Party, TokenName,
};

use crate::error::GatewayError;
use crate::mirror::MirrorStore;

pub struct MintBurnService {
    client: Arc<LedgerClient>,
    mirror: Arc<MirrorStore>,
}

impl MintBurnService {
    pub fn new(client: Arc<LedgerClient>, mirror: Arc<MirrorStore>) -> Self {
        Self { client, mirror }
    }

    /// Mint `amount` of the issuer's token to `recipient`. The token class
    /// must already be registered. Returns the recipient's new holding id.
    #[tracing::instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn mint(
        &self,
        issuer: &Party,
        recipient: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<ContractId, GatewayError> {
        if amount <= Decimal::ZERO {
            return Err(GatewayError::validation("mint amount must be positive"));
        }
        if token::find_token(&self.client, issuer, issuer, token_name)
            .await?
            .is_none()
        {
            return Err(GatewayError::UnknownToken {
                issuer: issuer.clone(),
                token_name: token_name.clone(),
            });
        }

        let request = MintRequest {
            issuer: issuer.clone(),
            recipient: recipient.clone(),
            token_name: token_name.clone(),
            mint_amount: amount,
        };
        let holding_id = mint::mint(&self.client, issuer, &request).await?;

        if let Err(err) = self
            .mirror
            .apply_mint(issuer, recipient, token_name, amount)
            .await
        {
            warn!(%err, token = %token_name, "failed to mirror mint");
        }
        Ok(holding_id)
    }

    /// Burn `amount` from the owner's largest holding of the token.
    /// Returns the remainder holding id, absent on a full burn.
    #[tracing::instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn burn(
        &self,
        owner: &Party,
        issuer: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<Option<ContractId>, GatewayError> {
        let holding = self.spendable_holding(owner, issuer, token_name, amount).await?;
        let remainder = mint::burn(&self.client, owner, &holding, amount).await?;
        self.mirror_burn(owner, issuer, token_name, amount).await;
        Ok(remainder)
    }

    /// Issuer-initiated burn against a holding owned by `owner`.
    #[tracing::instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn issuer_burn(
        &self,
        issuer: &Party,
        owner: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<Option<ContractId>, GatewayError> {
        let holding = self.spendable_holding(owner, issuer, token_name, amount).await?;
        let remainder = mint::issuer_burn(&self.client, issuer, &holding, amount).await?;
        self.mirror_burn(owner, issuer, token_name, amount).await;
        Ok(remainder)
    }

    /// Fresh holding able to cover `amount`, or `ExceedsHolding` without
    /// any ledger write. A burn consumes one holding contract, so the
    /// available figure reported back is the largest single holding, not
    /// the total balance.
    async fn spendable_holding(
        &self,
        owner: &Party,
        issuer: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<ActiveContract<TokenHolding>, GatewayError> {
        if amount <= Decimal::ZERO {
            return Err(GatewayError::validation("burn amount must be positive"));
        }
        let holdings =
            holding::holdings_of_token(&self.client, owner, issuer, token_name).await?;
        let largest = holdings
            .iter()
            .map(|h| h.payload.amount)
            .max()
            .unwrap_or(Decimal::ZERO);
        holding::pick_spendable(holdings, amount).ok_or(GatewayError::ExceedsHolding {
            requested: amount,
            available: largest,
        })
    }

    async fn mirror_burn(&self, owner: &Party, issuer: &Party, token_name: &TokenName, amount: Decimal) {
        if let Err(err) = self.mirror.apply_burn(owner, issuer, token_name, amount).await {
            warn!(%err, token = %token_name, "failed to mirror burn");
        }
    }
}
