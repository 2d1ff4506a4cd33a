//! Transfer orchestration over the two-phase ledger protocol.
//!
//! Proposing locks the amount out of the sender's spendable holdings;
//! accepting or rejecting resolves the lock. The orchestrator front-runs
//! obvious failures with a fresh ledger lookup, keeps the mirror in step
//! after each successful ledger call, and reports stale proposals as a
//! soft outcome instead of an error.
//!
//! Concurrent proposals against the same holding are not serialized here.
//! The ledger archives the holding on first use, so the loser of the race
//! gets the ledger's own conflict rejection, unretried.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use canton_ledger::contracts::TokenHolding;
use canton_ledger::transfer::TransferResolution;
use canton_ledger::{holding, transfer, ContractId, LedgerClient, Party, TokenName};

use crate::error::GatewayError;
use crate::mirror::MirrorStore;

/// Result of a successful proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposeReceipt {
    pub proposal_id: ContractId,
    /// Always true: nothing moves until the recipient acts.
    pub requires_acceptance: bool,
}

/// Result of resolving a proposal through accept or reject.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Accept succeeded. `holding_id` is the recipient's new holding when
    /// the exercise events carried it.
    Completed {
        holding_id: Option<ContractId>,
        is_legacy: bool,
    },
    /// Reject succeeded. `tokens_restored` is false on the legacy path,
    /// where the contract code burns the locked amount instead of
    /// returning it.
    Rejected {
        is_legacy: bool,
        tokens_restored: bool,
    },
    /// The proposal references an archived contract and can never be
    /// resolved. Nothing changed on the ledger and nothing is retried.
    Stale { message: String },
}

pub struct TransferOrchestrator {
    client: Arc<LedgerClient>,
    mirror: Arc<MirrorStore>,
}

impl TransferOrchestrator {
    pub fn new(client: Arc<LedgerClient>, mirror: Arc<MirrorStore>) -> Self {
        Self { client, mirror }
    }

    /// Propose a transfer from `sender` to `recipient`.
    ///
    /// The spendable check runs against a fresh ledger query and must find
    /// a single holding covering the full amount; when it does not, the
    /// proposal is rejected locally without any ledger write.
    #[tracing::instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn propose(
        &self,
        sender: &Party,
        recipient: &Party,
        issuer: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<ProposeReceipt, GatewayError> {
        if amount <= Decimal::ZERO {
            return Err(GatewayError::validation("transfer amount must be positive"));
        }
        if sender == recipient {
            return Err(GatewayError::validation(
                "sender and recipient are the same party",
            ));
        }

        let holdings =
            holding::holdings_of_token(&self.client, sender, issuer, token_name).await?;
        let available = holding::total_amount(&holdings);
        let Some(spendable) = holding::pick_spendable(holdings, amount) else {
            return Err(GatewayError::InsufficientBalance {
                requested: amount,
                available,
            });
        };

        let proposal_id =
            transfer::propose(&self.client, sender, &spendable, recipient, amount).await?;

        if let Err(err) = self
            .mirror
            .apply_transfer_proposed(
                sender,
                recipient,
                issuer,
                token_name,
                amount,
                proposal_id.to_string(),
            )
            .await
        {
            warn!(%err, proposal_id = %proposal_id, "failed to mirror proposed transfer");
        }

        Ok(ProposeReceipt {
            proposal_id,
            requires_acceptance: true,
        })
    }

    /// Accept a pending proposal as its recipient.
    #[tracing::instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn accept(
        &self,
        recipient: &Party,
        proposal_id: &str,
    ) -> Result<TransferOutcome, GatewayError> {
        let proposal_id = parse_proposal_id(proposal_id)?;

        match transfer::accept(&self.client, recipient, &proposal_id).await? {
            TransferResolution::Completed {
                holding,
                used_legacy,
            } => {
                let holding_id = holding.as_ref().map(|event| event.contract_id.clone());
                self.mirror_accepted(&proposal_id, holding.as_ref().map(|e| &e.payload))
                    .await;
                Ok(TransferOutcome::Completed {
                    holding_id,
                    is_legacy: used_legacy,
                })
            }
            TransferResolution::Stale { message } => {
                self.mirror_stale(&proposal_id, &message).await;
                Ok(TransferOutcome::Stale { message })
            }
        }
    }

    /// Reject a pending proposal as its recipient. On the current template
    /// the locked amount returns to the sender; on the legacy template it
    /// does not, and the outcome says so.
    #[tracing::instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn reject(
        &self,
        recipient: &Party,
        proposal_id: &str,
    ) -> Result<TransferOutcome, GatewayError> {
        let proposal_id = parse_proposal_id(proposal_id)?;

        match transfer::reject(&self.client, recipient, &proposal_id).await? {
            TransferResolution::Completed { used_legacy, .. } => {
                let restored = !used_legacy;
                if used_legacy {
                    warn!(
                        proposal_id = %proposal_id,
                        "legacy proposal rejected, locked amount not returned to sender"
                    );
                }
                let note = used_legacy
                    .then(|| "rejected via legacy template, locked amount not restored".to_string());
                if let Err(err) = self
                    .mirror
                    .apply_transfer_rejected(proposal_id.as_str(), restored, note)
                    .await
                {
                    warn!(%err, proposal_id = %proposal_id, "failed to mirror rejected transfer");
                }
                Ok(TransferOutcome::Rejected {
                    is_legacy: used_legacy,
                    tokens_restored: restored,
                })
            }
            TransferResolution::Stale { message } => {
                self.mirror_stale(&proposal_id, &message).await;
                Ok(TransferOutcome::Stale { message })
            }
        }
    }

    /// Mirror bookkeeping for a completed acceptance. Falls back to the
    /// holding payload from the exercise events when the proposal was
    /// never recorded locally.
    async fn mirror_accepted(&self, proposal_id: &ContractId, created: Option<&serde_json::Value>) {
        match self.mirror.apply_transfer_accepted(proposal_id.as_str()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let Some(payload) = created else { return };
                match serde_json::from_value::<TokenHolding>(payload.clone()) {
                    Ok(holding) => {
                        if let Err(err) = self
                            .mirror
                            .credit_holding(
                                &holding.owner,
                                &holding.issuer,
                                &holding.token_name,
                                holding.amount,
                            )
                            .await
                        {
                            warn!(%err, proposal_id = %proposal_id, "failed to mirror accepted transfer");
                        }
                    }
                    Err(err) => {
                        warn!(%err, proposal_id = %proposal_id, "created holding payload not understood");
                    }
                }
            }
            Err(err) => {
                warn!(%err, proposal_id = %proposal_id, "failed to mirror accepted transfer");
            }
        }
    }

    async fn mirror_stale(&self, proposal_id: &ContractId, message: &str) {
        if let Err(err) = self
            .mirror
            .mark_transfer_stale(proposal_id.as_str(), Some(message.to_string()))
            .await
        {
            warn!(%err, proposal_id = %proposal_id, "failed to mirror stale proposal");
        }
    }
}

fn parse_proposal_id(raw: &str) -> Result<ContractId, GatewayError> {
    ContractId::new(raw).map_err(|err| GatewayError::validation(err.to_string()))
}
