//! The two-phase transfer protocol: `ProposeTransfer` on a holding,
//! then `AcceptTransfer` or `RejectTransfer` on the resulting proposal.
//!
//! Proposals carry no package-version information when they come back
//! from a caller, so acceptance and rejection go through the template
//! fallback loop. A proposal whose underlying holding was archived in the
//! meantime is *stale*: resolving it is impossible, reported as a soft
//! outcome rather than an error so callers can clean up their records.

use rust_decimal::Decimal;
use std::slice;
use tracing::{info, warn};

use crate::client::{ActiveContract, CreatedEvent, ExerciseOutcome, LedgerClient};
use crate::contracts::{EmptyArgs, ProposeTransferArgs, TokenHolding};
use crate::error::LedgerError;
use crate::templates::LogicalTemplate;
use crate::{ContractId, Party};

/// Outcome of resolving a transfer proposal, either way.
#[derive(Debug)]
pub enum TransferResolution {
    Completed {
        /// Holding created by the resolution: the recipient's new holding
        /// on accept, the sender's restored holding on reject. Absent
        /// when the transaction events did not include one, notably on
        /// the legacy reject path.
        holding: Option<CreatedEvent>,
        /// True when the legacy template resolved the proposal. Legacy
        /// `RejectTransfer` does not return the locked tokens to the
        /// sender, so callers must warn the user in that case.
        used_legacy: bool,
    },
    /// The proposal references an archived holding and can never be
    /// resolved. Nothing changed on the ledger.
    Stale { message: String },
}

/// Exercise `ProposeTransfer` on the sender's holding. The ledger
/// archives the input holding and creates the remainder holding itself.
/// Returns the new proposal's contract id.
///
/// Unlike acceptance, a stale holding here is a hard error: the sender
/// just looked the holding up, so losing it means a concurrent operation
/// consumed it and the caller should see the conflict.
pub async fn propose(
    client: &LedgerClient,
    sender: &Party,
    holding: &ActiveContract<TokenHolding>,
    recipient: &Party,
    amount: Decimal,
) -> Result<ContractId, LedgerError> {
    let result = client
        .exercise(
            slice::from_ref(sender),
            &holding.template_id,
            &holding.contract_id,
            "ProposeTransfer",
            &ProposeTransferArgs {
                new_owner: recipient.clone(),
                transfer_amount: amount,
            },
        )
        .await?;

    let proposal_id = result.result_contract_id().ok_or(LedgerError::EmptyResult)?;
    info!(
        sender = %sender,
        recipient = %recipient,
        %amount,
        proposal_id = %proposal_id,
        "transfer proposed"
    );
    Ok(proposal_id)
}

/// Exercise `AcceptTransfer` on a proposal, current template first.
pub async fn accept(
    client: &LedgerClient,
    recipient: &Party,
    proposal_id: &ContractId,
) -> Result<TransferResolution, LedgerError> {
    resolve(client, recipient, proposal_id, "AcceptTransfer").await
}

/// Exercise `RejectTransfer` on a proposal, current template first.
pub async fn reject(
    client: &LedgerClient,
    recipient: &Party,
    proposal_id: &ContractId,
) -> Result<TransferResolution, LedgerError> {
    resolve(client, recipient, proposal_id, "RejectTransfer").await
}

async fn resolve(
    client: &LedgerClient,
    acting: &Party,
    proposal_id: &ContractId,
    choice: &str,
) -> Result<TransferResolution, LedgerError> {
    match client
        .exercise_first_match(
            slice::from_ref(acting),
            LogicalTemplate::TransferProposal,
            proposal_id,
            choice,
            &EmptyArgs {},
        )
        .await?
    {
        ExerciseOutcome::Completed {
            result,
            used_legacy,
        } => {
            if used_legacy {
                warn!(proposal_id = %proposal_id, choice, "proposal resolved via legacy template");
            }
            Ok(TransferResolution::Completed {
                holding: result.created_with_entity("TokenHolding").cloned(),
                used_legacy,
            })
        }
        ExerciseOutcome::Stale { message } => {
            info!(proposal_id = %proposal_id, choice, "proposal is stale");
            Ok(TransferResolution::Stale { message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::templates::{TemplateConfig, TemplateId};
    use crate::LedgerConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client(server: &MockServer) -> LedgerClient {
        LedgerClient::new(&LedgerConfig {
            base_url: server.base_url().parse().unwrap(),
            operator_party: Party::new("operator::ns").unwrap(),
            auth: AuthConfig::StaticToken {
                token: "sandbox-token".to_string(),
            },
            templates: TemplateConfig {
                current_package: "aa11".to_string(),
                legacy_package: Some("bb22".to_string()),
                module: "Tokenization".to_string(),
            },
        })
    }

    fn sender_holding() -> ActiveContract<TokenHolding> {
        ActiveContract {
            contract_id: ContractId::new("00h1").unwrap(),
            template_id: TemplateId::new("aa11", "Tokenization", "TokenHolding"),
            payload: TokenHolding {
                issuer: Party::new("issuer::ns").unwrap(),
                owner: Party::new("alice::ns").unwrap(),
                token_name: crate::TokenName::new("GOLD").unwrap(),
                amount: Decimal::new(100000, 2),
            },
        }
    }

    #[tokio::test]
    async fn propose_exercises_on_the_holding_template() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/exercise")
                .body_contains(r#""templateId":"aa11:Tokenization:TokenHolding""#)
                .body_contains(r#""choice":"ProposeTransfer""#)
                .body_contains(r#""newOwner":"bob::ns""#)
                .body_contains(r#""transferAmount":"300.00""#);
            then.status(200).json_body(json!({
                "status": 200,
                "result": { "exerciseResult": "00prop", "events": [] }
            }));
        });

        let client = test_client(&server);
        let proposal_id = propose(
            &client,
            &Party::new("alice::ns").unwrap(),
            &sender_holding(),
            &Party::new("bob::ns").unwrap(),
            Decimal::new(30000, 2),
        )
        .await
        .unwrap();

        assert_eq!(proposal_id.as_str(), "00prop");
        mock.assert();
    }

    #[tokio::test]
    async fn accept_returns_the_created_holding() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/exercise")
                .body_contains(r#""choice":"AcceptTransfer""#);
            then.status(200).json_body(json!({
                "status": 200,
                "result": {
                    "exerciseResult": "00h2",
                    "events": [
                        { "archived": {
                            "contractId": "00prop",
                            "templateId": "aa11:Tokenization:TransferProposal"
                        }},
                        { "created": {
                            "contractId": "00h2",
                            "templateId": "aa11:Tokenization:TokenHolding",
                            "payload": {
                                "issuer": "issuer::ns", "owner": "bob::ns",
                                "tokenName": "GOLD", "amount": "300.00"
                            }
                        }}
                    ]
                }
            }));
        });

        let client = test_client(&server);
        let resolution = accept(
            &client,
            &Party::new("bob::ns").unwrap(),
            &ContractId::new("00prop").unwrap(),
        )
        .await
        .unwrap();

        match resolution {
            TransferResolution::Completed {
                holding,
                used_legacy,
            } => {
                assert!(!used_legacy);
                let holding = holding.unwrap();
                assert_eq!(holding.contract_id.as_str(), "00h2");
            }
            TransferResolution::Stale { message } => panic!("unexpected stale: {message}"),
        }
    }

    #[tokio::test]
    async fn reject_on_legacy_template_flags_used_legacy() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/exercise")
                .body_contains("aa11:Tokenization:TransferProposal");
            then.status(404).json_body(json!({
                "status": 404,
                "errors": ["NOT_FOUND: unknown templates [aa11:Tokenization:TransferProposal]"]
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/exercise")
                .body_contains("bb22:Tokenization:TransferProposal")
                .body_contains(r#""choice":"RejectTransfer""#);
            then.status(200).json_body(json!({
                "status": 200,
                "result": { "exerciseResult": {}, "events": [] }
            }));
        });

        let client = test_client(&server);
        let resolution = reject(
            &client,
            &Party::new("bob::ns").unwrap(),
            &ContractId::new("00prop").unwrap(),
        )
        .await
        .unwrap();

        match resolution {
            TransferResolution::Completed {
                holding,
                used_legacy,
            } => {
                assert!(used_legacy);
                // Legacy RejectTransfer creates no restored holding.
                assert!(holding.is_none());
            }
            TransferResolution::Stale { message } => panic!("unexpected stale: {message}"),
        }
    }

    #[tokio::test]
    async fn double_accept_reports_stale_on_second_attempt() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/exercise");
            then.status(404).json_body(json!({
                "status": 404,
                "errors": ["CONTRACT_NOT_FOUND(11,a45f): Contract could not be found"]
            }));
        });

        let client = test_client(&server);
        let resolution = accept(
            &client,
            &Party::new("bob::ns").unwrap(),
            &ContractId::new("00prop").unwrap(),
        )
        .await
        .unwrap();

        assert!(matches!(resolution, TransferResolution::Stale { .. }));
        mock.assert_hits(1);
    }
}
