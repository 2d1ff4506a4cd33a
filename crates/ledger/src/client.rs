use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthService;
use crate::error::{FailureClass, LedgerError};
use crate::templates::{LogicalTemplate, TemplateCatalog, TemplateId};
use crate::{ContractId, LedgerConfig, Party};

/// Client for the ledger's HTTP JSON API (v1).
///
/// Eager about nothing: no retries, no request timeouts beyond reqwest
/// defaults, no cancellation. The single exception is the legacy-template
/// fallback in [`exercise_first_match`](Self::exercise_first_match).
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
    auth: AuthService,
    catalog: TemplateCatalog,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a, P> {
    template_id: &'a TemplateId,
    payload: &'a P,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseRequest<'a, A> {
    template_id: &'a TemplateId,
    contract_id: &'a ContractId,
    choice: &'a str,
    argument: &'a A,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    template_ids: &'a [TemplateId],
    query: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocatePartyRequest<'a> {
    identifier_hint: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResultEnvelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    errors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub contract_id: ContractId,
    pub template_id: TemplateId,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedEvent {
    pub contract_id: ContractId,
    pub template_id: TemplateId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractEvent {
    Created(CreatedEvent),
    Archived(ArchivedEvent),
}

/// Result of an exercised choice: the choice's return value plus the
/// events of the transaction it committed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseResult {
    pub exercise_result: serde_json::Value,
    #[serde(default)]
    pub events: Vec<ContractEvent>,
}

impl ExerciseResult {
    /// The choice's return value read as a contract id, the common case
    /// for choices that create a follow-up contract.
    pub fn result_contract_id(&self) -> Option<ContractId> {
        self.exercise_result
            .as_str()
            .and_then(|raw| ContractId::new(raw).ok())
    }

    /// First created event for the given template entity, any package.
    pub fn created_with_entity(&self, entity: &str) -> Option<&CreatedEvent> {
        self.events.iter().find_map(|event| match event {
            ContractEvent::Created(created) if created.template_id.entity == entity => {
                Some(created)
            }
            _ => None,
        })
    }
}

/// An active contract as returned by `/v1/query`, with its payload
/// decoded into `T`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveContract<T> {
    pub contract_id: ContractId,
    pub template_id: TemplateId,
    pub payload: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDetails {
    pub identifier: Party,
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_local: bool,
}

/// Outcome of a choice exercised through the template fallback loop.
#[derive(Debug)]
pub enum ExerciseOutcome {
    Completed {
        result: ExerciseResult,
        /// True when the legacy template id was the one that matched.
        used_legacy: bool,
    },
    /// The referenced contract is archived or unknown under every
    /// candidate template. Retrying cannot help.
    Stale { message: String },
}

impl LedgerClient {
    pub fn new(config: &LedgerConfig) -> Self {
        let http = reqwest::Client::new();
        let auth = AuthService::new(http.clone(), config.auth.clone());
        Self {
            http,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            auth,
            catalog: TemplateCatalog::new(&config.templates),
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// `POST /v1/create`: create a contract instance of `template_id`.
    pub async fn create<P: Serialize>(
        &self,
        act_as: &[Party],
        template_id: &TemplateId,
        payload: &P,
    ) -> Result<CreatedEvent, LedgerError> {
        self.post(
            act_as,
            "/v1/create",
            &CreateRequest {
                template_id,
                payload,
            },
        )
        .await
    }

    /// `POST /v1/exercise`: exercise `choice` on a contract typed as
    /// `template_id`.
    pub async fn exercise<A: Serialize>(
        &self,
        act_as: &[Party],
        template_id: &TemplateId,
        contract_id: &ContractId,
        choice: &str,
        argument: &A,
    ) -> Result<ExerciseResult, LedgerError> {
        self.post(
            act_as,
            "/v1/exercise",
            &ExerciseRequest {
                template_id,
                contract_id,
                choice,
                argument,
            },
        )
        .await
    }

    /// `POST /v1/query`: active contracts of the given template ids whose
    /// payloads match `filter`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        act_as: &[Party],
        template_ids: &[TemplateId],
        filter: &serde_json::Value,
    ) -> Result<Vec<ActiveContract<T>>, LedgerError> {
        self.post(
            act_as,
            "/v1/query",
            &QueryRequest {
                template_ids,
                query: filter,
            },
        )
        .await
    }

    /// Query every candidate template version for `logical` and merge the
    /// results, deduplicated by contract id. A candidate unknown to the
    /// ledger is skipped; other failures surface.
    pub async fn query_merged<T: DeserializeOwned>(
        &self,
        act_as: &[Party],
        logical: LogicalTemplate,
        filter: &serde_json::Value,
    ) -> Result<Vec<ActiveContract<T>>, LedgerError> {
        let mut merged: Vec<ActiveContract<T>> = Vec::new();
        let mut seen: std::collections::HashSet<ContractId> = std::collections::HashSet::new();

        for template_id in self.catalog.candidates(logical) {
            let contracts = match self
                .query(act_as, std::slice::from_ref(&template_id), filter)
                .await
            {
                Ok(contracts) => contracts,
                Err(err) if err.failure_class() == FailureClass::WrongTemplate => {
                    debug!(template_id = %template_id, "template unknown to ledger, skipping");
                    continue;
                }
                Err(err) => return Err(err),
            };
            for contract in contracts {
                if seen.insert(contract.contract_id.clone()) {
                    merged.push(contract);
                }
            }
        }
        Ok(merged)
    }

    /// Exercise `choice` on a contract whose package version is unknown,
    /// trying the catalog's candidates in order.
    ///
    /// A `WrongTemplate` rejection moves to the next candidate; a
    /// `StaleReference` rejection short-circuits to
    /// [`ExerciseOutcome::Stale`]; anything else stops the loop and
    /// surfaces as the error it is.
    pub async fn exercise_first_match<A: Serialize>(
        &self,
        act_as: &[Party],
        logical: LogicalTemplate,
        contract_id: &ContractId,
        choice: &str,
        argument: &A,
    ) -> Result<ExerciseOutcome, LedgerError> {
        let mut wrong_template: Option<LedgerError> = None;

        for template_id in self.catalog.candidates(logical) {
            let err = match self
                .exercise(act_as, &template_id, contract_id, choice, argument)
                .await
            {
                Ok(result) => {
                    return Ok(ExerciseOutcome::Completed {
                        used_legacy: self.catalog.is_legacy(&template_id),
                        result,
                    });
                }
                Err(err) => err,
            };

            match err.failure_class() {
                FailureClass::WrongTemplate => {
                    debug!(
                        template_id = %template_id,
                        choice,
                        "choice failed with template mismatch, trying next candidate"
                    );
                    wrong_template = Some(err);
                }
                FailureClass::StaleReference => {
                    return Ok(ExerciseOutcome::Stale {
                        message: err.to_string(),
                    });
                }
                FailureClass::Other => return Err(err),
            }
        }

        // The catalog always yields at least the current template.
        Err(wrong_template.unwrap_or(LedgerError::EmptyResult))
    }

    /// `GET /v1/parties`: all parties known to the participant.
    pub async fn list_parties(&self, act_as: &[Party]) -> Result<Vec<PartyDetails>, LedgerError> {
        let token = self.auth.bearer_for(act_as).await?;
        let response = self
            .http
            .get(self.endpoint("/v1/parties"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// `POST /v1/parties/allocate`: allocate a fresh party on the
    /// participant.
    pub async fn allocate_party(
        &self,
        act_as: &[Party],
        identifier_hint: &str,
        display_name: &str,
    ) -> Result<PartyDetails, LedgerError> {
        self.post(
            act_as,
            "/v1/parties/allocate",
            &AllocatePartyRequest {
                identifier_hint,
                display_name,
            },
        )
        .await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        act_as: &[Party],
        path: &str,
        body: &B,
    ) -> Result<T, LedgerError> {
        let token = self.auth.bearer_for(act_as).await?;
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LedgerError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Rejections come wrapped in an error envelope; anything else
            // is passed through verbatim.
            if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
                if !envelope.errors.is_empty() {
                    return Err(LedgerError::Rejected {
                        status,
                        message: envelope.errors.join("; "),
                    });
                }
            }
            return Err(LedgerError::Api {
                status,
                message: body,
            });
        }

        let envelope: ResultEnvelope<T> = serde_json::from_str(&body)?;
        envelope.result.ok_or(LedgerError::EmptyResult)
    }
}
