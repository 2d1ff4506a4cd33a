//! Account resolution: maps external OAuth subjects to ledger parties,
//! keeps an on-ledger registration record, and mirrors the mapping for
//! display.

use std::slice;
use std::sync::Arc;

use tracing::{info, warn};

use canton_ledger::contracts::PartyRegistration;
use canton_ledger::{ActiveContract, LedgerClient, LogicalTemplate, Party, PartyService};

use crate::error::GatewayError;
use crate::mirror::{MirrorStore, UserRecord};

pub struct AccountService {
    client: Arc<LedgerClient>,
    mirror: Arc<MirrorStore>,
    parties: PartyService,
    operator: Party,
}

impl AccountService {
    pub fn new(client: Arc<LedgerClient>, mirror: Arc<MirrorStore>, operator: Party) -> Self {
        Self {
            client,
            mirror,
            parties: PartyService::new(operator.clone()),
            operator,
        }
    }

    /// Resolve `subject` to a party, allocating one on first contact, and
    /// ensure its on-ledger registration record exists. Safe to call on
    /// every login.
    pub async fn resolve(
        &self,
        subject: &str,
        display_name: &str,
        email: Option<String>,
    ) -> Result<UserRecord, GatewayError> {
        if subject.trim().is_empty() {
            return Err(GatewayError::validation("subject must not be empty"));
        }

        let party = self.parties.resolve(&self.client, subject, display_name).await?;
        self.ensure_registered(&party, display_name).await?;

        let record = UserRecord::new(subject, email, display_name, party);
        let stored = match self.mirror.upsert_user(record.clone()).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%err, subject, "failed to mirror user record");
                record
            }
        };
        Ok(stored)
    }

    /// Drop the cached subject-to-party mapping.
    pub fn logout(&self, subject: &str) {
        self.parties.forget(subject);
    }

    /// Create the `PartyRegistration` contract for `party` unless one
    /// already exists. Signed by both the operator and the party.
    async fn ensure_registered(
        &self,
        party: &Party,
        display_name: &str,
    ) -> Result<(), GatewayError> {
        let filter = serde_json::json!({ "operator": self.operator, "party": party });
        let existing: Vec<ActiveContract<PartyRegistration>> = self
            .client
            .query_merged(
                slice::from_ref(&self.operator),
                LogicalTemplate::PartyRegistration,
                &filter,
            )
            .await?;
        if !existing.is_empty() {
            return Ok(());
        }

        let template = self
            .client
            .catalog()
            .current(LogicalTemplate::PartyRegistration);
        let registration = PartyRegistration {
            operator: self.operator.clone(),
            party: party.clone(),
            display_name: display_name.to_string(),
        };
        let act_as = [self.operator.clone(), party.clone()];
        let created = self.client.create(&act_as, &template, &registration).await?;
        info!(party = %party, contract_id = %created.contract_id, "party registered");
        Ok(())
    }
}
