//! Mapping external identity subjects to ledger parties.
//!
//! Resolution is idempotent: an already-allocated party is found by its
//! identifier hint and reused, so repeated logins never pile up parties
//! on the participant.

use std::collections::HashMap;
use std::slice;
use std::sync::RwLock;

use tracing::{debug, info};

use crate::client::LedgerClient;
use crate::error::LedgerError;
use crate::{Party, PARTY_NAMESPACE_SEPARATOR};

const HINT_MAX_LEN: usize = 64;

/// Turn an external subject id (e.g. `auth0|63f1c9`) into a valid party
/// identifier hint: alphanumerics, `-` and `_` pass through, everything
/// else becomes `-`, capped at 64 characters.
pub fn sanitize_hint(subject: &str) -> String {
    subject
        .chars()
        .take(HINT_MAX_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub struct PartyService {
    operator: Party,
    cache: RwLock<HashMap<String, Party>>,
}

impl PartyService {
    pub fn new(operator: Party) -> Self {
        Self {
            operator,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `subject` to a party, allocating one on first contact.
    ///
    /// Cached per subject for the process lifetime. On a cache miss the
    /// participant's party list is searched for an identifier whose hint
    /// equals the sanitized subject; only when none matches is a new
    /// party allocated.
    pub async fn resolve(
        &self,
        client: &LedgerClient,
        subject: &str,
        display_name: &str,
    ) -> Result<Party, LedgerError> {
        {
            let cache = match self.cache.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(party) = cache.get(subject) {
                return Ok(party.clone());
            }
        }

        let hint = sanitize_hint(subject);
        let parties = client.list_parties(slice::from_ref(&self.operator)).await?;
        let existing = parties
            .into_iter()
            .map(|details| details.identifier)
            .find(|identifier| identifier.hint() == hint);

        let party = match existing {
            Some(party) => {
                debug!(subject, party = %party, "subject resolves to existing party");
                party
            }
            None => {
                let allocated = client
                    .allocate_party(slice::from_ref(&self.operator), &hint, display_name)
                    .await?;
                info!(subject, party = %allocated.identifier, "allocated new party");
                allocated.identifier
            }
        };

        let mut cache = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.insert(subject.to_string(), party.clone());
        Ok(party)
    }

    /// Drop the cached mapping for `subject`, e.g. on logout.
    pub fn forget(&self, subject: &str) {
        let mut cache = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.remove(subject);
    }
}
