use serde::{Deserialize, Serialize};
use url::Url;

pub mod auth;
pub mod client;
pub mod contracts;
pub mod error;
pub mod holding;
pub mod mint;
pub mod party;
pub mod templates;
pub mod token;
pub mod transfer;

pub use auth::{AuthConfig, AuthService};
pub use client::{
    ActiveContract, CreatedEvent, ExerciseOutcome, ExerciseResult, LedgerClient, PartyDetails,
};
pub use error::{FailureClass, LedgerError};
pub use party::PartyService;
pub use templates::{LogicalTemplate, TemplateCatalog, TemplateConfig, TemplateId};

/// Namespace separator in fully qualified party identifiers,
/// e.g. `alice-7f3a::122011aabb`.
pub const PARTY_NAMESPACE_SEPARATOR: &str = "::";

/// Ledger connection settings, deserialized from the `[ledger]` section of
/// the gateway configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub base_url: Url,
    pub operator_party: Party,
    pub auth: AuthConfig,
    pub templates: TemplateConfig,
}

/// Party identifier newtype with validation.
///
/// A party is a ledger-level identity capable of owning contracts and
/// authorizing choices. Identifiers are opaque strings of the form
/// `hint::namespace`; only non-emptiness is validated here because the
/// namespace fingerprint is assigned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Party(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid party identifier: {0:?}")]
pub struct InvalidPartyError(String);

impl Party {
    /// Create a new party identifier with validation.
    ///
    /// # Errors
    /// Returns `InvalidPartyError` if the identifier is empty or whitespace.
    pub fn new(identifier: impl Into<String>) -> Result<Self, InvalidPartyError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(InvalidPartyError(identifier));
        }
        Ok(Self(identifier))
    }

    /// The allocation hint: everything before the namespace separator, or
    /// the whole identifier when no separator is present.
    pub fn hint(&self) -> &str {
        match self.0.split_once(PARTY_NAMESPACE_SEPARATOR) {
            Some((hint, _)) => hint,
            None => &self.0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Party {
    type Err = InvalidPartyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Opaque contract identifier assigned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid contract id: {0:?}")]
pub struct InvalidContractIdError(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidContractIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(InvalidContractIdError(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContractId {
    type Err = InvalidContractIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

const TOKEN_NAME_MAX_LEN: usize = 64;

/// Token name newtype wrapper with validation.
///
/// Identifies a token class together with its issuer; prevents mixing token
/// names with other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenName(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid token name: {0:?}")]
pub struct InvalidTokenNameError(String);

impl TokenName {
    /// Create a new token name with validation.
    ///
    /// # Errors
    /// Returns `InvalidTokenNameError` if the name is empty or longer than
    /// 64 characters.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidTokenNameError> {
        let name = name.into();
        if name.trim().is_empty() || name.chars().count() > TOKEN_NAME_MAX_LEN {
            return Err(InvalidTokenNameError(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TokenName {
    type Err = InvalidTokenNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
