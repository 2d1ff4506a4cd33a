use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Contract types the gateway operates on, independent of which package
/// version they live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalTemplate {
    TokenMetadata,
    TokenHolding,
    TransferProposal,
    PartyRegistration,
    MintRequest,
}

impl LogicalTemplate {
    pub fn entity(self) -> &'static str {
        match self {
            Self::TokenMetadata => "TokenMetadata",
            Self::TokenHolding => "TokenHolding",
            Self::TransferProposal => "TransferProposal",
            Self::PartyRegistration => "PartyRegistration",
            Self::MintRequest => "MintRequest",
        }
    }
}

impl std::fmt::Display for LogicalTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.entity())
    }
}

/// Fully qualified template identifier in the JSON API wire form
/// `packageId:Module:Entity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateId {
    pub package_id: String,
    pub module: String,
    pub entity: String,
}

impl TemplateId {
    pub fn new(
        package_id: impl Into<String>,
        module: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            module: module.into(),
            entity: entity.into(),
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.package_id, self.module, self.entity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid template id (expected packageId:Module:Entity): {0:?}")]
pub struct InvalidTemplateIdError(String);

impl std::str::FromStr for TemplateId {
    type Err = InvalidTemplateIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(package_id), Some(module), Some(entity))
                if !package_id.is_empty() && !module.is_empty() && !entity.is_empty() =>
            {
                Ok(Self::new(package_id, module, entity))
            }
            _ => Err(InvalidTemplateIdError(s.to_string())),
        }
    }
}

impl Serialize for TemplateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TemplateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Deployed model package versions, from the `[ledger.templates]` section.
/// After a model redeploy the ledger holds contracts created under either
/// package, so both ids stay configured until the legacy contracts drain.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    pub current_package: String,
    pub legacy_package: Option<String>,
    pub module: String,
}

/// Resolves logical contract types to concrete wire identifiers, current
/// package first.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    current_package: String,
    legacy_package: Option<String>,
    module: String,
}

impl TemplateCatalog {
    pub fn new(config: &TemplateConfig) -> Self {
        Self {
            current_package: config.current_package.clone(),
            legacy_package: config.legacy_package.clone(),
            module: config.module.clone(),
        }
    }

    /// Wire identifier in the current package.
    pub fn current(&self, logical: LogicalTemplate) -> TemplateId {
        TemplateId::new(&self.current_package, &self.module, logical.entity())
    }

    /// Identifiers to try in order when the package version of a contract
    /// is unknown: current first, then legacy when one is configured.
    pub fn candidates(&self, logical: LogicalTemplate) -> Vec<TemplateId> {
        let mut candidates = vec![self.current(logical)];
        if let Some(legacy) = &self.legacy_package {
            candidates.push(TemplateId::new(legacy, &self.module, logical.entity()));
        }
        candidates
    }

    /// True when the identifier belongs to the configured legacy package.
    pub fn is_legacy(&self, template_id: &TemplateId) -> bool {
        self.legacy_package
            .as_deref()
            .is_some_and(|legacy| template_id.package_id == legacy)
    }
}
