use reqwest::StatusCode;

/// Errors surfaced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to decode ledger response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Ledger API error {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("Command rejected by ledger ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("Ledger response contained no result")]
    EmptyResult,
    #[error("Token endpoint returned {status}: {message}")]
    Auth { status: StatusCode, message: String },
}

/// Coarse classification of a failed ledger command, used to drive the
/// template fallback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The command named a template the ledger does not know, or typed a
    /// contract against the wrong template. Retrying against another
    /// template version may succeed.
    WrongTemplate,
    /// The command referenced a contract that is archived or was never
    /// created. Retrying against another template cannot help.
    StaleReference,
    /// Anything else: transport failures, authorization failures, model
    /// assertion failures inside choice bodies.
    Other,
}

impl LedgerError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::Rejected { message, .. } | Self::Api { message, .. } => {
                classify_rejection(message)
            }
            Self::Http(_) | Self::Decode(_) | Self::EmptyResult | Self::Auth { .. } => {
                FailureClass::Other
            }
        }
    }
}

/// Classify a rejection by the gRPC-style error code embedded in the
/// message. `CONTRACT_NOT_FOUND` must be tested before `NOT_FOUND`
/// because the latter is a substring of the former.
fn classify_rejection(message: &str) -> FailureClass {
    if message.contains("CONTRACT_NOT_FOUND") {
        FailureClass::StaleReference
    } else if message.contains("WRONGLY_TYPED_CONTRACT")
        || message.contains("INVALID_ARGUMENT")
        || message.contains("NOT_FOUND")
    {
        FailureClass::WrongTemplate
    } else {
        FailureClass::Other
    }
}
