//! Gateway-level error taxonomy. Local validation failures are separated
//! from ledger rejections so handlers can report them without string
//! matching.

use rust_decimal::Decimal;

use canton_ledger::{LedgerError, Party, TokenName};

use crate::mirror::MirrorError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{reason}")]
    Validation { reason: String },
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
    #[error("burn amount {requested} exceeds holding balance {available}")]
    ExceedsHolding {
        requested: Decimal,
        available: Decimal,
    },
    #[error("no token named {token_name} issued by {issuer}")]
    UnknownToken {
        issuer: Party,
        token_name: TokenName,
    },
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("mirror error: {0}")]
    Mirror(#[from] MirrorError),
}

impl GatewayError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}
