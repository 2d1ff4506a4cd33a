use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use canton_ledger::contracts::TokenMetadata;
use canton_ledger::{Party, TokenName};

/// Mapping from an external OAuth subject to an allocated ledger party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: String,
    pub party: Party,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        subject: impl Into<String>,
        email: Option<String>,
        display_name: impl Into<String>,
        party: Party,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            email,
            display_name: display_name.into(),
            party,
            created_at: Utc::now(),
        }
    }
}

/// Local copy of an on-ledger `TokenMetadata` contract payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub issuer: Party,
    pub token_name: TokenName,
    pub currency: String,
    pub quantity_precision: u32,
    pub price_precision: u32,
    pub total_supply: Decimal,
    pub description: String,
}

impl From<&TokenMetadata> for TokenRecord {
    fn from(payload: &TokenMetadata) -> Self {
        Self {
            issuer: payload.issuer.clone(),
            token_name: payload.token_name.clone(),
            currency: payload.currency.clone(),
            quantity_precision: payload.quantity_precision,
            price_precision: payload.price_precision,
            total_supply: payload.total_supply,
            description: payload.description.clone(),
        }
    }
}

/// Aggregated balance of one (owner, issuer, token) triple. The ledger may
/// hold the same balance as several holding contracts; the mirror keeps one
/// row per triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub owner: Party,
    pub issuer: Party,
    pub token_name: TokenName,
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    Mint,
    Burn,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
    Stale,
}

/// One entry in the local transaction history. Transfers start `Pending`
/// at proposal time and are updated in place through `proposal_id` when
/// the recipient accepts or rejects; mints and burns are recorded already
/// `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub issuer: Party,
    pub token_name: TokenName,
    pub sender: Option<Party>,
    pub recipient: Option<Party>,
    pub amount: Decimal,
    pub proposal_id: Option<String>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    fn new(
        kind: TransactionKind,
        status: TransactionStatus,
        issuer: &Party,
        token_name: &TokenName,
        sender: Option<&Party>,
        recipient: Option<&Party>,
        amount: Decimal,
        proposal_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            status,
            issuer: issuer.clone(),
            token_name: token_name.clone(),
            sender: sender.cloned(),
            recipient: recipient.cloned(),
            amount,
            proposal_id,
            note: None,
            recorded_at: now,
            updated_at: now,
        }
    }

    pub fn mint(issuer: &Party, recipient: &Party, token_name: &TokenName, amount: Decimal) -> Self {
        Self::new(
            TransactionKind::Mint,
            TransactionStatus::Completed,
            issuer,
            token_name,
            Some(issuer),
            Some(recipient),
            amount,
            None,
        )
    }

    pub fn burn(owner: &Party, issuer: &Party, token_name: &TokenName, amount: Decimal) -> Self {
        Self::new(
            TransactionKind::Burn,
            TransactionStatus::Completed,
            issuer,
            token_name,
            Some(owner),
            None,
            amount,
            None,
        )
    }

    pub fn transfer(
        sender: &Party,
        recipient: &Party,
        issuer: &Party,
        token_name: &TokenName,
        amount: Decimal,
        proposal_id: String,
    ) -> Self {
        Self::new(
            TransactionKind::Transfer,
            TransactionStatus::Pending,
            issuer,
            token_name,
            Some(sender),
            Some(recipient),
            amount,
            Some(proposal_id),
        )
    }

    /// Whether the given party appears on either side of the movement.
    pub fn involves(&self, party: &Party) -> bool {
        self.sender.as_ref() == Some(party) || self.recipient.as_ref() == Some(party)
    }
}
