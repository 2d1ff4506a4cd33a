//! File-backed mirror of ledger state for history and display.
//!
//! The mirror is an eventually consistent local cache, never the source of
//! truth. Services write to it only after the corresponding ledger command
//! succeeded, and a failed mirror write is logged rather than propagated.
//! Collections are small JSON files rewritten wholesale on every mutation;
//! a single async mutex serializes writers.

mod records;
mod store;

pub use records::{
    HoldingRecord, TokenRecord, TransactionKind, TransactionRecord, TransactionStatus, UserRecord,
};
pub use store::MirrorError;

use std::path::PathBuf;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use canton_ledger::{Party, TokenName};

const USERS_FILE: &str = "users.json";
const TOKENS_FILE: &str = "tokens.json";
const HOLDINGS_FILE: &str = "holdings.json";
const TRANSACTIONS_FILE: &str = "transactions.json";

#[derive(Debug, Default)]
struct Collections {
    users: Vec<UserRecord>,
    tokens: Vec<TokenRecord>,
    holdings: Vec<HoldingRecord>,
    transactions: Vec<TransactionRecord>,
}

impl Collections {
    fn credit(&mut self, owner: &Party, issuer: &Party, token_name: &TokenName, amount: Decimal) {
        match self.holdings.iter_mut().find(|h| {
            h.owner == *owner && h.issuer == *issuer && h.token_name == *token_name
        }) {
            Some(holding) => {
                holding.amount += amount;
                holding.updated_at = Utc::now();
            }
            None => self.holdings.push(HoldingRecord {
                owner: owner.clone(),
                issuer: issuer.clone(),
                token_name: token_name.clone(),
                amount,
                updated_at: Utc::now(),
            }),
        }
    }

    /// Debits clamp at zero and a missing holding row is a no-op. The
    /// ledger enforces real balances; the mirror only tracks them.
    fn debit(&mut self, owner: &Party, issuer: &Party, token_name: &TokenName, amount: Decimal) {
        if let Some(holding) = self.holdings.iter_mut().find(|h| {
            h.owner == *owner && h.issuer == *issuer && h.token_name == *token_name
        }) {
            holding.amount = (holding.amount - amount).max(Decimal::ZERO);
            holding.updated_at = Utc::now();
        }
    }

    fn transaction_by_proposal(&mut self, proposal_id: &str) -> Option<&mut TransactionRecord> {
        self.transactions
            .iter_mut()
            .find(|t| t.proposal_id.as_deref() == Some(proposal_id))
    }
}

#[derive(Debug)]
pub struct MirrorStore {
    dir: PathBuf,
    state: Mutex<Collections>,
}

impl MirrorStore {
    /// Opens the mirror under `dir`, creating the directory if needed and
    /// loading whatever collection files already exist.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, MirrorError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let state = Collections {
            users: store::load_collection(&dir.join(USERS_FILE)).await?,
            tokens: store::load_collection(&dir.join(TOKENS_FILE)).await?,
            holdings: store::load_collection(&dir.join(HOLDINGS_FILE)).await?,
            transactions: store::load_collection(&dir.join(TRANSACTIONS_FILE)).await?,
        };
        Ok(Self {
            dir,
            state: Mutex::new(state),
        })
    }

    /// Inserts or updates the user keyed by OAuth subject, preserving the
    /// stable id and creation time of an existing row. Returns the stored
    /// record.
    pub async fn upsert_user(&self, record: UserRecord) -> Result<UserRecord, MirrorError> {
        let mut state = self.state.lock().await;
        let stored = match state.users.iter_mut().find(|u| u.subject == record.subject) {
            Some(existing) => {
                existing.email = record.email;
                existing.display_name = record.display_name;
                existing.party = record.party;
                existing.clone()
            }
            None => {
                state.users.push(record.clone());
                record
            }
        };
        store::persist_collection(&self.dir.join(USERS_FILE), &state.users).await?;
        Ok(stored)
    }

    /// Inserts or replaces the token row keyed by (issuer, token name).
    pub async fn upsert_token(&self, record: TokenRecord) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        match state
            .tokens
            .iter_mut()
            .find(|t| t.issuer == record.issuer && t.token_name == record.token_name)
        {
            Some(existing) => *existing = record,
            None => state.tokens.push(record),
        }
        store::persist_collection(&self.dir.join(TOKENS_FILE), &state.tokens).await
    }

    pub async fn apply_mint(
        &self,
        issuer: &Party,
        recipient: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        state.credit(recipient, issuer, token_name, amount);
        state
            .transactions
            .push(TransactionRecord::mint(issuer, recipient, token_name, amount));
        self.persist_movement(&state).await
    }

    pub async fn apply_burn(
        &self,
        owner: &Party,
        issuer: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        state.debit(owner, issuer, token_name, amount);
        state
            .transactions
            .push(TransactionRecord::burn(owner, issuer, token_name, amount));
        self.persist_movement(&state).await
    }

    /// Debits the sender and records the pending transfer keyed by the
    /// proposal contract id.
    pub async fn apply_transfer_proposed(
        &self,
        sender: &Party,
        recipient: &Party,
        issuer: &Party,
        token_name: &TokenName,
        amount: Decimal,
        proposal_id: String,
    ) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        state.debit(sender, issuer, token_name, amount);
        state.transactions.push(TransactionRecord::transfer(
            sender,
            recipient,
            issuer,
            token_name,
            amount,
            proposal_id,
        ));
        self.persist_movement(&state).await
    }

    /// Marks the pending transfer completed and credits the recipient from
    /// the recorded amount. Returns `None`, leaving balances untouched,
    /// when no transaction matches the proposal id (for example when the
    /// proposal was made outside this gateway instance).
    pub async fn apply_transfer_accepted(
        &self,
        proposal_id: &str,
    ) -> Result<Option<TransactionRecord>, MirrorError> {
        let mut state = self.state.lock().await;
        let record = match state.transaction_by_proposal(proposal_id) {
            Some(tx) => {
                tx.status = TransactionStatus::Completed;
                tx.updated_at = Utc::now();
                tx.clone()
            }
            None => return Ok(None),
        };
        if let Some(recipient) = &record.recipient {
            state.credit(recipient, &record.issuer, &record.token_name, record.amount);
        }
        self.persist_movement(&state).await?;
        Ok(Some(record))
    }

    /// Marks the pending transfer rejected. With `restore` set the locked
    /// amount is credited back to the sender; legacy-template rejections
    /// pass `restore: false` because those proposals burn the locked tokens.
    pub async fn apply_transfer_rejected(
        &self,
        proposal_id: &str,
        restore: bool,
        note: Option<String>,
    ) -> Result<Option<TransactionRecord>, MirrorError> {
        let mut state = self.state.lock().await;
        let record = match state.transaction_by_proposal(proposal_id) {
            Some(tx) => {
                tx.status = TransactionStatus::Rejected;
                tx.note = note;
                tx.updated_at = Utc::now();
                tx.clone()
            }
            None => return Ok(None),
        };
        if restore {
            if let Some(sender) = &record.sender {
                state.credit(sender, &record.issuer, &record.token_name, record.amount);
            }
        }
        self.persist_movement(&state).await?;
        Ok(Some(record))
    }

    /// Marks the pending transfer stale without touching any balance.
    pub async fn mark_transfer_stale(
        &self,
        proposal_id: &str,
        note: Option<String>,
    ) -> Result<Option<TransactionRecord>, MirrorError> {
        let mut state = self.state.lock().await;
        let record = match state.transaction_by_proposal(proposal_id) {
            Some(tx) => {
                tx.status = TransactionStatus::Stale;
                tx.note = note;
                tx.updated_at = Utc::now();
                tx.clone()
            }
            None => return Ok(None),
        };
        store::persist_collection(&self.dir.join(TRANSACTIONS_FILE), &state.transactions).await?;
        Ok(Some(record))
    }

    /// Credits a holding outside of any recorded transfer, for accepted
    /// proposals the mirror never saw proposed.
    pub async fn credit_holding(
        &self,
        owner: &Party,
        issuer: &Party,
        token_name: &TokenName,
        amount: Decimal,
    ) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        state.credit(owner, issuer, token_name, amount);
        store::persist_collection(&self.dir.join(HOLDINGS_FILE), &state.holdings).await
    }

    /// Appends a transaction without any balance change.
    pub async fn record_transaction(&self, record: TransactionRecord) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        state.transactions.push(record);
        store::persist_collection(&self.dir.join(TRANSACTIONS_FILE), &state.transactions).await
    }

    /// Replaces every holding row of `owner` with a fresh snapshot taken
    /// from the ledger.
    pub async fn replace_holdings_for(
        &self,
        owner: &Party,
        fresh: Vec<HoldingRecord>,
    ) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        state.holdings.retain(|h| h.owner != *owner);
        state.holdings.extend(fresh);
        store::persist_collection(&self.dir.join(HOLDINGS_FILE), &state.holdings).await
    }

    pub async fn holdings_for(&self, owner: &Party) -> Vec<HoldingRecord> {
        let state = self.state.lock().await;
        state
            .holdings
            .iter()
            .filter(|h| h.owner == *owner)
            .cloned()
            .collect()
    }

    /// Transaction history for a party, newest first.
    pub async fn transactions_for(&self, party: &Party) -> Vec<TransactionRecord> {
        let state = self.state.lock().await;
        let mut records: Vec<_> = state
            .transactions
            .iter()
            .filter(|t| t.involves(party))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records
    }

    pub async fn tokens(&self) -> Vec<TokenRecord> {
        self.state.lock().await.tokens.clone()
    }

    pub async fn user_by_subject(&self, subject: &str) -> Option<UserRecord> {
        let state = self.state.lock().await;
        state.users.iter().find(|u| u.subject == subject).cloned()
    }

    async fn persist_movement(&self, state: &Collections) -> Result<(), MirrorError> {
        store::persist_collection(&self.dir.join(HOLDINGS_FILE), &state.holdings).await?;
        store::persist_collection(&self.dir.join(TRANSACTIONS_FILE), &state.transactions).await
    }
}
