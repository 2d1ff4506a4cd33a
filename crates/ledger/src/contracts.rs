//! Contract payloads and choice arguments in their JSON API wire form.
//! Field names are camelCase on the wire; decimal amounts travel as JSON
//! strings with their scale preserved.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Party, TokenName};

/// Token class descriptor. Identity key is (issuer, tokenName); mutated
/// only through the `UpdateTotalSupply` choice, never locally deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub issuer: Party,
    pub token_name: TokenName,
    pub currency: String,
    pub quantity_precision: u32,
    pub price_precision: u32,
    pub total_supply: Decimal,
    pub description: String,
}

/// A balance slice owned exclusively by `owner`. Holdings are immutable:
/// every transfer or burn archives the input holding and creates new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    pub issuer: Party,
    pub owner: Party,
    pub token_name: TokenName,
    pub amount: Decimal,
}

/// A pending transfer. The proposed amount is locked out of the sender's
/// spendable holdings until the recipient accepts or rejects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProposal {
    pub issuer: Party,
    pub current_owner: Party,
    pub new_owner: Party,
    pub token_name: TokenName,
    pub transfer_amount: Decimal,
    pub sender_remaining_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub issuer: Party,
    pub recipient: Party,
    pub token_name: TokenName,
    pub mint_amount: Decimal,
}

/// On-ledger record of a party registered through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRegistration {
    pub operator: Party,
    pub party: Party,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeTransferArgs {
    pub new_owner: Party,
    pub transfer_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnArgs {
    pub burn_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTotalSupplyArgs {
    pub new_total_supply: Decimal,
}

/// Argument for choices that take no parameters. Serializes to `{}`, which
/// the JSON API requires in place of a missing argument.
#[derive(Debug, Clone, Serialize)]
pub struct EmptyArgs {}
