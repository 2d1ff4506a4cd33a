//! Scenario tests exercising the full gateway lifecycle.
//!
//! Each scenario launches the real server via `launch()` against an
//! httpmock ledger and drives it over HTTP with `reqwest`, covering the
//! pipeline from route dispatch through the service layer, the ledger
//! client's template fallback, and the mirror store.

mod common;

use httpmock::MockServer;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use serial_test::serial;
use tempfile::tempdir;

use common::{CURRENT_PKG, LEGACY_PKG, gateway_config, spawn_gateway, wait_for_health};

#[tokio::test]
#[serial]
async fn transfer_lifecycle_conserves_balances() -> anyhow::Result<()> {
    let server = MockServer::start();
    let dir = tempdir()?;

    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/query")
            .body_contains(LEGACY_PKG);
        then.status(200)
            .json_body(json!({"status": 200, "result": []}));
    });
    let mut alice_before = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/query")
            .body_contains(CURRENT_PKG)
            .body_contains("alice::ns");
        then.status(200).json_body(json!({
            "status": 200,
            "result": [{
                "contractId": "00whole",
                "templateId": format!("{CURRENT_PKG}:Tokenization:TokenHolding"),
                "payload": {
                    "owner": "alice::ns",
                    "issuer": "issuer::ns",
                    "tokenName": "GOLD",
                    "amount": "1000.00"
                }
            }]
        }));
    });
    let propose_mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/exercise")
            .body_contains(r#""choice":"ProposeTransfer""#)
            .body_contains(r#""contractId":"00whole""#)
            .body_contains(r#""transferAmount":"300.00""#);
        then.status(200).json_body(json!({
            "status": 200,
            "result": { "exerciseResult": "00prop", "events": [] }
        }));
    });
    let accept_mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/exercise")
            .body_contains(r#""choice":"AcceptTransfer""#)
            .body_contains(r#""contractId":"00prop""#);
        then.status(200).json_body(json!({
            "status": 200,
            "result": {
                "exerciseResult": "00bob",
                "events": [{
                    "created": {
                        "contractId": "00bob",
                        "templateId": format!("{CURRENT_PKG}:Tokenization:TokenHolding"),
                        "payload": {
                            "owner": "bob::ns",
                            "issuer": "issuer::ns",
                            "tokenName": "GOLD",
                            "amount": "300.00"
                        }
                    }
                }]
            }
        }));
    });
    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/query")
            .body_contains(CURRENT_PKG)
            .body_contains("bob::ns");
        then.status(200).json_body(json!({
            "status": 200,
            "result": [{
                "contractId": "00bob",
                "templateId": format!("{CURRENT_PKG}:Tokenization:TokenHolding"),
                "payload": {
                    "owner": "bob::ns",
                    "issuer": "issuer::ns",
                    "tokenName": "GOLD",
                    "amount": "300.00"
                }
            }]
        }));
    });

    spawn_gateway(gateway_config(&server, dir.path(), 8092));
    wait_for_health(8092).await;

    let http = reqwest::Client::new();

    let propose: Value = http
        .post("http://localhost:8092/transfers")
        .json(&json!({
            "sender": "alice::ns",
            "recipient": "bob::ns",
            "issuer": "issuer::ns",
            "token_name": "GOLD",
            "amount": "300.00"
        }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(propose["success"], "true");
    assert_eq!(propose["proposal_id"], "00prop");
    assert_eq!(propose["requires_acceptance"], true);

    // The ledger archived the whole holding: 700 stays with the sender.
    alice_before.delete();
    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/query")
            .body_contains(CURRENT_PKG)
            .body_contains("alice::ns");
        then.status(200).json_body(json!({
            "status": 200,
            "result": [{
                "contractId": "00rem",
                "templateId": format!("{CURRENT_PKG}:Tokenization:TokenHolding"),
                "payload": {
                    "owner": "alice::ns",
                    "issuer": "issuer::ns",
                    "tokenName": "GOLD",
                    "amount": "700.00"
                }
            }]
        }));
    });

    let accept: Value = http
        .post("http://localhost:8092/transfers/accept")
        .json(&json!({
            "party": "bob::ns",
            "proposal_id": "00prop"
        }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(accept["success"], "true");
    assert_eq!(accept["outcome"]["state"], "completed");
    assert_eq!(accept["outcome"]["holding_id"], "00bob");
    assert_eq!(accept["outcome"]["is_legacy"], false);

    let alice_holdings: Value = http
        .get("http://localhost:8092/holdings/alice::ns")
        .send()
        .await?
        .json()
        .await?;
    let bob_holdings: Value = http
        .get("http://localhost:8092/holdings/bob::ns")
        .send()
        .await?
        .json()
        .await?;

    let alice_amount: Decimal = alice_holdings["holdings"][0]["amount"]
        .as_str()
        .unwrap()
        .parse()?;
    let bob_amount: Decimal = bob_holdings["holdings"][0]["amount"]
        .as_str()
        .unwrap()
        .parse()?;
    assert_eq!(alice_amount, Decimal::new(70000, 2));
    assert_eq!(bob_amount, Decimal::new(30000, 2));
    assert_eq!(alice_amount + bob_amount, Decimal::new(100000, 2));

    let history: Value = http
        .get("http://localhost:8092/transactions/bob::ns")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(history["success"], "true");
    let transactions = history["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["kind"], "transfer");
    assert_eq!(transactions[0]["status"], "completed");
    assert_eq!(transactions[0]["amount"], "300.00");
    assert_eq!(transactions[0]["proposal_id"], "00prop");

    propose_mock.assert();
    accept_mock.assert();
    Ok(())
}

#[tokio::test]
#[serial]
async fn mint_and_burn_flow_records_history() -> anyhow::Result<()> {
    let server = MockServer::start();
    let dir = tempdir()?;

    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/query")
            .body_contains(LEGACY_PKG);
        then.status(200)
            .json_body(json!({"status": 200, "result": []}));
    });
    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/query")
            .body_contains(CURRENT_PKG)
            .body_contains("TokenMetadata");
        then.status(200).json_body(json!({
            "status": 200,
            "result": [{
                "contractId": "00meta",
                "templateId": format!("{CURRENT_PKG}:Tokenization:TokenMetadata"),
                "payload": {
                    "issuer": "issuer::ns",
                    "tokenName": "GOLD",
                    "currency": "USD",
                    "quantityPrecision": 2,
                    "pricePrecision": 2,
                    "totalSupply": "10000.00",
                    "description": "Gold bars"
                }
            }]
        }));
    });
    let mint_create = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/create")
            .body_contains("MintRequest")
            .body_contains(r#""mintAmount":"500.00""#);
        then.status(200).json_body(json!({
            "status": 200,
            "result": {
                "contractId": "00req",
                "templateId": format!("{CURRENT_PKG}:Tokenization:MintRequest"),
                "payload": {}
            }
        }));
    });
    let mint_execute = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/exercise")
            .body_contains(r#""choice":"ExecuteMint""#);
        then.status(200).json_body(json!({
            "status": 200,
            "result": { "exerciseResult": "00h1", "events": [] }
        }));
    });
    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/query")
            .body_contains(CURRENT_PKG)
            .body_contains("TokenHolding");
        then.status(200).json_body(json!({
            "status": 200,
            "result": [{
                "contractId": "00h1",
                "templateId": format!("{CURRENT_PKG}:Tokenization:TokenHolding"),
                "payload": {
                    "owner": "alice::ns",
                    "issuer": "issuer::ns",
                    "tokenName": "GOLD",
                    "amount": "500.00"
                }
            }]
        }));
    });
    let burn_mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/v1/exercise")
            .body_contains(r#""choice":"Burn""#)
            .body_contains(r#""burnAmount":"200.00""#);
        then.status(200).json_body(json!({
            "status": 200,
            "result": { "exerciseResult": "00h2", "events": [] }
        }));
    });

    spawn_gateway(gateway_config(&server, dir.path(), 8093));
    wait_for_health(8093).await;

    let http = reqwest::Client::new();

    let mint: Value = http
        .post("http://localhost:8093/mint")
        .json(&json!({
            "issuer": "issuer::ns",
            "recipient": "alice::ns",
            "token_name": "GOLD",
            "amount": "500.00"
        }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(mint["success"], "true");
    assert_eq!(mint["holding_id"], "00h1");

    let burn: Value = http
        .post("http://localhost:8093/burn")
        .json(&json!({
            "owner": "alice::ns",
            "issuer": "issuer::ns",
            "token_name": "GOLD",
            "amount": "200.00"
        }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(burn["success"], "true");
    assert_eq!(burn["remainder_id"], "00h2");

    let history: Value = http
        .get("http://localhost:8093/transactions/alice::ns")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(history["success"], "true");
    let transactions = history["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    let kinds: Vec<&str> = transactions
        .iter()
        .map(|tx| tx["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"mint"));
    assert!(kinds.contains(&"burn"));

    mint_create.assert();
    mint_execute.assert();
    burn_mock.assert();
    Ok(())
}
