use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::io::Write;
use thiserror::Error;
use tracing::{error, info};

use canton_ledger::contracts::TokenMetadata;
use canton_ledger::{Party, TokenName};

use crate::Services;
use crate::config::{Config, Env};
use crate::transfer::TransferOutcome;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid amount: {value}. Amounts must be greater than zero")]
    InvalidAmount { value: Decimal },
}

#[derive(Debug, Parser)]
#[command(name = "gateway")]
#[command(about = "A CLI for the Canton tokenization gateway")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a new token class
    CreateToken {
        /// Issuing party identifier (e.g. issuer::namespace)
        #[arg(long = "issuer")]
        issuer: Party,
        /// Token name, unique per issuer
        #[arg(long = "name")]
        name: TokenName,
        /// Denomination currency code
        #[arg(long = "currency", default_value = "USD")]
        currency: String,
        /// Decimal places tracked for token quantities
        #[arg(long = "quantity-precision", default_value_t = 2)]
        quantity_precision: u32,
        /// Decimal places tracked for prices
        #[arg(long = "price-precision", default_value_t = 2)]
        price_precision: u32,
        /// Advertised total supply
        #[arg(long = "total-supply")]
        total_supply: Decimal,
        #[arg(long = "description", default_value = "")]
        description: String,
    },
    /// List every registered token class
    Tokens,
    /// Replace the advertised total supply of a token class
    SetSupply {
        #[arg(long = "issuer")]
        issuer: Party,
        #[arg(long = "name")]
        name: TokenName,
        #[arg(long = "total-supply")]
        total_supply: Decimal,
    },
    /// Mint new tokens into a recipient's holding
    Mint {
        #[arg(long = "issuer")]
        issuer: Party,
        #[arg(long = "recipient")]
        recipient: Party,
        #[arg(long = "name")]
        name: TokenName,
        #[arg(long = "amount")]
        amount: Decimal,
    },
    /// Burn tokens from a holding
    Burn {
        #[arg(long = "owner")]
        owner: Party,
        #[arg(long = "issuer")]
        issuer: Party,
        #[arg(long = "name")]
        name: TokenName,
        #[arg(long = "amount")]
        amount: Decimal,
        /// Burn with the issuer's authority instead of the owner's
        #[arg(long = "as-issuer")]
        as_issuer: bool,
    },
    /// Propose a transfer to a recipient
    Transfer {
        #[arg(long = "sender")]
        sender: Party,
        #[arg(long = "recipient")]
        recipient: Party,
        #[arg(long = "issuer")]
        issuer: Party,
        #[arg(long = "name")]
        name: TokenName,
        #[arg(long = "amount")]
        amount: Decimal,
    },
    /// Accept a pending transfer proposal
    Accept {
        /// Party acting on the proposal
        #[arg(long = "party")]
        party: Party,
        #[arg(long = "proposal")]
        proposal_id: String,
    },
    /// Reject a pending transfer proposal
    Reject {
        /// Party acting on the proposal
        #[arg(long = "party")]
        party: Party,
        #[arg(long = "proposal")]
        proposal_id: String,
    },
    /// Show aggregated balances for a party
    Balances {
        #[arg(long = "party")]
        party: Party,
    },
    /// Map an identity provider subject to a ledger party
    ResolveParty {
        #[arg(long = "subject")]
        subject: String,
        #[arg(long = "display-name")]
        display_name: String,
        #[arg(long = "email")]
        email: Option<String>,
    },
    /// Show the transaction history of a party
    History {
        #[arg(long = "party")]
        party: Party,
    },
}

#[derive(Debug, Parser)]
#[command(name = "gateway-cli")]
#[command(about = "A CLI for the Canton tokenization gateway")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

impl CliEnv {
    /// Parse CLI arguments and load the configuration file they point at
    pub fn parse_and_convert() -> anyhow::Result<(Config, Commands)> {
        let cli_env = Self::parse();
        let config = Config::load_file(&cli_env.env.config)?;
        Ok((config, cli_env.command))
    }
}

fn validate_amount(value: Decimal) -> Result<Decimal, CliError> {
    if value <= Decimal::ZERO {
        return Err(CliError::InvalidAmount { value });
    }
    Ok(value)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cli = Cli::parse();
    let services = Services::build(&config).await?;
    run_command_with_writers(&services, cli.command, &mut std::io::stdout()).await
}

pub async fn run_command(config: Config, command: Commands) -> anyhow::Result<()> {
    let services = Services::build(&config).await?;
    run_command_with_writers(&services, command, &mut std::io::stdout()).await
}

async fn run_command_with_writers<W: Write>(
    services: &Services,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::CreateToken {
            issuer,
            name,
            currency,
            quantity_precision,
            price_precision,
            total_supply,
            description,
        } => {
            let metadata = TokenMetadata {
                issuer: issuer.clone(),
                token_name: name,
                currency,
                quantity_precision,
                price_precision,
                total_supply,
                description,
            };
            info!(
                "Creating token: issuer={issuer}, name={}",
                metadata.token_name
            );
            writeln!(stdout, "🔄 Registering token {}...", metadata.token_name)?;
            match services.registry.create_token(&issuer, metadata).await {
                Ok(contract_id) => {
                    writeln!(stdout, "✅ Token registered!")?;
                    writeln!(stdout, "   Contract ID: {contract_id}")?;
                }
                Err(e) => {
                    error!("Token registration failed: {e:?}");
                    writeln!(stdout, "❌ Failed to register token: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::Tokens => {
            match services.registry.list_tokens().await {
                Ok(tokens) => {
                    writeln!(stdout, "✅ {} token class(es)", tokens.len())?;
                    for token in tokens {
                        writeln!(
                            stdout,
                            "   {} ({}) issuer={} supply={}",
                            token.payload.token_name,
                            token.payload.currency,
                            token.payload.issuer,
                            token.payload.total_supply
                        )?;
                    }
                }
                Err(e) => {
                    error!("Token listing failed: {e:?}");
                    writeln!(stdout, "❌ Failed to list tokens: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::SetSupply {
            issuer,
            name,
            total_supply,
        } => {
            info!("Updating total supply: issuer={issuer}, name={name}, supply={total_supply}");
            writeln!(stdout, "🔄 Updating total supply of {name}...")?;
            match services
                .registry
                .update_total_supply(&issuer, &name, total_supply)
                .await
            {
                Ok(contract_id) => {
                    writeln!(stdout, "✅ Total supply updated!")?;
                    writeln!(stdout, "   Metadata contract: {contract_id}")?;
                }
                Err(e) => {
                    error!("Supply update failed: {e:?}");
                    writeln!(stdout, "❌ Failed to update total supply: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::Mint {
            issuer,
            recipient,
            name,
            amount,
        } => {
            let amount = validate_amount(amount)?;
            info!("Minting: issuer={issuer}, recipient={recipient}, name={name}, amount={amount}");
            writeln!(stdout, "🔄 Minting {amount} {name} for {recipient}...")?;
            match services
                .minting
                .mint(&issuer, &recipient, &name, amount)
                .await
            {
                Ok(holding_id) => {
                    writeln!(stdout, "✅ Mint executed!")?;
                    writeln!(stdout, "   New holding: {holding_id}")?;
                }
                Err(e) => {
                    error!("Mint failed: {e:?}");
                    writeln!(stdout, "❌ Failed to mint: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::Burn {
            owner,
            issuer,
            name,
            amount,
            as_issuer,
        } => {
            let amount = validate_amount(amount)?;
            info!("Burning: owner={owner}, name={name}, amount={amount}, as_issuer={as_issuer}");
            writeln!(stdout, "🔄 Burning {amount} {name}...")?;
            let result = if as_issuer {
                services
                    .minting
                    .issuer_burn(&issuer, &owner, &name, amount)
                    .await
            } else {
                services.minting.burn(&owner, &issuer, &name, amount).await
            };
            match result {
                Ok(Some(remainder)) => {
                    writeln!(stdout, "✅ Burn executed!")?;
                    writeln!(stdout, "   Remainder holding: {remainder}")?;
                }
                Ok(None) => {
                    writeln!(stdout, "✅ Burn executed!")?;
                    writeln!(stdout, "   Holding fully consumed")?;
                }
                Err(e) => {
                    error!("Burn failed: {e:?}");
                    writeln!(stdout, "❌ Failed to burn: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::Transfer {
            sender,
            recipient,
            issuer,
            name,
            amount,
        } => {
            let amount = validate_amount(amount)?;
            info!("Proposing transfer: sender={sender}, recipient={recipient}, amount={amount}");
            writeln!(stdout, "🔄 Proposing transfer of {amount} {name}...")?;
            match services
                .transfers
                .propose(&sender, &recipient, &issuer, &name, amount)
                .await
            {
                Ok(receipt) => {
                    writeln!(stdout, "✅ Transfer proposed!")?;
                    writeln!(stdout, "   Proposal ID: {}", receipt.proposal_id)?;
                    writeln!(stdout, "   Awaiting acceptance by {recipient}")?;
                }
                Err(e) => {
                    error!("Transfer proposal failed: {e:?}");
                    writeln!(stdout, "❌ Failed to propose transfer: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::Accept { party, proposal_id } => {
            info!("Accepting transfer proposal {proposal_id} as {party}");
            writeln!(stdout, "🔄 Accepting transfer proposal...")?;
            match services.transfers.accept(&party, &proposal_id).await {
                Ok(outcome) => report_transfer_outcome(&outcome, stdout)?,
                Err(e) => {
                    error!("Transfer acceptance failed: {e:?}");
                    writeln!(stdout, "❌ Failed to accept transfer: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::Reject { party, proposal_id } => {
            info!("Rejecting transfer proposal {proposal_id} as {party}");
            writeln!(stdout, "🔄 Rejecting transfer proposal...")?;
            match services.transfers.reject(&party, &proposal_id).await {
                Ok(outcome) => report_transfer_outcome(&outcome, stdout)?,
                Err(e) => {
                    error!("Transfer rejection failed: {e:?}");
                    writeln!(stdout, "❌ Failed to reject transfer: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::Balances { party } => {
            match services.holdings.balances(&party).await {
                Ok(balances) => {
                    writeln!(stdout, "✅ Balances for {party}:")?;
                    if balances.is_empty() {
                        writeln!(stdout, "   (no holdings)")?;
                    }
                    for balance in balances {
                        writeln!(
                            stdout,
                            "   {} {} from {} ({} holding(s))",
                            balance.amount,
                            balance.token_name,
                            balance.issuer,
                            balance.holding_count
                        )?;
                    }
                }
                Err(e) => {
                    error!("Balance lookup failed: {e:?}");
                    writeln!(stdout, "❌ Failed to fetch balances: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::ResolveParty {
            subject,
            display_name,
            email,
        } => {
            info!("Resolving party for subject {subject}");
            writeln!(stdout, "🔄 Resolving ledger party for {display_name}...")?;
            match services.accounts.resolve(&subject, &display_name, email).await {
                Ok(user) => {
                    writeln!(stdout, "✅ Party resolved!")?;
                    writeln!(stdout, "   Party: {}", user.party)?;
                    writeln!(stdout, "   User ID: {}", user.id)?;
                }
                Err(e) => {
                    error!("Party resolution failed: {e:?}");
                    writeln!(stdout, "❌ Failed to resolve party: {e}")?;
                    return Err(e.into());
                }
            }
        }
        Commands::History { party } => {
            let transactions = services.mirror.transactions_for(&party).await;
            writeln!(stdout, "✅ {} transaction(s) for {party}", transactions.len())?;
            for tx in transactions {
                writeln!(
                    stdout,
                    "   [{:?}] {:?} {} {} at {}",
                    tx.status, tx.kind, tx.amount, tx.token_name, tx.recorded_at
                )?;
            }
        }
    }

    info!("CLI operation completed successfully");
    Ok(())
}

fn report_transfer_outcome<W: Write>(
    outcome: &TransferOutcome,
    stdout: &mut W,
) -> std::io::Result<()> {
    match outcome {
        TransferOutcome::Completed {
            holding_id,
            is_legacy,
        } => {
            writeln!(stdout, "✅ Transfer completed!")?;
            if let Some(holding_id) = holding_id {
                writeln!(stdout, "   New holding: {holding_id}")?;
            }
            if *is_legacy {
                writeln!(stdout, "   Resolved via legacy template")?;
            }
        }
        TransferOutcome::Rejected {
            is_legacy,
            tokens_restored,
        } => {
            writeln!(stdout, "✅ Transfer rejected")?;
            if *tokens_restored {
                writeln!(stdout, "   Locked tokens returned to the sender")?;
            } else if *is_legacy {
                writeln!(stdout, "   Legacy proposal: locked tokens were not returned")?;
            }
        }
        TransferOutcome::Stale { message } => {
            writeln!(stdout, "✅ Proposal already resolved: {message}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CURRENT_PKG, LEGACY_PKG, gateway_config};
    use clap::CommandFactory;
    use httpmock::MockServer;
    use serde_json::json;
    use tempfile::tempdir;

    async fn test_services(server: &MockServer, dir: &std::path::Path) -> Services {
        Services::build(&gateway_config(server, dir, 8000))
            .await
            .unwrap()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_validate_amount_valid() {
        assert_eq!(
            validate_amount("10.00".parse().unwrap()).unwrap(),
            "10.00".parse::<Decimal>().unwrap()
        );
        assert_eq!(
            validate_amount("0.01".parse().unwrap()).unwrap(),
            "0.01".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn test_validate_amount_invalid() {
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(CliError::InvalidAmount { .. })
        ));
        assert!(matches!(
            validate_amount("-5.00".parse().unwrap()),
            Err(CliError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_cli_command_structure_validation() {
        let cmd = Cli::command();

        let result = cmd.clone().try_get_matches_from(vec![
            "gateway",
            "mint",
            "--issuer",
            "issuer::ns",
            "--recipient",
            "alice::ns",
            "--name",
            "GOLD",
        ]);
        assert!(result.is_err());

        let result = cmd.clone().try_get_matches_from(vec![
            "gateway",
            "mint",
            "--issuer",
            "issuer::ns",
            "--recipient",
            "alice::ns",
            "--name",
            "GOLD",
            "--amount",
            "10.00",
        ]);
        assert!(result.is_ok());

        let result = cmd.clone().try_get_matches_from(vec!["gateway", "balances"]);
        assert!(result.is_err());

        let result = cmd.try_get_matches_from(vec![
            "gateway",
            "transfer",
            "--sender",
            "alice::ns",
            "--recipient",
            "bob::ns",
            "--issuer",
            "issuer::ns",
            "--name",
            "GOLD",
            "--amount",
            "5",
        ]);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_mint_command() {
        let server = MockServer::start();
        let dir = tempdir().unwrap();

        let token_query = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/query")
                .body_contains(CURRENT_PKG);
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
                        "totalSupply": "1000.00",
                        "description": "Gold bars"
                    }
                }]
            }));
        });
        server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/query")
                .body_contains(LEGACY_PKG);
            then.status(200)
                .json_body(json!({"status": 200, "result": []}));
        });
        let create_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/create")
                .body_contains(r#""mintAmount":"250.00""#);
            then.status(200).json_body(json!({
                "status": 200,
                "result": {
                    "contractId": "00req",
                    "templateId": format!("{CURRENT_PKG}:Tokenization:MintRequest"),
                    "payload": {}
                }
            }));
        });
        let execute_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/exercise")
                .body_contains(r#""choice":"ExecuteMint""#);
            then.status(200).json_body(json!({
                "status": 200,
                "result": { "exerciseResult": "00h1", "events": [] }
            }));
        });

        let services = test_services(&server, dir.path()).await;
        let mut stdout = Vec::new();

        run_command_with_writers(
            &services,
            Commands::Mint {
                issuer: "issuer::ns".parse().unwrap(),
                recipient: "alice::ns".parse().unwrap(),
                name: "GOLD".parse().unwrap(),
                amount: "250.00".parse().unwrap(),
            },
            &mut stdout,
        )
        .await
        .unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("✅ Mint executed!"));
        assert!(output.contains("00h1"));
        token_query.assert();
        create_mock.assert();
        execute_mock.assert();
    }

    #[tokio::test]
    async fn test_transfer_insufficient_balance_fails() {
        let server = MockServer::start();
        let dir = tempdir().unwrap();

        server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/v1/query");
            then.status(200)
                .json_body(json!({"status": 200, "result": []}));
        });
        let exercise_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/v1/exercise");
            then.status(200).json_body(json!({"status": 200, "result": {}}));
        });

        let services = test_services(&server, dir.path()).await;
        let mut stdout = Vec::new();

        let result = run_command_with_writers(
            &services,
            Commands::Transfer {
                sender: "alice::ns".parse().unwrap(),
                recipient: "bob::ns".parse().unwrap(),
                issuer: "issuer::ns".parse().unwrap(),
                name: "GOLD".parse().unwrap(),
                amount: "50.00".parse().unwrap(),
            },
            &mut stdout,
        )
        .await;

        assert!(result.is_err());
        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("❌ Failed to propose transfer:"));
        exercise_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_transfer_rejects_nonpositive_amount_before_any_call() {
        let server = MockServer::start();
        let dir = tempdir().unwrap();

        let query_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/v1/query");
            then.status(200)
                .json_body(json!({"status": 200, "result": []}));
        });

        let services = test_services(&server, dir.path()).await;

        let result = run_command_with_writers(
            &services,
            Commands::Transfer {
                sender: "alice::ns".parse().unwrap(),
                recipient: "bob::ns".parse().unwrap(),
                issuer: "issuer::ns".parse().unwrap(),
                name: "GOLD".parse().unwrap(),
                amount: Decimal::ZERO,
            },
            &mut std::io::sink(),
        )
        .await;

        assert!(result.is_err());
        query_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_balances_command_lists_positions() {
        let server = MockServer::start();
        let dir = tempdir().unwrap();

        server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/query")
                .body_contains(CURRENT_PKG);
            then.status(200).json_body(json!({
                "status": 200,
                "result": [
                    {
                        "contractId": "00h1",
                        "templateId": format!("{CURRENT_PKG}:Tokenization:TokenHolding"),
                        "payload": {
                            "owner": "alice::ns",
                            "issuer": "issuer::ns",
                            "tokenName": "GOLD",
                            "amount": "60.00"
                        }
                    },
                    {
                        "contractId": "00h2",
                        "templateId": format!("{CURRENT_PKG}:Tokenization:TokenHolding"),
                        "payload": {
                            "owner": "alice::ns",
                            "issuer": "issuer::ns",
                            "tokenName": "GOLD",
                            "amount": "40.00"
                        }
                    }
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/query")
                .body_contains(LEGACY_PKG);
            then.status(200)
                .json_body(json!({"status": 200, "result": []}));
        });

        let services = test_services(&server, dir.path()).await;
        let mut stdout = Vec::new();

        run_command_with_writers(
            &services,
            Commands::Balances {
                party: "alice::ns".parse().unwrap(),
            },
            &mut stdout,
        )
        .await
        .unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("✅ Balances for alice::ns:"));
        assert!(output.contains("100.00 GOLD from issuer::ns (2 holding(s))"));
    }

    #[tokio::test]
    async fn test_history_command_reads_mirror() {
        let server = MockServer::start();
        let dir = tempdir().unwrap();

        let services = test_services(&server, dir.path()).await;
        services
            .mirror
            .apply_mint(
                &"issuer::ns".parse().unwrap(),
                &"alice::ns".parse().unwrap(),
                &"GOLD".parse().unwrap(),
                "250.00".parse().unwrap(),
            )
            .await
            .unwrap();

        let mut stdout = Vec::new();
        run_command_with_writers(
            &services,
            Commands::History {
                party: "alice::ns".parse().unwrap(),
            },
            &mut stdout,
        )
        .await
        .unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("1 transaction(s) for alice::ns"));
        assert!(output.contains("Mint"));
        assert!(output.contains("250.00"));
    }
}
