use std::sync::Arc;

use rocket::{Ignite, Rocket};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{error, info};

pub mod accounts;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod holdings;
pub mod minting;
pub mod mirror;
pub mod registry;
pub mod transfer;

#[cfg(test)]
pub mod test_utils;

pub use config::setup_tracing;

use canton_ledger::LedgerClient;

use crate::accounts::AccountService;
use crate::config::Config;
use crate::error::GatewayError;
use crate::holdings::HoldingsService;
use crate::minting::MintBurnService;
use crate::mirror::MirrorStore;
use crate::registry::RegistryService;
use crate::transfer::TransferOrchestrator;

/// Service graph shared by the API routes and the CLI. One ledger client
/// and one mirror store back every service.
pub struct Services {
    pub registry: RegistryService,
    pub holdings: HoldingsService,
    pub transfers: TransferOrchestrator,
    pub minting: MintBurnService,
    pub accounts: AccountService,
    pub mirror: Arc<MirrorStore>,
}

impl Services {
    pub async fn build(config: &Config) -> Result<Self, GatewayError> {
        let client = Arc::new(LedgerClient::new(&config.ledger));
        let mirror = Arc::new(MirrorStore::open(&config.data_dir).await?);
        let operator = config.ledger.operator_party.clone();
        Ok(Self {
            registry: RegistryService::new(
                Arc::clone(&client),
                Arc::clone(&mirror),
                operator.clone(),
            ),
            holdings: HoldingsService::new(Arc::clone(&client), Arc::clone(&mirror)),
            transfers: TransferOrchestrator::new(Arc::clone(&client), Arc::clone(&mirror)),
            minting: MintBurnService::new(Arc::clone(&client), Arc::clone(&mirror)),
            accounts: AccountService::new(client, Arc::clone(&mirror), operator),
            mirror,
        })
    }
}

#[tracing::instrument(skip_all, level = tracing::Level::INFO)]
pub async fn launch(config: Config) -> anyhow::Result<()> {
    let services = Services::build(&config).await?;
    let server_task = spawn_server_task(&config, services);

    await_shutdown(server_task).await;

    info!("Shutdown complete");
    Ok(())
}

fn spawn_server_task(
    config: &Config,
    services: Services,
) -> JoinHandle<Result<Rocket<Ignite>, rocket::Error>> {
    let rocket_config = rocket::Config::figment()
        .merge(("port", config.server_port))
        .merge(("address", "0.0.0.0"));

    let rocket = rocket::custom(rocket_config)
        .mount("/", api::routes())
        .manage(services);

    tokio::spawn(rocket.launch())
}

async fn await_shutdown(server_task: JoinHandle<Result<Rocket<Ignite>, rocket::Error>>) {
    let server_abort = server_task.abort_handle();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, shutting down gracefully...");
            abort_task("server", &server_abort);
        }
        result = server_task => {
            log_server_result(result);
        }
    }
}

fn abort_task(name: &str, handle: &AbortHandle) {
    info!("Aborting {name} task");
    handle.abort();
}

fn log_server_result(result: Result<Result<Rocket<Ignite>, rocket::Error>, JoinError>) {
    match result {
        Ok(Ok(_)) => info!("Server completed successfully"),
        Ok(Err(e)) => error!("Server failed: {e}"),
        Err(e) => error!("Server task panicked: {e}"),
    }
}
