//! Shared helpers for gateway scenario tests.
//!
//! Builds configurations pointing the gateway at an httpmock ledger and
//! spawns the full server via `launch()`.

use std::path::Path;

use backon::{ExponentialBuilder, Retryable};
use httpmock::MockServer;
use tokio::task::JoinHandle;

use canton_gateway::config::{Config, LogLevel};
use canton_gateway::launch;
use canton_ledger::{AuthConfig, LedgerConfig, Party, TemplateConfig};

pub const CURRENT_PKG: &str = "aa11";
pub const LEGACY_PKG: &str = "bb22";

pub fn gateway_config(server: &MockServer, data_dir: &Path, server_port: u16) -> Config {
    Config {
        log_level: LogLevel::Debug,
        server_port,
        data_dir: data_dir.to_path_buf(),
        ledger: LedgerConfig {
            base_url: server.base_url().parse().unwrap(),
            operator_party: Party::new("operator::ns").unwrap(),
            auth: AuthConfig::StaticToken {
                token: "sandbox-token".to_string(),
            },
            templates: TemplateConfig {
                current_package: CURRENT_PKG.to_string(),
                legacy_package: Some(LEGACY_PKG.to_string()),
                module: "Tokenization".to_string(),
            },
        },
    }
}

/// Spawns the full gateway as a background task.
pub fn spawn_gateway(config: Config) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(launch(config))
}

/// Polls the health endpoint until the server answers.
pub async fn wait_for_health(port: u16) {
    let health_check = || async {
        reqwest::get(format!("http://localhost:{port}/health"))
            .await?
            .error_for_status()
    };
    health_check
        .retry(ExponentialBuilder::default())
        .await
        .expect("gateway did not become healthy");
}
