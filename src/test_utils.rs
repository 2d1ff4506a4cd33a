//! Shared test fixtures: ledger configuration pointed at a mock server
//! and mirror stores backed by temp directories.

use std::path::Path;
use std::sync::Arc;

use httpmock::MockServer;

use canton_ledger::{AuthConfig, LedgerConfig, Party, TemplateConfig};

use crate::config::{Config, LogLevel};
use crate::mirror::MirrorStore;

pub(crate) const CURRENT_PKG: &str = "aa11";
pub(crate) const LEGACY_PKG: &str = "bb22";

pub(crate) fn ledger_config(server: &MockServer) -> LedgerConfig {
    LedgerConfig {
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
    }
}

pub(crate) fn gateway_config(server: &MockServer, data_dir: &Path, server_port: u16) -> Config {
    Config {
        log_level: LogLevel::Debug,
        server_port,
        data_dir: data_dir.to_path_buf(),
        ledger: ledger_config(server),
    }
}

pub(crate) async fn mirror(dir: &Path) -> Arc<MirrorStore> {
    Arc::new(MirrorStore::open(dir).await.unwrap())
}
