use canton_gateway::config::{Config, Env, setup_tracing};
use canton_gateway::launch;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed_env = Env::parse();
    let config = Config::load_file(&parsed_env.config)?;
    setup_tracing(&config.log_level);

    launch(config).await?;
    Ok(())
}
