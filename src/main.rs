// src/main.rs
use std::env;

use dotenvy::dotenv;
use budget_tracker::{backend, cli, config::ServerConfig, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "server" {
        logging::init_server();
        let config = ServerConfig::from_env()?;
        tracing::info!(addr = %config.bind_addr, "starting platform server");
        backend::run_server(config).await?;
    } else {
        cli::run().await?;
    }
    Ok(())
}
