// src/main.rs
// Entry point for the advosia terminal client
use advosia::client::cli_client::Shell;
use advosia::client::utils::session_store::storage_from_config;
use advosia::client::views::ViewContext;
use advosia::common::config::ClientConfig;
use log::{info, warn};
use tokio::io::{stdin, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = std::env::args().nth(1) {
        config = config.with_api_url(url);
    }

    // RUST_LOG still wins over LOG_LEVEL when both are set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();
    info!("using API at {} (session backend {:?})", config.api_url, config.session_backend);

    let storage = storage_from_config(&config);
    let ctx = ViewContext::bootstrap(&config, storage)?;

    // the restored session is trusted until the server says otherwise
    match ctx.store().validate().await {
        Ok(Some(user)) => println!("[ADVOSIA] Welcome back, {}", user.name),
        Ok(None) => {}
        Err(e) => warn!("could not validate the stored session: {}", e),
    }

    let mut shell = Shell::new(ctx);
    shell.run(BufReader::new(stdin())).await
}
