use clap::Parser;
use photo_diary::config::{AppConfig, setup_logging};
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = photo_diary::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let config = AppConfig::from_cli(&cli);
    match &config {
        Ok(config) => info!(
            "Using model {} at {}",
            config.model, config.api_base_url
        ),
        Err(err) => error!("Startup configuration error: {}", err),
    }

    if let Err(err) = photo_diary::web::setup_server(&cli.listen_address, cli.port, config).await
    {
        error!("Application error: {}", err);
    }
}
