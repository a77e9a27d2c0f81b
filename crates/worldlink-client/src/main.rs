//! WorldLink - world server chat client entry point

use clap::Parser;
use tracing::{error, info};

use worldlink_client::{
    cli::Cli,
    config::ClientConfig,
    error::Result,
    session::Session,
    Connection,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    // Load configuration
    let config = load_configuration(&cli)?;
    let session_key = config.session_key()?;

    // Connect to the world server
    info!("Connecting to {}...", config.server.address);
    let connection = match Connection::connect(&config.server.address).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to {}: {}", config.server.address, e);
            std::process::exit(1);
        }
    };

    // Run the interactive session until logout or disconnect
    if let Err(e) = Session::new(connection, config, session_key).run().await {
        error!("Session ended with an error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file, applying command-line overrides
fn load_configuration(cli: &Cli) -> Result<ClientConfig> {
    info!("Loading configuration from: {}", cli.config);
    ClientConfig::load(cli)
}
