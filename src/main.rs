use gatehouse::logger::*;
use gatehouse::server::*;
use gatehouse::settings::*;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    // Settings carry signing secrets, so no debug-dump of the whole struct.
    info!(
        store_backend = %project_settings.store.backend,
        log_filter = %project_settings.log.filter,
        "settings loaded"
    );
    logger.reload_from_settings(&project_settings.log)?;

    let server = Arc::new(Server::try_new(&project_settings).await?);
    info!("session services ready; waiting for SIGINT");

    signal::ctrl_c().await?;

    let shutdown_timeout = std::time::Duration::from_secs(30);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => tracing::info!("server shutdown successfully"),
        Err(_) => tracing::error!("server shutdown timed out"),
    }

    Ok(())
}
