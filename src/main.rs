/// FixMyStreet API server
use anyhow::Context;
use fixmystreet::{
    config::{LogFormat, ServerConfig},
    context::AppContext,
    metrics, server,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before logging so the format can be chosen
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    init_tracing(&config);
    metrics::init();

    print_banner();

    let ctx = AppContext::new(config)
        .await
        .context("failed to initialise application context")?;

    match ctx.account_manager.prune_expired_tokens().await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "expired_tokens_pruned"),
        Err(e) => tracing::warn!(error = %e, "expired_token_prune_failed"),
    }

    server::serve(ctx).await.context("server error")?;

    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn print_banner() {
    println!(
        r#"
    _____ _      __  __       ____  _                 _
   |  ___(_)_  _|  \/  |_   _/ ___|| |_ _ __ ___  ___| |_
   | |_  | \ \/ / |\/| | | | \___ \| __| '__/ _ \/ _ \ __|
   |  _| | |>  <| |  | | |_| |___) | |_| | |  __/  __/ |_
   |_|   |_/_/\_\_|  |_|\__, |____/ \__|_|  \___|\___|\__|
                        |___/
        Civic road-issue reporting API v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
