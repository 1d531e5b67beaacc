use org_relay_lib::config::RelayConfig;
use org_relay_lib::services::relay_server;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("[relay] {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("[relay] Shutdown signal received");
        }
        signal_token.cancel();
    });

    if let Err(e) = relay_server::run(config, shutdown).await {
        log::error!("[relay] {}", e);
        std::process::exit(1);
    }
}
