use push_build_hook::api::build_router;
use push_build_hook::error::HookError;
use push_build_hook::job::ScriptDispatcher;
use push_build_hook::logging::{FileLogger, setup_logging};
use push_build_hook::{AppState, HookConfig, load_config};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{self, info, warn};

const DEFAULT_CONFIG_PATH: &str = "hook_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("HOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: HookConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Held until main returns so buffered log lines are flushed
    let _log_guard = match FileLogger::new(&config.log_file)
        .and_then(|logger| setup_logging(&logger, config.console_log))
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config, &config_path).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: HookConfig, config_path: &str) -> Result<(), HookError> {
    let bind_address = config.bind_address();

    info!("{}", "=".repeat(70));
    info!("{} webhook listener starting", config.app_name);
    info!("{}", "=".repeat(70));
    info!("Config:       {}", config_path);
    info!("Port:         {}", config.port);
    info!("Build script: {}", config.build_script.display());
    info!("Log file:     {}", config.log_file.display());
    info!("Target ref:   {}", config.target_ref);
    if !config.build_script.exists() {
        warn!(
            "Build script {} does not exist yet; builds will fail to start until it does",
            config.build_script.display()
        );
    }

    let state = Arc::new(AppState {
        dispatcher: Arc::new(ScriptDispatcher::new(&config.build_script)),
        config,
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| HookError::ConfigError(format!("Cannot bind {}: {}", bind_address, e)))?;

    info!("Listening on {}", bind_address);
    info!("Webhook URL:  http://{}/webhook", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Webhook listener stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down webhook listener...");
}
