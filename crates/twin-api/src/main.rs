//! Digital twin CLI and HTTP API entry point.
//!
//! Binary name: `twin`
//!
//! Loads `.env` and configuration, initializes tracing and application state,
//! then either starts the HTTP server or runs a CLI command.

mod cli;
mod http;
mod state;

use std::path::PathBuf;

use clap::Parser;

use cli::{Cli, Commands};
use state::AppState;
use twin_infra::config::{apply_env_overrides, load_config, resolve_config_path};
use twin_observe::tracing_setup::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env values win over the inherited environment.
    let dotenv = dotenvy::dotenv_override();

    let cli = Cli::parse();
    init_tracing(cli.log_directive(), cli.otel).map_err(|e| anyhow::anyhow!(e))?;

    if let Some(problem) = dotenv_problem(&dotenv) {
        tracing::warn!("Ignoring .env file: {problem}");
    }

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = load_config(config_path.as_deref()).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    let result = run(cli, config).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, mut config: twin_types::config::TwinConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }

            let state = AppState::init(config).await?;
            let server = &state.config.server;
            let addr = format!("{}:{}", server.host, server.port);

            tracing::info!(
                addr = %addr,
                provider = %state.config.model.provider,
                backend = state.orchestrator.client_name(),
                model = %state.config.model.model,
                window_size = state.config.chat.window_size,
                memory_dir = %state.config.chat.memory_dir.display(),
                cors_origins = ?server.cors_origins,
                static_dir = ?server.static_dir,
                auth_jwks_configured = state.config.auth.jwks_url.is_some(),
                "Starting digital twin API"
            );

            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} Digital twin API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Sessions => {
            let state = AppState::init(config).await?;
            cli::session::list_sessions(&state, cli.json).await?;
        }
    }

    Ok(())
}

/// A missing `.env` is normal; anything else is worth reporting.
fn dotenv_problem(result: &Result<PathBuf, dotenvy::Error>) -> Option<String> {
    match result {
        Ok(_) => None,
        Err(e) if e.not_found() => None,
        Err(e) => Some(e.to_string()),
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
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

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dotenv_is_silent() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "no .env");
        assert_eq!(dotenv_problem(&Err(dotenvy::Error::Io(missing))), None);
        assert_eq!(dotenv_problem(&Ok(PathBuf::from(".env"))), None);
    }

    #[test]
    fn test_malformed_dotenv_is_reported() {
        let parse = dotenvy::Error::LineParse("OLLAMA_BASE_URL = 'unterminated".to_string(), 16);
        let problem = dotenv_problem(&Err(parse)).unwrap();
        assert!(problem.contains("OLLAMA_BASE_URL"));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(dotenv_problem(&Err(dotenvy::Error::Io(denied))).is_some());
    }
}
