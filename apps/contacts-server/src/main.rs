use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use db::{ConnectOpts, DbHandle};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Expand a relative sqlite DSN into an absolute-path DSN under `base_dir`.
/// - Keeps in-memory DSNs as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    let Some(db_path) = dsn.strip_prefix("sqlite://") else {
        return Ok(dsn.to_string());
    };
    if db_path.starts_with(":memory:") {
        return Ok(dsn.to_string());
    }

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Contact Manager Server - REST API for contact form submissions
#[derive(Parser)]
#[command(name = "contacts-server")]
#[command(about = "Contact Manager Server - REST API for contact form submissions")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        database_url: cli.database_url.clone(),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let base_dir = std::env::current_dir().context("Failed to resolve working directory")?;

    // Initialize logging
    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(runtime::default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, &base_dir);
    tracing::info!("Contact Manager Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, &base_dir).await,
        Commands::Check => check_config(config),
    }
}

fn connect_opts(config: &AppConfig) -> ConnectOpts {
    ConnectOpts {
        max_conns: config.database.max_conns,
        acquire_timeout: config
            .database
            .acquire_timeout_secs
            .map(Duration::from_secs),
        ..Default::default()
    }
}

async fn run_server(config: AppConfig, base_dir: &Path) -> Result<()> {
    let dsn = absolutize_sqlite_dsn(config.database.url.trim(), base_dir)?;
    let db = Arc::new(
        DbHandle::new(&dsn, connect_opts(&config))?.with_on_connect(contacts::migrate),
    );

    // The server keeps running on a dead store; requests retry the connect.
    if let Err(e) = db.connect().await {
        tracing::error!(error = %e, "Database connection error, serving without a store");
    }

    tracing::info!("Initializing modules...");
    let module = contacts::Contacts::new(db.clone());
    let ingress = api_ingress::ApiIngress::new(config.module_config("api_ingress")?);
    let router = ingress.build_router(
        module.register_rest(axum::Router::new()),
        Some(contacts::Contacts::openapi()),
    );

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind_addr()))?;

    let cancel = CancellationToken::new();
    let signals = runtime::shutdown::cancel_on_signal(cancel.clone());

    let served = ingress.serve(router, addr, cancel.clone()).await;

    cancel.cancel();
    signals.abort();
    db.close().await;
    tracing::info!("Contact Manager Server stopped");
    served
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let engine = DbHandle::detect(&config.database.url)
        .with_context(|| "Invalid database configuration".to_string())?;
    let _: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind_addr()))?;
    let _: api_ingress::ApiIngressConfig = config.module_config("api_ingress")?;

    tracing::info!(?engine, "Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sqlite_path_is_anchored_at_base_dir() {
        let out = absolutize_sqlite_dsn("sqlite://contact-manager.db?mode=rwc", Path::new("/srv/app"))
            .unwrap();
        assert_eq!(out, "sqlite:///srv/app/contact-manager.db?mode=rwc");
    }

    #[test]
    fn absolute_and_memory_dsns_are_untouched() {
        let base = Path::new("/srv/app");
        assert_eq!(
            absolutize_sqlite_dsn("sqlite:///var/lib/c.db", base).unwrap(),
            "sqlite:///var/lib/c.db"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite::memory:", base).unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            absolutize_sqlite_dsn("postgres://u:p@db/contacts", base).unwrap(),
            "postgres://u:p@db/contacts"
        );
    }

    #[test]
    fn empty_sqlite_path_is_rejected() {
        assert!(absolutize_sqlite_dsn("sqlite://?mode=rwc", Path::new("/srv")).is_err());
    }
}
