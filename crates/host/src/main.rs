use std::path::PathBuf;

use imgops_web_host::config::Config;
use imgops_web_host::{app, AppState};
use imgops_web_protocol::{catalog, ParamFormRenderer};
use tokio::signal;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("imgops-web - image operations in the browser");
    println!();
    println!("USAGE:");
    println!("    imgops-web [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>   Config file (default: {})", Config::default_config_path().display());
    println!("    -v, --version         Print version");
    println!("    -h, --help            Print this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    PORT                  Override the HTTP port");
    println!("    IMGOPS_BIND           Override the bind address");
    println!("    RUST_LOG              Log filter (default: info)");
}

fn print_connection_info(config: &Config, operations: usize) {
    eprintln!();
    eprintln!("  \x1b[1;36mimgops-web\x1b[0m v{VERSION}");
    eprintln!("  \x1b[1;32m[ops]\x1b[0m    {operations} operations available");
    eprintln!(
        "  \x1b[1;32m[http]\x1b[0m   Listening on port \x1b[1;96m{}\x1b[0m",
        config.server.port
    );
    eprintln!(
        "  \x1b[1;37m>\x1b[0m Open: \x1b[4;96mhttp://{}\x1b[0m",
        config.addr()
    );
    eprintln!();
    eprintln!("  \x1b[2mPress Ctrl+C to stop\x1b[0m");
    eprintln!();
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging (tracing)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => {
                println!("imgops-web {VERSION}");
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            other => {
                anyhow::bail!("Unknown argument '{other}' (try --help)");
            }
        }
    }

    let config = config_path.map_or_else(Config::load, |path| Config::load_from(&path));
    config.ensure_dirs()?;

    let renderer = ParamFormRenderer::new(catalog::builtin());
    print_connection_info(&config, renderer.operations().len());

    let addr = config.addr();
    let state = AppState::new(config, renderer);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
