//! Grader API server: runs and validates learner code over HTTP.

mod auth;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::Router;
use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use grader::io::config::load_config;
use grader::submit::Grader;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::auth::TokenAuth;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "grader-server")]
#[command(about = "HTTP API for running and validating lesson code")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3001")]
    port: u16,

    /// Grader config file (defaults apply when missing)
    #[arg(long, default_value = "grader.toml")]
    config: PathBuf,

    /// Secret used to sign and verify bearer tokens
    #[arg(long, env = "GRADER_AUTH_SECRET", hide_env_values = true)]
    auth_secret: String,

    /// Allowed CORS origin (repeatable). Any origin is allowed when omitted.
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Frontend base URL for share links
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:5173")]
    public_url: String,

    /// Directory containing UI static files
    #[arg(long)]
    ui_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a bearer token for a user id and exit.
    IssueToken { user_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    grader::logging::init("grader_server=info,grader=info");

    let args = Args::parse();
    let auth = TokenAuth::new(args.auth_secret);

    if let Some(Command::IssueToken { user_id }) = args.command {
        println!("{}", auth.issue(&user_id));
        return Ok(());
    }

    let cfg = load_config(&args.config).context("load grader config")?;
    let base_dir = args
        .config
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let grader = Grader::from_config(&cfg, base_dir)?;
    let progress = cfg.open_progress(base_dir)?;
    let shares = cfg.open_shares(base_dir)?;
    info!(
        config = %args.config.display(),
        lessons = grader.rules().len(),
        runtime = ?cfg.runtime.command,
        timeout_ms = cfg.runtime.timeout_ms,
        "starting grader-server"
    );

    let state = AppState::new(grader, auth, progress, shares, &args.public_url);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors_layer(&args.cors_origins)?)
        .with_state(state);

    if let Some(ui_dir) = args.ui_dir {
        if ui_dir.exists() {
            info!(ui_dir = %ui_dir.display(), "serving static UI files");
            app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
        } else {
            info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
        }
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
