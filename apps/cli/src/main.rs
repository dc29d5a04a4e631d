mod config;
mod push;
mod source;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{Config, TOKEN_ENV};
use qobuz_rpc_auth::AuthBootstrap;
use qobuz_rpc_core::{parse_window_title, ConnectionStatus, Credential, TrackState};
use qobuz_rpc_delivery::{ArtworkLookup, HttpDeliveryChannel};
use qobuz_rpc_sync::{SyncController, TrackWatcher};
use push::{PushServer, PushState};
use source::CommandSource;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mirror what Qobuz is playing to your Discord status
#[derive(Parser)]
#[command(name = "qobuz-rpc", version)]
struct Cli {
    /// Config file (defaults to <config dir>/qobuz-rpc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with Discord and print the access token
    Login,
    /// Send a single status update
    Send(SendArgs),
    /// Poll a track source and keep the status in sync
    Watch(WatchArgs),
    /// Accept pushed track titles on a local HTTP endpoint
    Serve(ServeArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct SendArgs {
    #[command(flatten)]
    auth: TokenArgs,

    /// Track title, or a "Song - Artist" window title with --window-title
    title: String,

    #[arg(long, default_value = "")]
    artist: String,

    #[arg(long, default_value = "")]
    album: String,

    /// Treat TITLE as a player window title
    #[arg(long)]
    window_title: bool,

    /// Send as paused
    #[arg(long)]
    paused: bool,

    #[arg(long, default_value_t = 0)]
    duration: u64,

    #[arg(long, default_value_t = 0)]
    position: u64,

    #[arg(long)]
    art_url: Option<String>,

    /// Quality tag, e.g. "24-bit / 192 kHz"
    #[arg(long)]
    quality: Option<String>,
}

#[derive(Args)]
struct TokenArgs {
    /// Access token (falls back to QOBUZ_RPC_TOKEN)
    #[arg(long)]
    token: Option<String>,
}

#[derive(Args)]
struct WatchArgs {
    #[command(flatten)]
    auth: TokenArgs,

    /// Command printing the current track (overrides [source] command)
    #[arg(long)]
    command: Option<String>,

    /// Run the browser login when no token is available
    #[arg(long)]
    login: bool,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    auth: TokenArgs,

    /// Address to listen on (overrides [push] bind)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Run the browser login when no token is available
    #[arg(long)]
    login: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,qobuz_rpc=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();

    match cli.command {
        Command::Login => login(&config).await,
        Command::Send(args) => send(&config, args).await,
        Command::Watch(args) => watch(&config, args).await,
        Command::Serve(args) => serve(&config, args).await,
        Command::Config => {
            println!("{}", config.to_redacted_toml()?);
            Ok(())
        }
    }
}

fn bootstrap(config: &Config) -> Result<AuthBootstrap> {
    AuthBootstrap::new(
        config.discord.oauth.clone(),
        config.discord.callback_bind,
        config.login_timeout(),
    )
}

fn controller(config: &Config) -> Result<SyncController> {
    let channel = HttpDeliveryChannel::new(&config.api.base_url, config.request_timeout())?;
    let controller = SyncController::new(Arc::new(channel), config.sync_settings());
    tracing::info!("Status updates go to {}", controller.endpoint());
    Ok(controller)
}

fn resolve_token(args: &TokenArgs) -> Option<Credential> {
    args.token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .filter(|token| !token.is_empty())
        .map(Credential::new)
}

async fn login(config: &Config) -> Result<()> {
    let bootstrap = bootstrap(config)?;
    println!("Open this URL to log in:\n\n  {}\n", bootstrap.authorize_url());

    let credential = bootstrap
        .login()
        .await
        .context("Login failed, run `qobuz-rpc login` again to retry")?;

    println!("Logged in. Export the token to reuse it:\n\n  export {}={}", TOKEN_ENV, credential.expose());
    Ok(())
}

async fn send(config: &Config, args: SendArgs) -> Result<()> {
    let credential = resolve_token(&args.auth)
        .with_context(|| format!("No access token: pass --token or set {}", TOKEN_ENV))?;

    let mut track = if args.window_title {
        parse_window_title(&args.title, &config.branding.service).context("Window title is empty")?
    } else {
        TrackState {
            title: args.title,
            artist: args.artist,
            album: args.album,
            is_playing: true,
            ..Default::default()
        }
    };
    track.is_playing = track.is_playing && !args.paused;
    track.duration_seconds = track.duration_seconds.max(args.duration);
    track.position_seconds = args.position;
    track.album_art_url = args.art_url.or(track.album_art_url);
    track.hi_res_quality = args.quality.or(track.hi_res_quality);

    if config.artwork.enabled {
        track = ArtworkLookup::new()?.enrich(track).await;
    }

    let controller = controller(config)?;
    controller.set_credential(credential);

    let mut status = controller.subscribe_status();
    controller.update_track_state(track);
    let outcome = *status
        .wait_for(ConnectionStatus::is_terminal)
        .await
        .context("Sync controller stopped before the update finished")?;
    controller.shutdown();

    match outcome {
        ConnectionStatus::Success => {
            println!("Status updated");
            Ok(())
        }
        other => anyhow::bail!("Status update failed ({})", other),
    }
}

async fn watch(config: &Config, args: WatchArgs) -> Result<()> {
    let command = args
        .command
        .or_else(|| config.source.command.clone())
        .context("No track source: pass --command or set [source] command in the config")?;

    let mut source = CommandSource::new(command, config.branding.service.clone());
    if config.artwork.enabled {
        source = source.with_artwork(ArtworkLookup::new()?);
    }

    let controller = controller(config)?;
    authorize(config, &controller, &args.auth, args.login)?;
    let status_log = log_status(&controller);

    let watcher = TrackWatcher::new(Arc::new(source), controller.clone(), config.poll_interval()).spawn();

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    tracing::info!("Shutting down");

    watcher.abort();
    controller.shutdown();
    status_log.abort();

    Ok(())
}

async fn serve(config: &Config, args: ServeArgs) -> Result<()> {
    let controller = controller(config)?;
    authorize(config, &controller, &args.auth, args.login)?;
    let status_log = log_status(&controller);

    let mut state = PushState::new(controller.clone(), config.branding.service.clone());
    if config.artwork.enabled {
        state = state.with_artwork(ArtworkLookup::new()?);
    }

    let mut server = PushServer::new(args.bind.unwrap_or(config.push.bind), config.idle_timeout());
    server.start(state).await?;

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    tracing::info!("Shutting down");

    server.stop();
    controller.shutdown();
    status_log.abort();

    Ok(())
}

/// Hand the session token to the controller, or start the login for it
fn authorize(config: &Config, controller: &SyncController, args: &TokenArgs, login: bool) -> Result<()> {
    if let Some(credential) = resolve_token(args) {
        controller.set_credential(credential);
    } else if login {
        let bootstrap = bootstrap(config)?;
        println!("Open this URL to log in:\n\n  {}\n", bootstrap.authorize_url());

        // Keep tracking while the user logs in; updates are skipped until then
        let controller = controller.clone();
        tokio::spawn(async move {
            if let Some(credential) = bootstrap.login().await {
                controller.set_credential(credential);
            }
        });
    }

    if !controller.has_credential() && !login {
        tracing::warn!(
            "No access token ({} / --token / --login); tracks are followed but not sent",
            TOKEN_ENV
        );
    }
    Ok(())
}

fn log_status(controller: &SyncController) -> tokio::task::JoinHandle<()> {
    let mut status = controller.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            tracing::debug!("Connection status: {}", current);
        }
    })
}
