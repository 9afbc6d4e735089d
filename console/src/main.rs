//! dockrune console - Entry Point
//!
//! Operator console for the dockrune deployment tracker: sign in, inspect
//! deployments, issue commands and follow the live app board.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use dockrune_console::app::options::ConsoleOptions;
use dockrune_console::app::run::run;
use dockrune_console::app::state::ConsoleState;
use dockrune_console::live::board::LiveEvent;
use dockrune_console::live::dashboard::CommandAck;
use dockrune_console::logs::{init_logging, LogLevel, LogOptions};
use dockrune_console::render;
use dockrune_console::router::guard::{deployment_detail, DEPLOYMENTS, HOME, LOGIN};
use dockrune_console::storage::layout::StorageLayout;
use dockrune_console::storage::settings::Settings;
use dockrune_console::utils::version_info;

/// dockrune operator console
#[derive(Parser, Debug)]
#[command(name = "dockrune-console", version, about = "Operator console for dockrune")]
struct Cli {
    /// Storage directory for settings and the saved session
    #[arg(long, global = true, env = "DOCKRUNE_HOME")]
    home: Option<PathBuf>,

    /// Admin API base URL, overrides the settings file
    #[arg(long, global = true, env = "DOCKRUNE_API_BASE")]
    api_base: Option<String>,

    /// Log verbosely to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and save the session
    Login(LoginArgs),
    /// Forget the saved session
    Logout,
    /// Show the signed-in operator
    Whoami,
    /// Deployment overview: stats, active, recent, timeline, environments
    Status,
    /// Show one deployment
    Show(IdArgs),
    /// Print the log of one deployment
    Logs(IdArgs),
    /// Redeploy a deployment
    Redeploy(IdArgs),
    /// Stop a deployment
    Stop(IdArgs),
    /// Follow the live app board until interrupted
    Watch,
    /// App commands
    #[command(subcommand)]
    Apps(AppsCommands),
    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Operator username
    username: String,

    /// Password; read from stdin when omitted
    #[arg(long, env = "DOCKRUNE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct IdArgs {
    /// Deployment ID
    id: String,
}

#[derive(Subcommand, Debug)]
enum AppsCommands {
    /// Deploy an app
    Deploy { name: String },
    /// Stop an app
    Stop { name: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        println!("{}", serde_json::to_string_pretty(&version_info())?);
        return Ok(());
    }

    let layout = match &cli.home {
        Some(home) => StorageLayout::new(home),
        None => StorageLayout::default(),
    };

    let settings = layout
        .settings_file()
        .read_json_opt::<Settings>()
        .await
        .context("Unable to read settings file")?
        .unwrap_or_default();

    let mut log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.json_logs,
        ..Default::default()
    };
    if cli.verbose {
        log_options.log_level = LogLevel::Debug;
    }
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let mut options = ConsoleOptions::from_settings(layout, &settings);
    if let Some(api_base) = cli.api_base {
        options = options.with_api_base_url(api_base);
    }

    let state = Arc::new(ConsoleState::init(&options)?);
    if state.session.restore().await? {
        info!("Restored session for {:?}", state.session.username());
    }

    match cli.command {
        Commands::Login(args) => login(&state, args).await,
        Commands::Logout => {
            state.session.logout().await?;
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami => {
            match state.session.username() {
                Some(username) if state.session.is_authenticated() => println!("{}", username),
                _ => println!("Not logged in"),
            }
            Ok(())
        }
        Commands::Status => status(&state).await,
        Commands::Show(args) => show(&state, &args.id).await,
        Commands::Logs(args) => {
            enter(&state, &deployment_detail(&args.id))?;
            print!("{}", state.deployments.fetch_logs(&args.id).await?);
            Ok(())
        }
        Commands::Redeploy(args) => {
            enter(&state, &deployment_detail(&args.id))?;
            let resp = state.deployments.redeploy(&args.id).await?;
            println!("{} (new deployment {})", resp.message, resp.id);
            Ok(())
        }
        Commands::Stop(args) => {
            enter(&state, &deployment_detail(&args.id))?;
            let resp = state.deployments.stop(&args.id).await?;
            println!("{}", resp.message.unwrap_or_else(|| "Stop requested".to_string()));
            Ok(())
        }
        Commands::Watch => watch(options, state).await,
        Commands::Apps(command) => apps(&state, command).await,
        Commands::Version => Ok(()),
    }
}

/// Navigate through the router; guarded routes need a session
fn enter(state: &ConsoleState, path: &str) -> anyhow::Result<()> {
    let route = state.router.navigate(path);
    if route == LOGIN && path != LOGIN {
        bail!("Not logged in, run `dockrune-console login <username>` first");
    }
    Ok(())
}

async fn login(state: &ConsoleState, args: LoginArgs) -> anyhow::Result<()> {
    enter(state, LOGIN)?;

    let password = match args.password {
        Some(password) => password,
        None => read_password()?,
    };

    if let Err(e) = state
        .session
        .login(&args.username, SecretString::from(password))
        .await
    {
        let message = state.session.error().unwrap_or_else(|| e.to_string());
        bail!(message);
    }

    println!("Logged in as {} ({})", args.username, state.router.current());
    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn status(state: &ConsoleState) -> anyhow::Result<()> {
    enter(state, DEPLOYMENTS)?;
    state.deployments.fetch_all().await?;

    let deployments = &state.deployments;
    println!("{}\n", render::format_stats(&deployments.stats()));

    let active = deployments.active();
    if !active.is_empty() {
        println!("Active");
        println!("{}\n", render::format_deployments_table(&active));
    }

    println!("Recent");
    println!("{}\n", render::format_deployments_table(&deployments.recent()));

    println!("Last 7 days (successful/failed)");
    println!("{}\n", render::format_timeline(&deployments.timeline()));

    println!("Environments");
    println!("{}", render::format_environments(&deployments.by_environment()));
    Ok(())
}

async fn show(state: &ConsoleState, id: &str) -> anyhow::Result<()> {
    enter(state, &deployment_detail(id))?;
    let record = state.deployments.open(id).await?;
    println!("{}", render::format_deployment_detail(&record));
    Ok(())
}

async fn apps(state: &ConsoleState, command: AppsCommands) -> anyhow::Result<()> {
    enter(state, HOME)?;

    let (action, name, ack) = match command {
        AppsCommands::Deploy { name } => {
            let ack = state.live.deploy(&name).await?;
            ("Deploy", name, ack)
        }
        AppsCommands::Stop { name } => {
            let ack = state.live.stop(&name).await?;
            ("Stop", name, ack)
        }
    };

    match ack {
        CommandAck::Accepted => {
            println!("{} of {} requested", action, name);
            Ok(())
        }
        CommandAck::Rejected(reason) => bail!("{} of {} was rejected: {}", action, name, reason),
    }
}

async fn watch(options: ConsoleOptions, state: Arc<ConsoleState>) -> anyhow::Result<()> {
    enter(&state, HOME)?;

    let mut events = state.live.subscribe();
    let live = state.live.clone();
    let printer = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} live events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            println!("{}", render::format_event(&event));
            if let LiveEvent::Snapshot { .. } = event {
                println!("{}", render::format_apps_table(&live.apps()));
                println!("{}", render::format_counts(&live.counts()));
            }
        }
    });

    let result = run(&options, state, await_shutdown_signal()).await;
    printer.abort();
    result.context("Watch mode failed")
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
