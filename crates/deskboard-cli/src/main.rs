//! deskboard - terminal client for the deskboard dashboard API.
//!
//! Each invocation restores the session from the stored refresh token, so
//! the access token only ever lives for the duration of one command.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deskboard_core::auth::{GuardDecision, LoginRequest, Navigator};
use deskboard_core::utils::{format_duration, truncate_string};
use deskboard_core::{Config, Deskboard, SessionState};

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "deskboard.log";

/// Width of the notification message column
const MESSAGE_WIDTH: usize = 60;

#[derive(Parser)]
#[command(name = "deskboard", version, about = "Sign in to deskboard and call its API")]
struct Cli {
    /// API base URL (overrides config and DESKBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the current session
    Status,
    /// GET an API path and print the JSON response
    Get { path: String },
    /// Show the signed-in user's profile
    Profile,
    /// List notifications
    Notifications {
        /// Mark everything as read afterwards
        #[arg(long)]
        mark_all_read: bool,
    },
}

/// Navigator for a terminal: there is no login screen to show, so tell the
/// user which command gets them there.
struct TerminalNavigator {
    login_route: String,
}

impl Navigator for TerminalNavigator {
    fn redirect(&self, path: &str) {
        debug!(path, "Redirect requested");
        if path == self.login_route {
            eprintln!("Not signed in. Run `deskboard login` to continue.");
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: {:#}. Using default configuration.", e);
            Config::default()
        }
    };
    if let Some(url) = cli.api_url.clone().or_else(|| std::env::var("DESKBOARD_API_URL").ok()) {
        config.api_base_url = url;
    }

    let log_dir = config.cache_dir().ok().filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _log_guard = init_tracing(log_dir.as_deref());
    info!(api = %config.api_base_url, "deskboard starting");

    match run(cli.command, &mut config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &mut Config) -> Result<ExitCode> {
    let navigator = Arc::new(TerminalNavigator {
        login_route: config.auth_config().login_route,
    });
    let app = Deskboard::new(config, navigator)?;

    match command {
        Command::Login { email } => login(&app, config, email).await,
        Command::Logout => {
            app.session().logout();
            println!("Signed out.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => status(&app).await,
        Command::Get { path } => {
            if !signed_in(&app, &path).await {
                return Ok(ExitCode::FAILURE);
            }
            let value: Value = app.api().get(&path).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Profile => {
            if !signed_in(&app, "/profile").await {
                return Ok(ExitCode::FAILURE);
            }
            let profile = app.profile().profile();
            println!("{} {}", profile.initial(), profile.name);
            println!("  {}", profile.email);
            if profile.avatar_url().is_some() {
                println!("  (avatar set)");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Notifications { mark_all_read } => {
            if !signed_in(&app, "/notifications").await {
                return Ok(ExitCode::FAILURE);
            }
            notifications(&app, mark_all_read).await
        }
    }
}

/// Run the route guard; the navigator has already told the user what to do
/// when this returns false.
async fn signed_in(app: &Deskboard, target: &str) -> bool {
    matches!(app.navigate(target).await, GuardDecision::Allow)
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn login(app: &Deskboard, config: &mut Config, email: Option<String>) -> Result<ExitCode> {
    let email = match email
        .or_else(|| std::env::var("DESKBOARD_EMAIL").ok())
        .or_else(|| config.last_email.clone())
    {
        Some(email) if !email.is_empty() => email,
        _ => prompt("Email: ")?,
    };
    let password = match std::env::var("DESKBOARD_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password(format!("Password for {}: ", email))
            .context("Failed to read password")?,
    };

    if let Err(e) = app.session().login(&LoginRequest::new(email.as_str(), password)).await {
        eprintln!("{}", e.user_message());
        return Ok(ExitCode::FAILURE);
    }

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        eprintln!("Warning: could not save config: {:#}", e);
    }

    let profile = app.profile().profile();
    if profile.name.is_empty() {
        println!("Signed in.");
    } else {
        println!("Signed in as {}.", profile.name);
    }
    Ok(ExitCode::SUCCESS)
}

async fn status(app: &Deskboard) -> Result<ExitCode> {
    // A fresh process only holds a refresh token; renew to report accurately.
    if app.session().session_state() == SessionState::Renewable {
        if let Err(e) = app.session().try_restore_session().await {
            println!("Session: expired ({})", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    }

    match app.session().access_token() {
        Some(token) => {
            println!("Session: signed in");
            if let Some(subject) = token.subject() {
                println!("  subject:    {}", subject);
            }
            if let Some(remaining) = app.session().seconds_until_expiry() {
                println!("  expires in: {}", format_duration(remaining));
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Session: signed out");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn notifications(app: &Deskboard, mark_all_read: bool) -> Result<ExitCode> {
    let service = app.notifications();
    let list = service.notifications();
    if list.is_empty() {
        println!("No notifications.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} unread of {}", service.unread_count(), list.len());
    for n in &list {
        let marker = if n.read { " " } else { "*" };
        println!(
            "{} {:<8} {}  {}  {}",
            marker,
            n.kind,
            n.created_at.format("%Y-%m-%d %H:%M"),
            n.title,
            truncate_string(&n.message, MESSAGE_WIDTH)
        );
    }

    if mark_all_read {
        service.mark_all_as_read().await?;
        println!("Marked all as read.");
    }
    Ok(ExitCode::SUCCESS)
}
