//! # CLI Layer
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr, prompts)
//! - Installs the log subscriber
//! - Decides where configuration and the session file live
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Builds `AppContext` with the HTTP gateway and the API facade
//! - `handle_*()`: Per-command handlers that call the API and print the result

use super::render::{print_messages, print_notes};
use super::setup::{Cli, Commands};
use clap::Parser;
use console::Term;
use directories::ProjectDirs;
use memopad::api::{CmdMessage, CmdResult, MemoApi, Outcome, Rejection};
use memopad::config::MemoConfig;
use memopad::editor::edit_text;
use memopad::error::{MemoError, Result};
use memopad::gateway::http::HttpGateway;
use std::io::{BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SESSION_FILE: &str = "session.json";

/// Where configuration and the persisted session live.
struct AppDirs {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppDirs {
    /// `MEMOPAD_HOME` puts everything in one directory; otherwise the platform defaults apply.
    fn resolve() -> Result<Self> {
        if let Some(home) = std::env::var_os("MEMOPAD_HOME").filter(|h| !h.is_empty()) {
            let home = PathBuf::from(home);
            return Ok(Self {
                config_dir: home.clone(),
                data_dir: home,
            });
        }

        let dirs = ProjectDirs::from("com", "memopad", "memopad").ok_or_else(|| {
            MemoError::Config("Could not determine a home directory".to_string())
        })?;
        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }
}

struct AppContext {
    api: MemoApi<HttpGateway>,
    config: MemoConfig,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dirs = AppDirs::resolve()?;

    // Config must work before a backend is configured
    let command = match cli.command {
        Some(Commands::Config { key, value }) => return handle_config(&dirs, key, value),
        other => other,
    };

    let mut ctx = init_context(&dirs).await?;

    match command {
        Some(Commands::List) | None => handle_list(&ctx),
        Some(Commands::Add { text }) => handle_add(&mut ctx, text).await,
        Some(Commands::Edit { note, text }) => handle_edit(&mut ctx, &note, text).await,
        Some(Commands::Delete { note, yes }) => handle_delete(&mut ctx, &note, yes).await,
        Some(Commands::Login { email, password }) => {
            let password = password_or_prompt(password)?;
            let result = ctx.api.login(&email, &password).await?;
            print_messages(&result.messages);
            Ok(())
        }
        Some(Commands::Signup { email, password }) => {
            let password = password_or_prompt(password)?;
            let result = ctx.api.signup(&email, &password).await?;
            print_messages(&result.messages);
            Ok(())
        }
        Some(Commands::Logout) => {
            let result = ctx.api.logout().await?;
            print_messages(&result.messages);
            Ok(())
        }
        Some(Commands::Status) => handle_status(&ctx),
        // handled before the context exists
        Some(Commands::Config { .. }) => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn init_context(dirs: &AppDirs) -> Result<AppContext> {
    let config = MemoConfig::load(&dirs.config_dir)?.with_env_overrides();
    let endpoint = config.endpoint()?;

    std::fs::create_dir_all(&dirs.data_dir)?;
    let gateway = HttpGateway::new(endpoint).with_session_file(dirs.data_dir.join(SESSION_FILE))?;

    let mut api = MemoApi::start(Arc::new(gateway), config.table.clone()).await;
    api.sync_session().await?;

    Ok(AppContext { api, config })
}

fn require_session(ctx: &AppContext) -> Result<()> {
    if ctx.api.has_session() {
        Ok(())
    } else {
        Err(MemoError::Api(
            "Not logged in. Run `memopad login --email <EMAIL>` first.".to_string(),
        ))
    }
}

fn handle_list(ctx: &AppContext) -> Result<()> {
    if !ctx.api.has_session() {
        print_messages(&[CmdMessage::info(
            "Not logged in. Run `memopad login --email <EMAIL>` to see your notes.",
        )]);
        return Ok(());
    }
    print_notes(ctx.api.notes());
    Ok(())
}

async fn handle_add(ctx: &mut AppContext, text: Vec<String>) -> Result<()> {
    require_session(ctx)?;

    let mut content = text.join(" ");
    if content.trim().is_empty() && !std::io::stdin().is_terminal() {
        std::io::stdin().read_to_string(&mut content)?;
    }

    ctx.api.set_draft(content);
    let result = ctx.api.submit().await?;
    report(&result);
    Ok(())
}

async fn handle_edit(ctx: &mut AppContext, selector: &str, text: Vec<String>) -> Result<()> {
    require_session(ctx)?;
    let id = ctx.api.resolve_note(selector)?;
    ctx.api.begin_edit(&id);

    let content = if text.is_empty() {
        let edited = edit_text(ctx.api.draft())?;
        if edited.trim().is_empty() {
            ctx.api.cancel_edit();
            print_messages(&[CmdMessage::info("Empty note, nothing changed")]);
            return Ok(());
        }
        edited
    } else {
        text.join(" ")
    };

    ctx.api.set_draft(content);
    let result = ctx.api.submit().await?;
    report(&result);
    Ok(())
}

async fn handle_delete(ctx: &mut AppContext, selector: &str, yes: bool) -> Result<()> {
    require_session(ctx)?;
    let id = ctx.api.resolve_note(selector)?;
    let preview = ctx
        .api
        .notes()
        .iter()
        .find(|n| n.id == id)
        .map(|n| n.content.lines().next().unwrap_or("").to_string())
        .unwrap_or_default();

    ctx.api.request_delete(id);

    let confirmed = yes || confirm(&format!("Delete note {} \"{}\"?", selector, preview))?;
    let result = if confirmed {
        ctx.api.confirm_delete().await?
    } else {
        ctx.api.cancel_delete()
    };
    report(&result);
    Ok(())
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    let mut messages = Vec::new();
    match ctx.api.session() {
        Some(session) => {
            let who = session.email.unwrap_or(session.user_id);
            messages.push(CmdMessage::success(format!("Logged in as {}", who)));
            messages.push(CmdMessage::info(format!(
                "{} note(s) in table `{}`",
                ctx.api.notes().len(),
                ctx.config.table
            )));
        }
        None => messages.push(CmdMessage::info("Not logged in")),
    }
    messages.push(CmdMessage::info(format!(
        "Backend: {}",
        ctx.config.url.as_deref().unwrap_or("")
    )));
    print_messages(&messages);
    Ok(())
}

fn handle_config(dirs: &AppDirs, key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = MemoConfig::load(&dirs.config_dir)?;

    match (key, value) {
        (None, _) => {
            for key in MemoConfig::KEYS {
                println!("{} = {}", key, config.get(key)?);
            }
        }
        (Some(key), None) => println!("{}", config.get(&key)?),
        (Some(key), Some(value)) => {
            config.set(&key, &value)?;
            config.save(&dirs.config_dir)?;
            print_messages(&[CmdMessage::success(format!("Set {} = {}", key, config.get(&key)?))]);
        }
    }
    Ok(())
}

/// Prints the result, explaining operations that were skipped.
fn report(result: &CmdResult) {
    print_messages(&result.messages);
    if let Outcome::Skipped(reason) = result.outcome {
        let text = match reason {
            Rejection::NoSession => "Not logged in, nothing saved",
            Rejection::EmptyContent => "Note is empty, nothing saved",
            Rejection::MissingId => "No note selected",
        };
        print_messages(&[CmdMessage::warning(text)]);
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Prompts without echo on a terminal; piped input is read as a plain line.
fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    if std::io::stdin().is_terminal() {
        let term = Term::stderr();
        term.write_str("Password: ")?;
        let password = term.read_secure_line()?;
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
