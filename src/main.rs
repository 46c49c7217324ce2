mod access;
mod activity;
mod admin;
mod cli;
mod comments;
mod config;
mod detail;
mod gallery;
mod notice;
mod routes;
mod session;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::session::{
    DemoIdentityProvider, FileStore, KeyValueStore, MemoryStore, RestoreOutcome,
    SessionController,
};

#[derive(Parser)]
#[command(name = "picsword", about = "Image gallery client with demo sign-in and admin dashboard")]
pub struct Args {
    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "PICSWORD_STATE_DIR", help = "Directory for the session and activity log")]
    pub state_dir: Option<PathBuf>,

    #[arg(long, env = "PICSWORD_ADMIN_EMAIL", help = "Email address granted the admin role")]
    pub admin_email: Option<String>,

    #[arg(long, env = "PICSWORD_BASE_URL", help = "Base URL used for share links")]
    pub base_url: Option<String>,

    #[arg(long, help = "Keep the session in memory and skip the activity log")]
    pub ephemeral: bool,

    #[arg(long, help = "Debug output")]
    pub debug: bool,

    #[arg(short = 'c', long = "command", value_name = "COMMAND", action = clap::ArgAction::Append, help = "Run a command and exit (repeatable)")]
    pub commands: Vec<String>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI and environment override the files
    if let Some(email) = &args.admin_email {
        cfg.admin_email = Some(email.clone());
    }
    if let Some(url) = &args.base_url {
        cfg.base_url = Some(url.clone());
    }
    if let Some(dir) = &args.state_dir {
        cfg.state_dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} error(s))",
            errors.len()
        ));
    }

    let state_dir = cfg.state_dir();
    if args.debug {
        eprintln!("[DEBUG] State dir: {}", state_dir.display());
        eprintln!("[DEBUG] Admin email: {}", cfg.admin_email());
        eprintln!("[DEBUG] Base URL: {}", cfg.base_url());
        eprintln!("[DEBUG] Ephemeral: {}", args.ephemeral);
    }

    let store: Box<dyn KeyValueStore> = if args.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::new(&state_dir.join("storage")))
    };
    let provider = Box::new(DemoIdentityProvider::new(cfg.demo_user.to_user()));
    let mut session = SessionController::new(store, provider, cfg.admin_email());

    let client_id = uuid::Uuid::new_v4().to_string();
    let mut activity = if args.ephemeral {
        activity::ActivityLog::disabled(&client_id)
    } else {
        match activity::ActivityLog::new(&state_dir.join("activity.jsonl"), &client_id) {
            Ok(log) => log,
            Err(e) => {
                eprintln!("Warning: activity log disabled: {}", e);
                activity::ActivityLog::disabled(&client_id)
            }
        }
    };

    let outcome = session.restore();
    let email = session.user().map(|u| u.email.clone());
    match &outcome {
        RestoreOutcome::Anonymous => activity.session_restore("anonymous", None),
        RestoreOutcome::Restored => activity.session_restore("restored", email.as_deref()),
        RestoreOutcome::Recovered(reason) => {
            eprintln!("Warning: could not restore session: {}", reason);
            activity.session_restore("recovered", None);
        }
    }
    if args.debug {
        eprintln!("[DEBUG] Session: {:?}", email);
    }

    let commands = args.commands.clone();
    let ctx = cli::Context::new(cfg, session, activity, client_id, args.debug);

    if commands.is_empty() {
        let history = (!args.ephemeral).then(|| state_dir.join("history.txt"));
        cli::run_repl(ctx, history)
    } else {
        cli::run_once(&ctx, &commands)
    }
}
