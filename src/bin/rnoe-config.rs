#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Flag-driven account configuration for the read-no-evil-mcp gateway
//!
//! Never prompts, so agents and scripts can drive it.

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use rnoe_client::probe::{self, Readiness};
use rnoe_client::{Account, AccountRequest, ConfigStore, ServerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rnoe-config", version)]
#[command(
    about = "Manage read-no-evil-mcp account configuration (flag-driven, no prompts)"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the config skeleton
    Create {
        /// Global protection threshold
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Add an account
    Add {
        /// Email address, also the IMAP username
        #[arg(long)]
        email: String,

        /// Account ID (derived from the email if omitted)
        #[arg(long)]
        id: Option<String>,

        /// IMAP host
        #[arg(long)]
        host: String,

        /// IMAP port
        #[arg(long, default_value_t = 993)]
        port: u16,

        /// Disable IMAP SSL
        #[arg(long)]
        no_ssl: bool,

        /// SMTP host (required for --send)
        #[arg(long)]
        smtp_host: Option<String>,

        /// SMTP port [default: 587]
        #[arg(long)]
        smtp_port: Option<u16>,

        /// Enable SMTP SSL
        #[arg(long)]
        smtp_ssl: bool,

        /// Sender address for outgoing mail
        #[arg(long)]
        from_address: Option<String>,

        /// Sender display name for outgoing mail
        #[arg(long)]
        from_name: Option<String>,

        /// Allow sending emails
        #[arg(long)]
        send: bool,

        /// Allow deleting emails
        #[arg(long)]
        delete: bool,

        /// Allow moving emails
        #[arg(long = "move")]
        move_: bool,

        /// Per-account protection threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Append a password placeholder to the .env file
        #[arg(long)]
        create_env: bool,
    },

    /// Remove an account
    Remove {
        /// Account ID to remove
        account_id: String,
    },

    /// List configured accounts
    List,

    /// Print the config file
    Show,

    /// Wait for the gateway to answer
    Probe {
        /// Gateway URL [env: RNOE_SERVER_URL]
        #[arg(long)]
        server: Option<String>,

        /// Maximum number of probes
        #[arg(long, default_value_t = probe::DEFAULT_ATTEMPTS)]
        attempts: u32,

        /// Seconds between probes
        #[arg(long, default_value_t = probe::DEFAULT_INTERVAL.as_secs())]
        interval: u64,

        /// Per-probe timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
            e.print().ok();
            return code;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn open_store(config: Option<PathBuf>) -> anyhow::Result<ConfigStore> {
    let path = match config {
        Some(path) => path,
        None => ConfigStore::default_path()?,
    };
    Ok(ConfigStore::new(path))
}

async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Probe {
            server,
            attempts,
            interval,
            timeout,
        } => cmd_probe(server.as_deref(), attempts, interval, timeout).await,
        Command::Create { threshold, force } => {
            cmd_create(&open_store(args.config)?, threshold, force)
        }
        Command::Add {
            email,
            id,
            host,
            port,
            no_ssl,
            smtp_host,
            smtp_port,
            smtp_ssl,
            from_address,
            from_name,
            send,
            delete,
            move_,
            threshold,
            create_env,
        } => {
            let request = AccountRequest {
                id,
                email,
                host,
                port: Some(port),
                no_ssl,
                smtp_host,
                smtp_port,
                smtp_ssl,
                from_address,
                from_name,
                send,
                delete,
                move_,
                threshold,
            };
            cmd_add(&open_store(args.config)?, request, create_env)
        }
        Command::Remove { account_id } => cmd_remove(&open_store(args.config)?, &account_id),
        Command::List => cmd_list(&open_store(args.config)?),
        Command::Show => cmd_show(&open_store(args.config)?),
    }
}

fn cmd_create(store: &ConfigStore, threshold: f64, force: bool) -> anyhow::Result<()> {
    store.create(Some(threshold), force)?;
    println!("Config created: {}", store.path().display());
    Ok(())
}

fn cmd_add(store: &ConfigStore, request: AccountRequest, create_env: bool) -> anyhow::Result<()> {
    let added = store.add(request, create_env)?;

    println!(
        "Account '{}' added to: {}",
        added.account.id,
        store.path().display()
    );
    println!("Set password env var: {}", added.env_var);
    if let Some(secrets) = &added.secrets_file {
        println!("Password placeholder in: {}", secrets.display());
    }
    Ok(())
}

fn cmd_remove(store: &ConfigStore, id: &str) -> anyhow::Result<()> {
    let removed = store.remove(id)?;
    println!("Account '{}' removed from config.", removed.id);
    Ok(())
}

fn cmd_list(store: &ConfigStore) -> anyhow::Result<()> {
    let accounts = store.list()?;
    if accounts.is_empty() {
        println!("No accounts configured.");
        return Ok(());
    }

    println!("Accounts in {}:", store.path().display());
    for account in &accounts {
        print_account_row(account);
    }
    Ok(())
}

fn print_account_row(account: &Account) {
    println!(
        "  {:<12} {:<30} {:<25} {}",
        account.id,
        account.username,
        account.host,
        account.permissions.summary()
    );
}

fn cmd_show(store: &ConfigStore) -> anyhow::Result<()> {
    print!("{}", store.read_raw()?);
    Ok(())
}

async fn cmd_probe(
    server: Option<&str>,
    attempts: u32,
    interval: u64,
    timeout: u64,
) -> anyhow::Result<()> {
    let config = ServerConfig::resolve(server, Duration::from_secs(timeout.max(1)))?;

    match probe::wait_until_ready(&config, attempts, Duration::from_secs(interval)).await? {
        Readiness::Ready { attempt } => {
            println!("Server ready at {} (attempt {attempt})", config.endpoint());
        }
        Readiness::TimedOut { attempts } => {
            eprintln!(
                "Warning: server at {} not ready after {attempts} attempt(s); continuing anyway",
                config.endpoint()
            );
        }
    }
    Ok(())
}
