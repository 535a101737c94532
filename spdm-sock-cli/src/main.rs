//! CLI for the SPDM socket responder harness.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod request;
mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use spdm_sock::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "spdm-sock",
    version,
    about = "Framed TCP transport for SPDM responder engines"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace with frame dumps).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format.
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the platform responder.
    Serve(serve::ServeArgs),

    /// Send TEST and print the acknowledgement.
    Test(request::ConnArgs),

    /// Ask a responder to end the session.
    Shutdown(request::ConnArgs),

    /// Walk the responder's PCI-DoE discovery table.
    Discover(request::ConnArgs),

    /// Send a NORMAL payload (hex) and print the response (hex).
    Send(request::SendArgs),

    /// Print the effective configuration.
    Config {
        /// JSON config file to start from.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Output format for `config`.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);
    if let Err(e) = cli.command.dispatch() {
        eprintln!("spdm-sock: {e:#}");
        std::process::exit(1);
    }
}

impl Command {
    fn dispatch(self) -> Result<()> {
        match self {
            Self::Serve(args) => args.run(),
            Self::Test(args) => request::test(&args),
            Self::Shutdown(args) => request::shutdown(&args),
            Self::Discover(args) => request::discover(&args),
            Self::Send(args) => request::send(&args),
            Self::Config { config, format } => show_config(config.as_deref(), format),
            Self::Completion { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Cli::command(),
                    "spdm-sock",
                    &mut std::io::stdout(),
                );
                Ok(())
            }
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` picks the level for our crates.
fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!(
            "spdm_sock={level},spdm_sock_proto={level},spdm_sock_cli={level}"
        ))
    };

    let registry = tracing_subscriber::registry().with(filter);
    let _ = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
}

/// Loads `path` if given, otherwise the defaults.
pub(crate) fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(Config::default()),
    }
}

fn show_config(path: Option<&std::path::Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(path)?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("port:          {}", config.port);
    println!("bind address:  {}", config.bind_addr);
    println!("peer address:  {}", config.peer_addr);
    println!("transport:     {} ({:#04x})", config.transport, config.transport.code());
    println!("tcp handshake: {}", config.tcp_handshake);
    println!("max payload:   {} bytes", config.max_payload);
    Ok(())
}
