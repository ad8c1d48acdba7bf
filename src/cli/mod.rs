//! Command-line interface parsing and dispatch.

pub mod ask;
pub mod history;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::config::{Config, Settings};

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    let describe = option_env!("VERGEN_GIT_DESCRIBE").unwrap_or("unknown");
    let built = option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown");
    let rustc = option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown");
    format!(
        "{}\ngit: {describe}\nbuilt: {built}\nrustc: {rustc}",
        env!("CARGO_PKG_VERSION")
    )
});

#[derive(Parser)]
#[command(name = "agentdeck")]
#[command(version, long_version = LONG_VERSION.as_str())]
#[command(about = "Streams agent replies, tool calls included, into the terminal")]
#[command(
    long_about = "agentdeck sends a prompt to an agent endpoint and renders the streamed reply \
as it arrives: text, tool calls and their outcome. When the agent reports a session, \
the final transcript is refreshed from the session store.\n\n\
Environment Variables:\n\
  AGENTDECK_BASE_URL   Agent API base URL (overrides the config file)\n\
  RUST_LOG             Log filter (overrides --verbose and log_filter)\n\n\
Press Ctrl+C while a reply is streaming to stop it."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Agent API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a prompt and stream the reply
    Ask {
        /// Prompt text
        #[arg(required = true)]
        prompt: Vec<String>,

        /// Continue an existing session
        #[arg(short = 's', long)]
        session: Option<String>,

        /// Enable a tool for this request (repeatable)
        #[arg(short = 't', long = "tool", value_name = "NAME")]
        tools: Vec<String>,

        /// Mark tools still running at the end of the stream as failed
        #[arg(long)]
        strict_tools: bool,

        /// Append the exchange to a transcript file
        #[arg(short = 'l', long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
    /// Print the stored history of a session
    History {
        /// Session id
        session: String,

        /// Write the history to a transcript file as well
        #[arg(short = 'l', long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
    /// Inspect or change the configuration file
    Config {
        #[command(subcommand)]
        action: settings::ConfigAction,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config_path = Config::get_config_path()?;
    let config = Config::load_from_path(&config_path)?;

    init_tracing(args.verbose, config.log_filter.as_deref());

    let mut resolved = config.resolve_from_env();
    if let Some(base_url) = args.base_url {
        resolved.base_url = base_url;
    }

    match args.command {
        Commands::Ask {
            prompt,
            session,
            tools,
            strict_tools,
            log,
        } => {
            let options = ask::AskOptions {
                prompt: prompt.join(" "),
                session,
                tools,
                strict_tools,
                log,
            };
            ask::run_ask(&resolved, options).await
        }
        Commands::History { session, log } => {
            history::run_history(&resolved, &session, log).await
        }
        Commands::Config { action } => settings::run_config(action, &config_path, config),
    }
}

fn default_filter(verbose: u8, configured: Option<&str>) -> String {
    match verbose {
        0 => configured.unwrap_or("warn").to_string(),
        1 => "agentdeck=debug,warn".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(verbose: u8, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, configured)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn build_client(settings: &Settings) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = settings.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder.build()
}
