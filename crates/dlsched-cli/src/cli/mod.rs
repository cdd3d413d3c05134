//! CLI for the dlsched download task scheduler.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use dlsched_core::config;
use dlsched_core::network::Bearer;
use dlsched_core::task::AllowedNetwork;

use commands::{run_completions, run_config, run_fetch, run_manpage};

/// Top-level CLI for the dlsched download task scheduler.
#[derive(Debug, Parser)]
#[command(name = "dlsched")]
#[command(about = "dlsched: background download task scheduler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue URLs on an in-process scheduler and wait until every task settles.
    Fetch(FetchArgs),

    /// Show the config file path and the effective settings.
    Config,

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the roff man page to stdout.
    Manpage,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Direct HTTP/HTTPS URLs to download.
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Directory for downloaded files (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Worker threads (default: thread_count from config).
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Owner uid recorded on every task.
    #[arg(long, default_value_t = 0)]
    pub uid: u32,

    /// Owner bundle name recorded on every task.
    #[arg(long, default_value = "dlsched")]
    pub bundle: String,

    /// Bearers the tasks may use.
    #[arg(long, value_enum, default_value_t = NetworkArg::Unrestricted)]
    pub network: NetworkArg,

    /// Allow transfers over metered networks.
    #[arg(long)]
    pub metered: bool,

    /// Allow transfers while roaming.
    #[arg(long)]
    pub roaming: bool,

    /// Report this bearer as the active network before queueing.
    #[arg(long, value_enum)]
    pub bearer: Option<BearerArg>,

    /// Print the final task list as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkArg {
    Unrestricted,
    Wifi,
    Cellular,
    /// Wi-Fi or cellular.
    AnyRadio,
}

impl From<NetworkArg> for AllowedNetwork {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Unrestricted => AllowedNetwork::Unrestricted,
            NetworkArg::Wifi => AllowedNetwork::Wifi,
            NetworkArg::Cellular => AllowedNetwork::Cellular,
            NetworkArg::AnyRadio => AllowedNetwork::WifiOrCellular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BearerArg {
    Wifi,
    Cellular,
}

impl From<BearerArg> for Bearer {
    fn from(arg: BearerArg) -> Self {
        match arg {
            BearerArg::Wifi => Bearer::Wifi,
            BearerArg::Cellular => Bearer::Cellular,
        }
    }
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(&cfg, &args)?;
            }
            CliCommand::Config => {
                let cfg = config::load_or_init()?;
                run_config(&cfg)?;
            }
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Manpage => run_manpage()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
