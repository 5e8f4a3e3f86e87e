mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use output::{OutputFormat, print_error};

/// gaiabuild - assemble Gaia device profiles
#[derive(Parser)]
#[command(name = "gaiabuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Log at debug level unless RUST_LOG says otherwise
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

/// Source tree and build flags shared by every command.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
  /// Root of the gaia source tree
  #[arg(short, long, default_value = ".")]
  pub gaia_dir: PathBuf,

  /// Build flag overriding the environment, e.g. `--set DEBUG=1`
  #[arg(long = "set", value_name = "KEY=VALUE", value_parser = cmd::parse_flag)]
  pub flags: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
  /// Assemble the profile
  Build {
    #[command(flatten)]
    args: BuildArgs,

    /// Directory the profile is created in (default: the gaia dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum number of apps packaged in parallel (default: CPU count)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Give up when the build takes longer than this (e.g. "90s", "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
  },

  /// Print the resolved user.js without building
  Prefs {
    #[command(flatten)]
    args: BuildArgs,
  },

  /// Print the merged settings.json without building (always JSON)
  Settings {
    #[command(flatten)]
    args: BuildArgs,
  },

  /// Show the build configuration and discovered apps
  Info {
    #[command(flatten)]
    args: BuildArgs,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy())
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let format = cli.format;
  match cli.command {
    Commands::Build {
      args,
      output_dir,
      jobs,
      timeout,
    } => cmd::cmd_build(&args, output_dir, jobs, timeout, format),
    Commands::Prefs { args } => cmd::cmd_prefs(&args, format),
    Commands::Settings { args } => cmd::cmd_settings(&args),
    Commands::Info { args } => cmd::cmd_info(&args, format),
  }
}
