// parity CLI - old-vs-new dataset reconciliation

mod exit_codes;
mod input;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use parity_recon::config::DelimiterChoice;

use exit_codes::EXIT_SUCCESS;
use logging::{init_logging, LogConfig};

#[derive(Parser)]
#[command(name = "parity")]
#[command(about = "Reconcile an old and a new extract of the same dataset")]
#[command(version)]
struct Cli {
    /// More diagnostics on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors on stderr
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a comparison from a TOML config file
    #[command(after_help = "\
Examples:
  parity run case_info.recon.toml
  parity run case_info.recon.toml --json
  parity run case_info.recon.toml --output report.json --joined joined.csv
  parity run case_info.recon.toml --log-file case_info.log

Exit codes:
  0 clean, 1 differences found, 2 usage, 3 primary key gate failed,
  4 invalid config, 5 unreadable input, 6 output write failure")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON report to file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the joined dataset as CSV (overrides [output] joined)
        #[arg(long)]
        joined: Option<PathBuf>,

        /// Write the audit log (overrides [output] log)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Validate a config without running
    #[command(after_help = "\
Examples:
  parity validate case_info.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Check that a column is a usable primary key in one file
    #[command(after_help = "\
Examples:
  parity keys old/case_info.txt --key CaseNumber
  parity keys new/case_info.csv --key CaseNumber --delimiter comma")]
    Keys {
        /// CSV or TSV file
        file: PathBuf,

        /// Primary key column
        #[arg(long, short = 'k')]
        key: String,

        /// Field delimiter
        #[arg(long, value_enum, default_value_t = DelimiterArg::Auto)]
        delimiter: DelimiterArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DelimiterArg {
    Comma,
    Tab,
    Auto,
}

impl From<DelimiterArg> for DelimiterChoice {
    fn from(arg: DelimiterArg) -> Self {
        match arg {
            DelimiterArg::Comma => DelimiterChoice::Comma,
            DelimiterArg::Tab => DelimiterChoice::Tab,
            DelimiterArg::Auto => DelimiterChoice::Auto,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose, cli.quiet));

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            joined,
            log_file,
        } => recon::cmd_run(recon::RunArgs {
            config,
            json,
            output,
            joined,
            log_file,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Keys { file, key, delimiter } => recon::cmd_keys(file, key, delimiter.into()),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
