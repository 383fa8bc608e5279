mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::migrate::{self, Overrides, RunStatus};
use mentorly_core::{config::load_dotenv, init_logging, LoggingConfig};
use mentorly_migrate::FailurePolicy;

#[derive(Parser)]
#[command(name = "mentorly")]
#[command(version, about = "Mentorly backend provisioning CLI")]
struct Cli {
    /// Show debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration management
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Apply the schema files, then verify tables and storage bucket
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// What to do after a statement fails
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Exit with status 2 if any statement failed or an object is missing
        #[arg(long)]
        strict: bool,
    },

    /// Print the statements that would be executed, without connecting
    Plan {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Only check that the expected tables and bucket exist
    Verify {
        /// Provisioning manifest (defaults to provision.yaml when present)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Exit with status 2 if an object is missing
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Schema file to apply; repeat to apply several in order (overrides the manifest)
    #[arg(long = "schema", short = 's')]
    schema: Vec<PathBuf>,

    /// Provisioning manifest (defaults to provision.yaml when present)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Split statements with a SQL parser instead of on every semicolon
    #[arg(long)]
    parsed: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Stop at the first failed statement
    Abort,
    /// Log failures and keep going
    Continue,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Abort => FailurePolicy::AbortOnError,
            PolicyArg::Continue => FailurePolicy::ContinueOnError,
        }
    }
}

impl SourceArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            manifest: self.manifest,
            schema_files: self.schema,
            parsed: self.parsed,
            ..Overrides::default()
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::FailuresReported => ExitCode::from(2),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let dotenv = load_dotenv();

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    }
    .with_json(cli.json_logs);

    if let Err(err) = init_logging(&logging) {
        eprintln!("error: {}", err);
        return ExitCode::FAILURE;
    }
    if let Some(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let result = match cli.command {
        Commands::Migrate { migrate_command } => match migrate_command {
            MigrateCommands::Run {
                source,
                policy,
                timeout,
                strict,
            } => {
                let overrides = Overrides {
                    policy: policy.map(FailurePolicy::from),
                    timeout_secs: timeout,
                    ..source.into_overrides()
                };
                migrate::run(overrides, strict).await
            }
            MigrateCommands::Plan { source } => migrate::plan(source.into_overrides()),
            MigrateCommands::Verify {
                manifest,
                timeout,
                strict,
            } => {
                let overrides = Overrides {
                    manifest,
                    timeout_secs: timeout,
                    ..Overrides::default()
                };
                migrate::verify(overrides, strict).await
            }
        },
    };

    match result {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
