//! Binary entry point for the sift CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Discover every test in one container
//! sift discover --catalog catalog.json --select container:a.MyTestClass
//!
//! # Mix selector kinds; results are merged into one tree
//! sift discover --catalog catalog.json \
//!     --select member:a.MyTestClass#test1 \
//!     --select 'id:[engine:sift][class:a.MyTestClass][test-factory:dyn()][dynamic-test:#2]'
//!
//! # Everything under a grouping path, defaulting to concurrent execution
//! sift discover --catalog catalog.json --select path:a.b --default-execution-mode concurrent
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use sift::cli::{run_discover, DiscoverOptions};
use sift_core::config::CliOverrides;
use sift_core::error::{OutputErrorCode, SiftError};
use sift_core::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Hierarchical test discovery.
///
/// Resolves selectors against an element catalog into a deduplicated test
/// tree. All output is JSON.
#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Hierarchical test discovery")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log record format on stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log record format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve selectors into a test tree and print it.
    Discover {
        /// JSON element catalog to resolve against.
        #[arg(long)]
        catalog: PathBuf,

        /// Selector in text form (`container:`, `member:`, `path:`, `root:`, `id:`).
        ///
        /// Can be given multiple times; selectors are resolved in order.
        #[arg(long = "select", value_name = "SELECTOR")]
        selectors: Vec<String>,

        /// JSON config file (`engine_id`, `default_execution_mode`).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Default execution mode (`same_thread` or `concurrent`).
        #[arg(long)]
        default_execution_mode: Option<String>,

        /// Engine id of the tree root.
        #[arg(long)]
        engine_id: Option<String>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            // Errors go to stdout as JSON like every other response.
            let _ = emit_response(&ErrorResponse::from_error(&err), &mut io::stdout());
            let _ = io::stdout().flush();
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), SiftError> {
    match cli.command {
        Command::Discover {
            catalog,
            selectors,
            config,
            default_execution_mode,
            engine_id,
        } => {
            let options = DiscoverOptions {
                catalog,
                selectors,
                config,
                overrides: CliOverrides {
                    engine_id,
                    default_execution_mode,
                },
            };
            let response = run_discover(&options)?;
            emit_response(&response, &mut io::stdout())
                .map_err(|e| SiftError::internal(e.to_string()))?;
            let _ = io::stdout().flush();
            Ok(())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
