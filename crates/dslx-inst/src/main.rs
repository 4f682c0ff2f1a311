//! The `dslx-inst` command.
//!
//! Runs one parametric instantiation described by a TOML request file and
//! prints the resolved type and bindings.
//!
//! - `dslx-inst <request.toml>` - Instantiate and print the result
//!
//! Options:
//! - `--json` - Print the result (or diagnostic) as one JSON object
//! - `--no-color` - Disable colorized diagnostics
//! - `-v` - Increase log verbosity (repeatable; `RUST_LOG` overrides)

mod request;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use dslx_typeck::diagnostics::{render_diagnostic, DiagnosticOptions};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::request::Request;

#[derive(Parser)]
#[command(name = "dslx-inst", version, about = "Instantiate a DSLX parametric function or struct")]
struct Cli {
    /// Path to the request file
    file: PathBuf,

    /// Output the result and diagnostics as JSON (one object per line)
    #[arg(long)]
    json: bool,

    /// Disable colorized output
    #[arg(long = "no-color")]
    no_color: bool,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// How the run ended, when it did not succeed.
enum Failure {
    /// The request itself could not be read or lowered.
    Request(String),
    /// Instantiation failed; the diagnostic is already rendered.
    Instantiation(String),
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let diag_opts = DiagnosticOptions {
        color: !cli.no_color && !cli.json,
        json: cli.json,
    };

    match run(&cli.file, &diag_opts) {
        Ok(output) => println!("{}", output),
        Err(Failure::Request(e)) => {
            if cli.json {
                let msg = serde_json::json!({
                    "code": "R0001",
                    "severity": "error",
                    "message": e,
                    "file": cli.file.display().to_string(),
                    "spans": [],
                });
                eprintln!("{}", msg);
            } else {
                eprintln!("error: {}", e);
            }
            process::exit(1);
        }
        Err(Failure::Instantiation(rendered)) => {
            eprintln!("{}", rendered.trim_end());
            process::exit(1);
        }
    }
}

/// Load, lower and run the request: read -> lower -> instantiate -> print.
fn run(path: &Path, diag_opts: &DiagnosticOptions) -> Result<String, Failure> {
    let request = Request::from_file(path).map_err(Failure::Request)?;
    let job = request.lower().map_err(Failure::Request)?;
    info!(name = %job.name, args = job.args.len(), "running instantiation");

    let result = job.run().map_err(|err| {
        debug!(error = ?err, "instantiation failed");
        let filename = path.display().to_string();
        Failure::Instantiation(render_diagnostic(&err, &job.source, &filename, diag_opts))
    })?;

    if diag_opts.json {
        let output = serde_json::json!({
            "name": job.name,
            "type": result.ty.to_string(),
            "bindings": result.bindings,
        });
        Ok(output.to_string())
    } else {
        Ok(format!("{}: {}\nbindings: {}", job.name, result.ty, result.bindings))
    }
}
