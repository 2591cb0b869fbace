//! # xs2js CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber, and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xs2js_cli::convert::{run_convert, ConvertArgs};
use xs2js_cli::validate::{run_validate, ValidateArgs};

/// XML Schema to JSON Schema transpiler.
///
/// Converts interdependent XSD documents into draft-07 JSON Schema
/// documents that reference each other, and validates instances against
/// them.
#[derive(Parser, Debug)]
#[command(name = "xs2js", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert XSD files into JSON Schema documents.
    Convert(ConvertArgs),

    /// Validate JSON or YAML instances against converted documents.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }

    let result = match cli.command {
        Commands::Convert(args) => run_convert(&args),
        Commands::Validate(args) => run_validate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_convert() {
        let cli = Cli::try_parse_from([
            "xs2js", "convert", "A.xsd", "B.xsd", "--out-dir", "out", "--pretty",
        ])
        .unwrap();
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.schemas.len(), 2);
        assert_eq!(args.out_dir.to_str(), Some("out"));
        assert!(args.pretty);
        assert!(args.config.is_none());
    }

    #[test]
    fn cli_parse_validate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "xs2js",
            "validate",
            "A.xsd",
            "--schema",
            "A.json",
            "--instance",
            "one.json",
            "--instance",
            "two.yaml",
            "--log-json",
            "-vv",
        ])
        .unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.verbose, 2);
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.schema, "A.json");
        assert_eq!(args.instances.len(), 2);
    }

    #[test]
    fn cli_convert_requires_out_dir() {
        assert!(Cli::try_parse_from(["xs2js", "convert", "A.xsd"]).is_err());
    }

    #[test]
    fn cli_validate_requires_instance() {
        assert!(Cli::try_parse_from(["xs2js", "validate", "A.xsd", "--schema", "A.json"]).is_err());
    }
}
