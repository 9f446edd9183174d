//! Binary entry point for the surveyor CLI.
//!
//! ## Usage
//!
//! ```bash
//! # First run over a freshly indexed artifact
//! surveyor generate --index index.json --out mappings/
//!
//! # Subsequent run, carrying names forward through match data
//! surveyor update --index index.json --out mappings/ \
//!     --old-mappings prev/mappings.json \
//!     --old-constructors prev/constructors.json \
//!     --matches v1-to-v2.match
//!
//! # Full pass without writing anything
//! surveyor update ... --simulate
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use surveyor::constructors::ConstructorTable;
use surveyor::hierarchy::{LibraryIndex, PlatformManifest};
use surveyor::index::ArtifactIndex;
use surveyor::ledger::NamingLedger;
use surveyor::mapping::MappingTree;
use surveyor::matches::MatchSet;
use surveyor::{Generator, GeneratorConfig, GeneratorInputs, RunOutput, SurveyorError};

// ============================================================================
// CLI Structure
// ============================================================================

/// Stable placeholder names for obfuscated artifacts.
#[derive(Parser, Debug)]
#[command(name = "surveyor", version, about = "Stable placeholder names for obfuscated artifacts")]
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

/// Inputs and tuning shared by both run modes.
#[derive(Parser, Debug)]
struct RunArgs {
    /// Structural index of the artifact (JSON, produced by the indexer).
    #[arg(long)]
    index: PathBuf,

    /// Output directory for mappings.json, constructors.json, and the
    /// naming ledger.
    #[arg(long)]
    out: PathBuf,

    /// Naming ledger path (default: <out>/names.txt). Loaded if present,
    /// persisted after the run.
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Library index for ancestors outside the artifact (JSON).
    #[arg(long)]
    library: Option<PathBuf>,

    /// Extra platform manifest entries (JSON array of classes).
    #[arg(long)]
    platform: Option<PathBuf>,

    /// Package prefix for freshly minted top-level class names.
    #[arg(long, default_value = "remapped")]
    package_prefix: String,

    /// Skip non-constructor methods whose name is longer than this.
    #[arg(long, default_value_t = 3)]
    method_threshold: usize,

    /// Skip fields whose name is longer than this.
    #[arg(long, default_value_t = 2)]
    field_threshold: usize,

    /// Run the full pass but persist nothing.
    #[arg(long)]
    simulate: bool,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Assign names to a first artifact version, with no predecessor.
    Generate {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Assign names to a new artifact version, carrying matched names
    /// forward from the previous one.
    Update {
        #[command(flatten)]
        run: RunArgs,

        /// Mapping tree produced for the previous version (JSON).
        #[arg(long)]
        old_mappings: PathBuf,

        /// Constructor side table produced for the previous version (JSON).
        #[arg(long)]
        old_constructors: PathBuf,

        /// Correlation file pairing old-version and new-version symbols.
        #[arg(long)]
        matches: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), SurveyorError> {
    match cli.command {
        Command::Generate { run } => execute_run(run, None),
        Command::Update {
            run,
            old_mappings,
            old_constructors,
            matches,
        } => {
            let old_tree = MappingTree::load(&old_mappings)?;
            let old_ctors = ConstructorTable::load(&old_constructors)?;
            let match_set = MatchSet::load(&matches)?;
            execute_run(run, Some((old_tree, old_ctors, match_set)))
        }
    }
}

/// Load the inputs, run the generator, and persist the outputs.
fn execute_run(
    args: RunArgs,
    previous: Option<(MappingTree, ConstructorTable, MatchSet)>,
) -> Result<(), SurveyorError> {
    let index = ArtifactIndex::load(&args.index)?;

    let libraries = match &args.library {
        Some(path) => Some(LibraryIndex::load(path)?),
        None => None,
    };
    let platform = match &args.platform {
        Some(path) => PlatformManifest::load(path)?,
        None => PlatformManifest::builtin(),
    };

    let ledger_path = args
        .ledger
        .clone()
        .unwrap_or_else(|| args.out.join("names.txt"));
    let mut ledger = NamingLedger::load(&ledger_path)?;

    let config = GeneratorConfig {
        package_prefix: args.package_prefix.clone(),
        method_name_threshold: args.method_threshold,
        field_name_threshold: args.field_threshold,
        simulate: args.simulate,
    };

    let inputs = GeneratorInputs {
        index: &index,
        libraries: libraries.as_ref(),
        platform: &platform,
        matches: previous.as_ref().map(|(_, _, m)| m),
        old_tree: previous.as_ref().map(|(t, _, _)| t),
        old_constructors: previous.as_ref().map(|(_, c, _)| c),
    };

    let output = Generator::new(inputs, &mut ledger, config).run()?;

    output.persist(
        &ledger,
        &args.out.join("mappings.json"),
        &args.out.join("constructors.json"),
        &ledger_path,
    )?;

    print_summary(&output);
    Ok(())
}

/// Human-readable run summary on stdout.
fn print_summary(output: &RunOutput) {
    let report = &output.report;
    println!(
        "classes:  {} matched, {} new",
        report.matched_classes, report.new_classes
    );
    println!(
        "methods:  {} matched, {} new",
        report.matched_methods, report.new_methods
    );
    println!(
        "fields:   {} matched, {} new",
        report.matched_fields, report.new_fields
    );
    println!("interface signature groups: {}", report.interface_groups);
    println!("constructor records: {}", output.constructors.len());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn parse_generate_defaults() {
            let args = [
                "surveyor", "generate", "--index", "index.json", "--out", "maps",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Generate { run } => {
                    assert_eq!(run.index, PathBuf::from("index.json"));
                    assert_eq!(run.out, PathBuf::from("maps"));
                    assert_eq!(run.package_prefix, "remapped");
                    assert_eq!(run.method_threshold, 3);
                    assert_eq!(run.field_threshold, 2);
                    assert!(!run.simulate);
                    assert!(run.ledger.is_none());
                    assert!(run.library.is_none());
                }
                _ => panic!("expected Generate"),
            }
        }

        #[test]
        fn parse_update_requires_previous_inputs() {
            let args = [
                "surveyor", "update", "--index", "index.json", "--out", "maps",
            ];
            assert!(Cli::try_parse_from(args).is_err());
        }

        #[test]
        fn parse_update_full() {
            let args = [
                "surveyor",
                "update",
                "--index",
                "index.json",
                "--out",
                "maps",
                "--old-mappings",
                "prev/mappings.json",
                "--old-constructors",
                "prev/constructors.json",
                "--matches",
                "v1-v2.match",
                "--simulate",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Update {
                    run,
                    old_mappings,
                    old_constructors,
                    matches,
                } => {
                    assert!(run.simulate);
                    assert_eq!(old_mappings, PathBuf::from("prev/mappings.json"));
                    assert_eq!(old_constructors, PathBuf::from("prev/constructors.json"));
                    assert_eq!(matches, PathBuf::from("v1-v2.match"));
                }
                _ => panic!("expected Update"),
            }
        }

        #[test]
        fn parse_thresholds_and_prefix() {
            let args = [
                "surveyor",
                "generate",
                "--index",
                "index.json",
                "--out",
                "maps",
                "--package-prefix",
                "renamed",
                "--method-threshold",
                "4",
                "--field-threshold",
                "3",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Generate { run } => {
                    assert_eq!(run.package_prefix, "renamed");
                    assert_eq!(run.method_threshold, 4);
                    assert_eq!(run.field_threshold, 3);
                }
                _ => panic!("expected Generate"),
            }
        }

        #[test]
        fn parse_log_level() {
            let args = [
                "surveyor",
                "generate",
                "--index",
                "i.json",
                "--out",
                "o",
                "--log-level",
                "debug",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(matches!(cli.global.log_level, LogLevel::Debug));
        }
    }
}
