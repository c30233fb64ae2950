//! M@TE CLI
//!
//! - `mate issue`: parse a submission issue into a record and a field report
//! - `mate crosswalk`: turn a record into a flat RO-Crate
//! - `mate flatten`: flatten an existing crate document

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mate_ingest_issue::{
    parse_issue, DirectoryLookup, NoLookup, ParseReport, RegistryLookup, Severity,
};
use mate_rocrate::{Crosswalk, CrosswalkConfig, Flattener, RandomIdMinter, SubmissionRecord};

#[derive(Parser)]
#[command(name = "mate")]
#[command(author, version, about = "M@TE model submissions → RO-Crate")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a rendered submission issue body (`-` reads stdin).
    Issue {
        body: PathBuf,
        /// Write the submission record here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Write the field report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Registry cache laid out as `<dir>/<kind>/<id>.json`
        #[arg(long)]
        registry_cache: Option<PathBuf>,
        /// Repository names that are already taken
        #[arg(long, num_args = 1..)]
        taken: Vec<String>,
    },

    /// Build an RO-Crate from a submission record.
    Crosswalk {
        record: PathBuf,
        /// Crosswalk config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Crate template, overrides the config
        #[arg(long)]
        template: Option<PathBuf>,
        /// Per-type attribute allow-lists, overrides the config
        #[arg(long)]
        entity_template: Option<PathBuf>,
        /// Mapping table, overrides the config
        #[arg(long)]
        mappings: Option<PathBuf>,
        /// Keep every attribute of typed entities
        #[arg(long)]
        no_filter: bool,
        /// Leave nested entities in place
        #[arg(long)]
        no_flatten: bool,
        /// Seed for synthetic identifiers
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Flatten an existing crate document.
    Flatten {
        input: PathBuf,
        #[arg(long)]
        max_passes: Option<usize>,
        /// Seed for synthetic identifiers
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Issue {
            body,
            out,
            report,
            registry_cache,
            taken,
        } => cmd_issue(&body, out.as_deref(), report.as_deref(), registry_cache, &taken),
        Commands::Crosswalk {
            record,
            config,
            template,
            entity_template,
            mappings,
            no_filter,
            no_flatten,
            seed,
            out,
        } => {
            let overrides = CrosswalkOverrides {
                template,
                entity_template,
                mappings,
                no_filter,
                no_flatten,
            };
            cmd_crosswalk(&record, config.as_deref(), overrides, seed, out.as_deref())
        }
        Commands::Flatten {
            input,
            max_passes,
            seed,
            out,
        } => cmd_flatten(&input, max_passes, seed, out.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(io::stderr),
        )
        .init();
}

// ============================================================================
// IO helpers
// ============================================================================

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Pretty JSON to `out`, or stdout when no path is given.
fn write_json(value: &impl serde::Serialize, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, text + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn print_report(report: &ParseReport) {
    for issue in &report.issues {
        let label = match issue.severity {
            Severity::Warning => "warning:".yellow().bold(),
            Severity::Error => "error:".red().bold(),
        };
        eprintln!("{label} {} {}", issue.field.bold(), issue.message);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_issue(
    body: &Path,
    out: Option<&Path>,
    report_out: Option<&Path>,
    registry_cache: Option<PathBuf>,
    taken: &[String],
) -> Result<()> {
    let text = read_input(body)?;
    let lookup: Box<dyn RegistryLookup> = match registry_cache {
        Some(dir) => {
            let cache = DirectoryLookup::new(dir);
            info!(root = %cache.root().display(), "using registry cache");
            Box::new(cache)
        }
        None => Box::new(NoLookup),
    };

    let parsed = parse_issue(&text, lookup.as_ref(), &mut |slug| {
        taken.iter().any(|t| t == slug)
    });

    write_json(&parsed.record, out)?;
    if let Some(path) = report_out {
        write_json(&parsed.report, Some(path))?;
    }
    print_report(&parsed.report);

    if parsed.report.has_errors() {
        bail!(
            "issue has {} field error(s)",
            parsed.report.errors().count()
        );
    }
    Ok(())
}

struct CrosswalkOverrides {
    template: Option<PathBuf>,
    entity_template: Option<PathBuf>,
    mappings: Option<PathBuf>,
    no_filter: bool,
    no_flatten: bool,
}

fn cmd_crosswalk(
    record: &Path,
    config: Option<&Path>,
    overrides: CrosswalkOverrides,
    seed: Option<u64>,
    out: Option<&Path>,
) -> Result<()> {
    let mut config = match config {
        Some(path) => CrosswalkConfig::load(path)?,
        None => CrosswalkConfig::default(),
    };
    if overrides.template.is_some() {
        config.crate_template = overrides.template;
    }
    if overrides.entity_template.is_some() {
        config.entity_template = overrides.entity_template;
    }
    if overrides.mappings.is_some() {
        config.mappings = overrides.mappings;
    }
    if overrides.no_filter {
        config.filter_entities = false;
    }
    if overrides.no_flatten {
        config.flatten = false;
    }

    let crosswalk = Crosswalk::from_config(&config).context("failed to set up crosswalk")?;
    let record: SubmissionRecord = serde_json::from_value(read_json(record)?)
        .with_context(|| format!("{} is not a submission record", record.display()))?;

    let minter = seed.map_or_else(RandomIdMinter::new, RandomIdMinter::seeded);
    let document = crosswalk.build_with(&record, minter)?;
    write_json(&document, out)
}

fn cmd_flatten(
    input: &Path,
    max_passes: Option<usize>,
    seed: Option<u64>,
    out: Option<&Path>,
) -> Result<()> {
    let mut document = read_json(input)?;
    let mut flattener = match seed {
        Some(seed) => Flattener::seeded(seed),
        None => Flattener::new(),
    };
    if let Some(max_passes) = max_passes {
        flattener = flattener.max_passes(max_passes);
    }

    let report = flattener
        .flatten(&mut document)
        .with_context(|| format!("failed to flatten {}", input.display()))?;
    info!(
        passes = report.passes,
        hoisted = report.hoisted,
        nodes = report.nodes,
        "flattened"
    );
    write_json(&document, out)
}
