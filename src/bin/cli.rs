//! SchemaLens CLI - scan a schema project and inspect the index.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schemalens::{SchemaProject, TraceRecord};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemalens")]
#[command(about = "SchemaLens CLI - GraphQL schema index and trace correlator", long_about = None)]
struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the project and print a report
    Scan {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up a symbol by name
    Find {
        /// Type or field name
        name: String,
    },

    /// List executable operations and persisted documents
    Operations,

    /// Correlate a runtime trace (JSON array of records) against the schema
    Trace {
        /// Path to the trace file
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut project = SchemaProject::open(&cli.root);

    match cli.command {
        Commands::Scan { json } => {
            let report = project.scan();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!(
                "Scanned {} files, indexed {} ({} ms{})",
                report.files.len(),
                report.indexed,
                report.duration_ms,
                if report.cancelled { ", cancelled" } else { "" }
            );
            let stats = project.index().stats();
            println!(
                "  definitions: {}, root operations: {}, relations: {}",
                stats.definitions, stats.root_operations, stats.relation_edges
            );
            println!(
                "  operations: {} across {} files, persisted documents: {}",
                report.operations, stats.operation_files, report.persisted_documents
            );
            for skip in &report.skips {
                println!("  skipped {}: {}", skip.unit, skip.message);
            }
        }

        Commands::Find { name } => {
            project.scan();
            let index = project.index();

            match index.find_definition(&name) {
                Some(locations) => {
                    for loc in locations {
                        match &loc.container {
                            Some(container) => println!(
                                "{}:{}:{} (field of {})",
                                loc.file.display(),
                                loc.line,
                                loc.character,
                                container
                            ),
                            None => println!(
                                "{}:{}:{}",
                                loc.file.display(),
                                loc.line,
                                loc.character
                            ),
                        }
                    }
                }
                None => println!("No definition found for '{}'.", name),
            }

            let outgoing = index.relations().relations_from(&name);
            if !outgoing.is_empty() {
                println!("References:");
                for rel in outgoing {
                    println!(
                        "  {}.{} -> {}{}",
                        rel.from_type,
                        rel.field_name,
                        rel.to_type,
                        if rel.is_list { " (list)" } else { "" }
                    );
                }
            }
        }

        Commands::Operations => {
            project.scan();
            let index = project.index();

            if index.operations().is_empty() {
                println!("No executable documents found.");
            }
            for (uri, entries) in index.operations() {
                println!("{}", uri);
                for entry in entries {
                    println!(
                        "  {:?} {} [{}..{}]{}",
                        entry.kind,
                        entry.name,
                        entry.start,
                        entry.end,
                        if entry.persisted { " persisted" } else { "" }
                    );
                }
            }
            for (id, doc) in index.persisted_documents() {
                println!("{} -> {}", id, doc.file_uri);
            }
        }

        Commands::Trace { file } => {
            let report = project.scan();

            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading trace file {}", file.display()))?;
            let records: Vec<TraceRecord> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing trace file {}", file.display()))?;
            project.apply_trace(&records);

            let mut any = false;
            for path in &report.files {
                let diags = project.diagnostics_for(path);
                if diags.is_empty() {
                    continue;
                }
                any = true;
                println!("{}", path.display());
                for diag in diags {
                    println!(
                        "  {}:{} {:?}: {}",
                        diag.line, diag.character, diag.severity, diag.message
                    );
                }
            }
            if !any {
                println!("No trace paths resolved to schema locations.");
            }
        }
    }

    Ok(())
}
