use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use joosc::ast::{AstPrinter, CompilationUnit};
use joosc::{Config, DispatchLayout};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "joosc")]
#[command(about = "Hierarchy checker and x86 backend for Joos compilation units")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG still applies
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the type hierarchy of a program
    Check {
        /// JSON unit files or directories holding them
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Treat undeclared parent types as opaque external types
        #[arg(long)]
        allow_unresolved: bool,
    },

    /// Verify a program and write one assembly file per unit
    Compile {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory for .s files
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[arg(long)]
        allow_unresolved: bool,

        /// Use a dispatch layout from a JSON file instead of computing one
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,

        /// Leave `;` comments out of the generated assembly
        #[arg(long)]
        no_comments: bool,
    },

    /// Print the dispatch layout of a verified program as JSON
    Layout {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        allow_unresolved: bool,
    },

    /// Print the AST of every unit
    Dump {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Show the full Debug representation
        #[arg(short, long)]
        detailed: bool,
    },
}

/// A unit file holds either one compilation unit or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum UnitFile {
    One(Box<CompilationUnit>),
    Many(Vec<CompilationUnit>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check { inputs, allow_unresolved } => {
            let units = load_units(&inputs)?;
            let config = Config::default().allow_unresolved(allow_unresolved);
            let graph = joosc::check(&units, &config)?;
            println!("ok: {} types verified", graph.len());
        }
        Commands::Compile { inputs, output, allow_unresolved, layout, no_comments } => {
            let units = load_units(&inputs)?;
            let mut config = Config::default().allow_unresolved(allow_unresolved);
            if let Some(dir) = output {
                config = config.with_output_dir(dir);
            }
            config.emit_comments = !no_comments;
            let written = match layout {
                Some(path) => {
                    let layout: DispatchLayout = read_json(&path)?;
                    joosc::compile_with_layout(&units, &layout, &config)?
                }
                None => joosc::compile(&units, &config)?,
            };
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Layout { inputs, allow_unresolved } => {
            let units = load_units(&inputs)?;
            let config = Config::default().allow_unresolved(allow_unresolved);
            let graph = joosc::check(&units, &config)?;
            let layout = DispatchLayout::build(&graph, &units)?;
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        Commands::Dump { inputs, detailed } => {
            let mut printer = AstPrinter::new();
            for unit in load_units(&inputs)? {
                if detailed {
                    println!("{:#?}", unit);
                } else {
                    print!("{}", printer.print(&unit));
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

/// Units from every input, directories walked recursively for `*.json` in
/// file-name order
fn load_units(inputs: &[PathBuf]) -> Result<Vec<CompilationUnit>> {
    let mut units = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.with_context(|| format!("cannot walk {}", input.display()))?;
                let path = entry.path();
                if entry.file_type().is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                    load_file(path, &mut units)?;
                }
            }
        } else {
            load_file(input, &mut units)?;
        }
    }
    log::debug!("loaded {} compilation units", units.len());
    Ok(units)
}

fn load_file(path: &Path, units: &mut Vec<CompilationUnit>) -> Result<()> {
    match read_json(path)? {
        UnitFile::One(unit) => units.push(*unit),
        UnitFile::Many(many) => units.extend(many),
    }
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a valid input file", path.display()))
}
