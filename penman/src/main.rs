//! Penman CLI - generate metaload scripts from CSV configuration
//!
//! # Main Commands
//!
//! ```bash
//! penman generate general.csv tables.csv -o load.sql   # Write the metaload script
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! penman parse general.csv                 # Show parsed rows as JSON
//! penman records general.csv tables.csv    # Show typed records as JSON
//! penman commands                          # Show the emitted functions
//! ```

use clap::{Parser, Subcommand};
use penman::logging::{init_logging, LogConfig};
use penman::{
    commands_description, generate_from_files, load_records, read_config_file, BoundaryPolicy,
    GenerateOptions,
};
use serde_json::json;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "penman")]
#[command(about = "Generate metaload registration scripts from CSV configuration", long_about = None)]
struct Cli {
    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the metaload script
    Generate {
        /// General configuration file
        general: PathBuf,

        /// Table configuration file
        tables: PathBuf,

        /// Field delimiter (default: ';')
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON file with generation options
        #[arg(long)]
        options: Option<PathBuf>,

        /// Banner width in characters
        #[arg(long)]
        banner_width: Option<usize>,

        /// Group adjacent source tables of different systems together
        #[arg(long)]
        merge_adjacent_systems: bool,
    },

    /// Parse one configuration file and output JSON
    Parse {
        /// Configuration file
        input: PathBuf,

        /// Field delimiter (default: ';')
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Group both files and output the typed records as JSON
    Records {
        /// General configuration file
        general: PathBuf,

        /// Table configuration file
        tables: PathBuf,

        /// Field delimiter (default: ';')
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the metaload functions the generator emits
    Commands,
}

fn main() {
    let cli = Cli::parse();

    let config = LogConfig::from_verbosity(cli.verbose, cli.quiet)
        .with_ansi(std::io::stderr().is_terminal());
    init_logging(&config);

    let result = match cli.command {
        Commands::Generate {
            general,
            tables,
            delimiter,
            output,
            options,
            banner_width,
            merge_adjacent_systems,
        } => {
            let overrides = Overrides {
                delimiter,
                banner_width,
                merge_adjacent_systems,
            };
            cmd_generate(&general, &tables, options.as_deref(), overrides, output.as_deref())
        }

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Records {
            general,
            tables,
            delimiter,
            output,
        } => cmd_records(&general, &tables, delimiter, output.as_deref()),

        Commands::Commands => cmd_commands(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Command-line values that take precedence over the options file.
struct Overrides {
    delimiter: Option<char>,
    banner_width: Option<usize>,
    merge_adjacent_systems: bool,
}

fn build_options(
    options_path: Option<&Path>,
    overrides: Overrides,
) -> Result<GenerateOptions, Box<dyn std::error::Error>> {
    let mut options = match options_path {
        Some(path) => GenerateOptions::from_json_file(path)?,
        None => GenerateOptions::default(),
    };
    if let Some(delimiter) = overrides.delimiter {
        options.delimiter = delimiter;
    }
    if let Some(width) = overrides.banner_width {
        options.emit.banner_width = width;
    }
    if overrides.merge_adjacent_systems {
        options.emit.system_boundary = BoundaryPolicy::Merge;
    }
    Ok(options)
}

fn delimiter_options(delimiter: Option<char>) -> GenerateOptions {
    let mut options = GenerateOptions::default();
    if let Some(delimiter) = delimiter {
        options.delimiter = delimiter;
    }
    options
}

fn cmd_generate(
    general: &Path,
    tables: &Path,
    options_path: Option<&Path>,
    overrides: Overrides,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = build_options(options_path, overrides)?;
    info!(general = %general.display(), tables = %tables.display(), "generating");

    let generation = generate_from_files(general, tables, &options)?;
    let complete = generation.is_complete();
    info!("work done: {}", complete);

    let generation = generation.ensure_complete()?;
    write_output(&generation.script.to_string(), output)?;

    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = delimiter_options(delimiter);
    let table = read_config_file(input, options.delimiter_byte()?)?;
    info!(encoding = %table.encoding, rows = table.len(), "parsed {}", input.display());

    let json = serde_json::to_string_pretty(&table)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_records(
    general: &Path,
    tables: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = delimiter_options(delimiter);
    let delimiter = options.delimiter_byte()?;
    let general_table = read_config_file(general, delimiter)?;
    let tables_table = read_config_file(tables, delimiter)?;

    let (general_config, records) = load_records(&general_table, &tables_table)?;

    let json = serde_json::to_string_pretty(&json!({
        "general": general_config,
        "records": records,
    }))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_commands() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", commands_description());
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            info!("output written to {}", p.display());
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
