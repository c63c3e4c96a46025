//! osm-melt: Flatten an OSM XML extract into CSV tables
//!
//! Usage:
//!   # Read from file, write the tables to the current directory
//!   osm-melt SaoPaulo.osm
//!
//!   # Read from stdin, write to a directory with comma-separated output
//!   bzcat region.osm.bz2 | osm-melt --output-dir ./tables --delimiter ,
//!
//!   # Use a different street vocabulary and keep the prefix tally
//!   osm-melt city.osm --street-rules rules.json --ledger-out streets.json

// Use MiMalloc allocator for better performance on large extracts
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use osm_melt::{melt_osm, MeltConfig, StreetRules, TableWriter};
use std::fs::File;
use std::io::{stdin, BufRead, BufReader};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "osm-melt")]
#[command(about = "Flatten OSM XML nodes and ways into relational CSV tables", long_about = None)]
struct Args {
    /// Input OSM XML file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Directory receiving nodes.csv, nodes_tags.csv, ways.csv, ways_nodes.csv and ways_tags.csv
    #[arg(long, short = 'o', default_value = ".")]
    output_dir: PathBuf,

    /// Column delimiter (single ASCII character)
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Don't prefix output files with a UTF-8 byte order mark
    #[arg(long)]
    no_bom: bool,

    /// JSON file with expected street prefixes and abbreviations
    /// (default: built-in Brazilian Portuguese vocabulary)
    #[arg(long, value_name = "FILE")]
    street_rules: Option<PathBuf>,

    /// Also write the unexpected street prefix tally to this JSON file
    #[arg(long, value_name = "FILE")]
    ledger_out: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable logging
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    // Build config
    let mut config = MeltConfig::default();
    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {:?}", args.delimiter);
    }
    config.delimiter = args.delimiter as u8;
    config.write_bom = !args.no_bom;
    if let Some(path) = &args.street_rules {
        config.street_rules = StreetRules::from_json_file(path)
            .with_context(|| format!("Failed to load street rules from {}", path.display()))?;
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(stdin().lock()),
    };

    let mut writer = TableWriter::create_in_dir(&args.output_dir, &config)?;
    let report = melt_osm(reader, &mut writer, config)?;

    let ledger = serde_json::to_string_pretty(&report.ledger)?;
    if let Some(path) = &args.ledger_out {
        std::fs::write(path, &ledger)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    println!("{}", ledger);

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
