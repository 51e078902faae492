//! gen-ver - stamp the switch gateware with its build version
//!
//! With no arguments, writes `modules/wrsw_hwiu/gw_ver_pkg.vhd` in the
//! enclosing working tree.
//! Outputs JSON to stdout, logs to stderr.
//! Returns 2 when the record is rejected, 1 on any other failure.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use hwver_core::{
    logging, BuildDate, GenerateError, Generator, GeneratorConfig, Git, Manifest,
    PackageTemplate,
};

#[derive(Parser)]
#[command(name = "gen-ver")]
#[command(about = "Generate the switch gateware version package")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory inside the working tree
    #[arg(short = 'C', long, default_value = ".", global = true)]
    repo: PathBuf,

    /// Generator configuration (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the version package (default)
    Generate {
        /// Print the package instead of writing it
        #[arg(long)]
        dry_run: bool,

        /// Fail when a revision cannot be resolved
        #[arg(long)]
        strict: bool,
    },

    /// Print the version record
    Show,

    /// Read back a generated package
    Inspect {
        file: PathBuf,
    },

    /// Decode a packed build date word
    DecodeDate {
        word: String,
    },

    /// Render an hdlmake Manifest.py
    Manifest {
        /// JSON payload (Manifest)
        #[arg(short, long)]
        payload: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            println!("{}", json!({ "success": false, "error": e.to_string() }));
            match e {
                GenerateError::Validation(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, GenerateError> {
    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    let today = chrono::Local::now().date_naive();

    match cli.command.unwrap_or(Commands::Generate { dry_run: false, strict: false }) {
        Commands::Generate { dry_run, strict } => {
            config.strict |= strict;
            let generator = Generator::new(config, Git::new(&cli.repo));

            if dry_run {
                let prepared = generator.prepare(today)?;
                print!("{}", prepared.text);
                return Ok(ExitCode::SUCCESS);
            }

            let report = generator.generate(today)?;
            let output = json!({
                "success": true,
                "report": serde_json::to_value(&report)?,
            });
            println!("{:#}", output);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Show => {
            let generator = Generator::new(config, Git::new(&cli.repo));
            let record = generator.collect(today)?;
            println!("{:#}", serde_json::to_value(&record)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Inspect { file } => {
            let text = fs::read_to_string(&file).map_err(|source| GenerateError::Io {
                path: file.clone(),
                source,
            })?;
            let record = match PackageTemplate::from_config(&config).parse(&text) {
                Ok(record) => record,
                Err(e) => {
                    println!("{}", json!({ "success": false, "error": e.to_string() }));
                    return Ok(ExitCode::FAILURE);
                }
            };
            let date = record.build_date;
            let output = json!({
                "record": serde_json::to_value(&record)?,
                "build_date": { "day": date.day, "month": date.month, "year": date.year },
            });
            println!("{:#}", output);
            Ok(ExitCode::SUCCESS)
        }

        Commands::DecodeDate { word } => match BuildDate::from_hex(&word) {
            Ok(date) => {
                let output = json!({
                    "hex": date.to_hex(),
                    "day": date.day,
                    "month": date.month,
                    "year": date.year,
                });
                println!("{:#}", output);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                println!("{}", json!({ "success": false, "error": e.to_string() }));
                Ok(ExitCode::FAILURE)
            }
        },

        Commands::Manifest { payload } => {
            let manifest: Manifest = match serde_json::from_str(&payload) {
                Ok(m) => m,
                Err(e) => {
                    println!("{}", json!({ "success": false, "error": format!("Invalid payload: {}", e) }));
                    return Ok(ExitCode::FAILURE);
                }
            };
            print!("{}", manifest.render());
            Ok(ExitCode::SUCCESS)
        }
    }
}
