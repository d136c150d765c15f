use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pln_form_pdf::{FillerConfig, FormFiller, fill_to_file, list_form_fields, synthesize_to_file};

#[derive(Parser)]
#[command(name = "pln-form-pdf", version)]
#[command(about = "Fill the PLN2 personalised licence number application form")]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a template: native fields if present, otherwise an overlay
    Fill {
        /// Application record (JSON)
        #[arg(long)]
        record: PathBuf,
        /// Form template (PDF)
        #[arg(long)]
        template: PathBuf,
        /// Field position map, tried before the default locations
        #[arg(long)]
        positions: Option<PathBuf>,
        /// TrueType family for the synthesized fallback
        #[arg(long)]
        font: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Build the replica form without a template
    Synthesize {
        #[arg(long)]
        record: PathBuf,
        #[arg(long)]
        font: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List the interactive field names of a template
    Fields {
        #[arg(long)]
        template: PathBuf,
    },
}

fn config(positions: Option<PathBuf>, font: Option<String>) -> FillerConfig {
    let mut config = FillerConfig::default();
    if let Some(path) = positions {
        config = config.with_positions_file(path);
    }
    if let Some(family) = font {
        config = config.with_font_family(family);
    }
    config
}

fn run(command: Command) -> Result<(), pln_form_pdf::Error> {
    match command {
        Command::Fill {
            record,
            template,
            positions,
            font,
            output,
        } => {
            let filler = FormFiller::new(config(positions, font));
            let strategy = fill_to_file(&filler, &record, &template, &output)?;
            println!("{} ({strategy})", output.display());
        }
        Command::Synthesize {
            record,
            font,
            output,
        } => {
            let filler = FormFiller::new(config(None, font));
            synthesize_to_file(&filler, &record, &output)?;
            println!("{}", output.display());
        }
        Command::Fields { template } => {
            for name in list_form_fields(&template)? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
