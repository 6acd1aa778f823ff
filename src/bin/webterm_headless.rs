//! Headless terminal runner
//!
//! Runs a recorded byte stream through the terminal engine without a
//! browser. Useful for testing and generating deterministic output.
//!
//! ```bash
//! # Render a capture to an image and print the final state
//! printf 'Hello\x1b[31mRed\x1b[0m' | webterm-headless --ppm out.ppm --json
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mochi_webterm::{Config, Terminal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "webterm-headless")]
#[command(version)]
#[command(about = "Render a terminal byte stream to an image", long_about = None)]
struct Args {
    /// Input file (stdin if not specified)
    input: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Terminal width in cells
    #[arg(long, value_name = "COLS")]
    cols: Option<usize>,

    /// Terminal height in cells
    #[arg(long, value_name = "ROWS")]
    rows: Option<usize>,

    /// Write the final surface as a binary PPM image
    #[arg(long, value_name = "PATH")]
    ppm: Option<PathBuf>,

    /// Print the final state as JSON
    #[arg(short, long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::load_or_default(),
    };
    if let Some(cols) = args.cols {
        config.geometry.cols = cols;
    }
    if let Some(rows) = args.rows {
        config.geometry.rows = rows;
    }

    let input = match &args.input {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        }
    };

    let mut terminal = Terminal::with_config(&config);
    terminal.write(&input);
    for event in terminal.take_events() {
        tracing::debug!(?event, "terminal event");
    }

    if let Some(path) = &args.ppm {
        let result = File::create(path)
            .and_then(|file| terminal.surface_mut().write_ppm(BufWriter::new(file)));
        if let Err(e) = result {
            eprintln!("Error writing image '{}': {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    if args.json || args.ppm.is_none() {
        match terminal.snapshot().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    terminal.shutdown();
    ExitCode::SUCCESS
}
