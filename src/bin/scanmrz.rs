//! scanmrz - recognize MRZ text in an image file from the command line

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mrz_scanner::MrzScanner;

/// Public trial key; replace with a production key for real use.
const TRIAL_LICENSE: &str = "DLS2eyJoYW5kc2hha2VDb2RlIjoiMjAwMDAxLTE2NDk4Mjk3OTI2MzUiLCJvcmdhbml6YXRpb25JRCI6IjIwMDAwMSIsInNlc3Npb25QYXNzd29yZCI6IndTcGR6Vm05WDJrcEQ5YUoifQ==";

/// Scan MRZ information from an image file
#[derive(Parser, Debug)]
#[command(name = "scanmrz")]
#[command(about = "Scan MRZ information from an image file")]
struct Args {
    /// Path to the image file
    filename: String,

    /// Dynamsoft license key (trial key used if not provided)
    #[arg(short, long)]
    license: Option<String>,

    /// Recognition settings template file (embedded default if not provided)
    #[arg(short, long)]
    model: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    mrz_scanner::init_license(args.license.as_deref().unwrap_or(TRIAL_LICENSE))
        .context("license initialization failed")?;

    let scanner = MrzScanner::new().context("failed to create scanner instance")?;
    match &args.model {
        Some(path) => scanner
            .load_model_file(path)
            .context("failed to load settings template")?,
        None => scanner
            .load_model(mrz_scanner::default_template())
            .context("failed to load embedded settings template")?,
    }

    info!("engine version {}", scanner.engine_version());

    let results = scanner.decode_file(&args.filename);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No MRZ detected in the image");
        return Ok(());
    }

    println!("Found {} MRZ line(s):", results.len());
    for line in &results {
        println!("  [{:>3}] {}", line.confidence, line.text);
        println!(
            "        at ({}, {}) ({}, {}) ({}, {}) ({}, {})",
            line.x1, line.y1, line.x2, line.y2, line.x3, line.y3, line.x4, line.y4
        );
    }

    Ok(())
}
