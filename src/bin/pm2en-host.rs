use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pubmed2endnote::config::DEFAULT_HELPER_NAME;
use pubmed2endnote::host::{manifest_for, serve_once, ClipboardSink, FileSink, RecordSink};

/// Native helper that receives one PubMed record and places it on the clipboard.
#[derive(Parser, Debug)]
#[command(name = "pm2en-host", version, long_about = None)]
struct Args {
    /// Calling origin, passed by the browser when it launches the helper
    origin: Option<String>,

    /// Write the record to this file instead of the clipboard
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a host manifest for this executable and exit
    #[arg(long)]
    print_manifest: bool,

    /// Origin allowed to launch the helper (repeatable, used with --print-manifest)
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,

    /// Manifest name (used with --print-manifest)
    #[arg(long, default_value = DEFAULT_HELPER_NAME)]
    name: String,

    /// Window handle passed by Chrome on Windows
    #[arg(long, hide = true)]
    parent_window: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is the message channel, so logs must stay on stderr.
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    if args.print_manifest {
        let program = std::env::current_exe().context("Failed to locate helper executable")?;
        let manifest = manifest_for(&args.name, program, args.allowed_origins);
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    info!(origin = ?args.origin, "Helper started");

    let sink: Box<dyn RecordSink> = match args.output {
        Some(path) => Box::new(FileSink::new(path)),
        None => Box::new(ClipboardSink::new()),
    };

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    if serve_once(&mut stdin, &mut stdout, sink.as_ref()).await? {
        sink.finish()?;
    }

    info!("Helper exiting");
    Ok(())
}
