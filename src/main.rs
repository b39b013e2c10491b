//! `unpaste` binary: retrieve and decrypt documents from paste services.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use unpaste::{default_table, HttpTransport, Pipeline};

#[derive(Parser)]
#[command(name = "unpaste", version, about = "Fetch pastes and reverse their client-side encryption")]
struct Cli {
    /// URLs to retrieve, processed in order
    #[arg(required = true)]
    urls: Vec<String>,

    /// Passphrase override; otherwise the URL fragment is used
    #[arg(short, long)]
    secret: Option<String>,

    /// File index to pick out of a multi-file bundle
    #[arg(long)]
    index: Option<usize>,

    /// Write plaintext to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Write one plaintext to the output target. The first write of a run
/// truncates the file; later writes append, so multiple URLs concatenate
/// without keeping a previous run's contents.
fn write_plaintext(output: Option<&PathBuf>, bytes: &[u8], first: bool) -> std::io::Result<()> {
    match output {
        Some(path) => {
            let mut options = File::options();
            options.create(true);
            if first {
                options.write(true).truncate(true);
            } else {
                options.append(true);
            }
            let mut file = options.open(path)?;
            file.write_all(bytes)
        }
        None => std::io::stdout().write_all(bytes),
    }
}

/// Exit status is the number of failed URLs, capped below the shell
/// specials (126+).
fn exit_status(failures: u32) -> u8 {
    failures.min(254) as u8
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // No URLs is a usage error; clap exits with status 2.
    let cli = Cli::parse();

    let transport = match HttpTransport::new() {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!(error = %e, "HTTP client setup failed");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = Pipeline::new(&transport, default_table());

    let mut failures: u32 = 0;
    let mut wrote_any = false;
    for url in &cli.urls {
        match pipeline.run(url, cli.secret.as_deref(), cli.index) {
            Ok(bytes) => {
                let result = write_plaintext(cli.output.as_ref(), &bytes, !wrote_any);
                wrote_any = true;
                if let Err(e) = result {
                    tracing::error!(url, error = %e, "writing plaintext failed");
                    failures += 1;
                }
            }
            Err(e) => {
                tracing::error!(url, error = %e, "retrieval failed");
                failures += 1;
            }
        }
    }

    ExitCode::from(exit_status(failures))
}
