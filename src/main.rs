//! blobctl - command line access to a configured blob store.
//!
//! The backend comes from `--config <file.json>` when given, otherwise from
//! the `BLOBSTORE_*` environment variables.

use anyhow::{Context, Result};
use blob_store::{Backend, Blob, BlobStore, StoreConfig};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blobctl")]
#[command(about = "Store and fetch named blobs with their content-type")]
#[command(version)]
struct Cli {
    /// JSON store configuration; falls back to BLOBSTORE_* variables
    #[arg(short, long, env = "BLOBSTORE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file under a name, replacing any previous blob
    Put {
        /// Blob name
        name: String,
        /// File to upload
        path: PathBuf,
        /// MIME type; guessed from the file extension when omitted
        #[arg(short = 't', long)]
        content_type: Option<String>,
    },

    /// Write a blob's bytes to a file or stdout
    Get {
        /// Blob name
        name: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete every blob in the store
    Reset,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "blob_store=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StoreConfig::from_env().context("failed to read BLOBSTORE_* configuration")?,
    };
    let store = Backend::open(&config).context("failed to open blob store")?;

    match cli.command {
        Commands::Put {
            name,
            path,
            content_type,
        } => {
            let content_type = content_type.unwrap_or_else(|| {
                mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            store
                .put(Blob::new(name.clone(), BufReader::new(file), content_type.clone()))
                .with_context(|| format!("failed to store {name}"))?;
            eprintln!("stored {name} ({content_type})");
        }

        Commands::Get { name, output } => {
            let Some(blob) = store
                .get(&name)
                .with_context(|| format!("failed to read {name}"))?
            else {
                eprintln!("no blob named {name}");
                return Ok(ExitCode::FAILURE);
            };
            let content_type = blob.content_type().to_string();
            let mut content = blob.into_content();
            match output {
                Some(path) => {
                    let mut file = File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    io::copy(&mut content, &mut file)?;
                }
                None => {
                    let mut stdout = io::stdout().lock();
                    io::copy(&mut content, &mut stdout)?;
                    stdout.flush()?;
                }
            }
            eprintln!("{name}: {content_type}");
        }

        Commands::Reset => {
            store.delete_all().context("failed to delete blobs")?;
            eprintln!("deleted all blobs");
        }
    }

    Ok(ExitCode::SUCCESS)
}
