//! docvault CLI - Command line interface for a docvault document store
//!
//! Each subcommand maps onto one document operation and prints a JSON result
//! on stdout. Logs go to stderr and are controlled by `RUST_LOG`.

use clap::{Parser, Subcommand};
use docvault::{DocumentId, DocumentService, Error, VaultConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docvault")]
#[command(about = "A filesystem-backed document store")]
#[command(version)]
struct Cli {
    /// Vault root directory [default: <user data dir>/docvault]
    #[arg(short, long, env = "DOCVAULT_ROOT")]
    root: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vault
    Init {
        /// Also write a docvault.json with the default layout
        #[arg(long)]
        write_config: bool,
    },

    /// Upload a file
    Upload {
        /// File to upload
        path: PathBuf,
        /// Stored filename (defaults to the file's own name)
        #[arg(short, long)]
        name: Option<String>,
        /// MIME type of the content
        #[arg(short = 't', long)]
        content_type: Option<String>,
    },

    /// List all documents
    List {
        /// Maximum number of documents to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Download a document
    Download {
        /// The document ID
        id: String,
        /// Write the content here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a document
    Delete {
        /// The document ID
        id: String,
    },

    /// Liveness check
    Health,

    /// Show vault status
    Status,

    /// Check the index against the blob directory
    Check {
        /// Remove blobs that no document references
        #[arg(long)]
        prune_orphans: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.root.clone().unwrap_or_else(VaultConfig::default_root);

    match cli.command {
        Commands::Init { write_config } => {
            let config = VaultConfig::load(&root)?;
            if write_config {
                config.save()?;
            }
            let vault = DocumentService::init(config)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Initialized vault at {}", root.display()),
                    "documents": vault.list().len()
                }),
            )?;
        }

        Commands::Upload {
            path,
            name,
            content_type,
        } => {
            let vault = open_vault(&root)?;
            let filename = match name {
                Some(name) => name,
                None => file_name_of(&path)?,
            };
            let bytes = std::fs::read(&path)?;
            let doc = vault.upload(filename, content_type, &bytes)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "message": "File uploaded",
                    "id": doc.id.to_string()
                }),
            )?;
        }

        Commands::List { limit } => {
            let vault = open_vault(&root)?;
            let mut docs = vault.list();
            if let Some(limit) = limit {
                docs.truncate(limit);
            }
            output(&cli.format, &serde_json::to_value(&docs)?)?;
        }

        Commands::Download { id, output: dest } => {
            let vault = open_vault(&root)?;
            let doc_id = DocumentId::new(&id);
            let download = match vault.download(&doc_id) {
                Ok(download) => download,
                Err(e) if e.is_not_found() => not_found(&cli.format, &id, &e),
                Err(e) => return Err(e.into()),
            };

            match dest {
                Some(dest) => {
                    std::fs::write(&dest, &download.bytes)?;
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "ok",
                            "id": id,
                            "filename": download.filename,
                            "content_type": download
                                .content_type
                                .as_deref()
                                .unwrap_or("application/octet-stream"),
                            "size": download.bytes.len(),
                            "path": dest.display().to_string()
                        }),
                    )?;
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&download.bytes)?;
                    stdout.flush()?;
                }
            }
        }

        Commands::Delete { id } => {
            let vault = open_vault(&root)?;
            match vault.delete(&DocumentId::new(&id)) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => not_found(&cli.format, &id, &e),
                Err(e) => return Err(e.into()),
            }
            output(
                &cli.format,
                &serde_json::json!({
                    "message": "File deleted",
                    "id": id
                }),
            )?;
        }

        Commands::Health => {
            output(&cli.format, &serde_json::json!({ "status": "ok" }))?;
        }

        Commands::Status => {
            let vault = open_vault(&root)?;
            output(&cli.format, &serde_json::to_value(vault.stats())?)?;
        }

        Commands::Check { prune_orphans } => {
            let vault = open_vault(&root)?;
            let report = vault.check()?;
            let pruned = if prune_orphans {
                vault.prune_orphans()?
            } else {
                vec![]
            };
            output(
                &cli.format,
                &serde_json::json!({
                    "clean": report.is_clean(),
                    "report": report,
                    "pruned": pruned.iter().map(|k| k.to_string()).collect::<Vec<_>>()
                }),
            )?;
        }
    }

    Ok(())
}

fn open_vault(root: &Path) -> anyhow::Result<DocumentService> {
    Ok(DocumentService::open_root(root)?)
}

fn file_name_of(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("Cannot take a file name from {}", path.display()))
}

fn not_found(format: &OutputFormat, id: &str, err: &Error) -> ! {
    let message = match err {
        Error::MissingBlob { .. } => "File missing",
        _ => "Not found",
    };
    let _ = output(
        format,
        &serde_json::json!({
            "error": message,
            "id": id
        }),
    );
    std::process::exit(1);
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Text => serde_json::to_string_pretty(value)?,
    };
    println!("{}", rendered);
    Ok(())
}
