use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use aegis_interchange::{export_to_writer, import_interchange, pubkey_from_hex};
use aegis_protection::SigningGuard;
use aegis_storage::{ProtectionStore, backend::RocksDBBackend};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod metrics_api;

const ASCII_ART: &str = r#"
                    _
  __ _  ___  __ _(_)___
 / _` |/ _ \/ _` | / __|
| (_| |  __/ (_| | \__ \
 \__,_|\___|\__, |_|___/
            |___/
"#;

#[derive(Debug, clap::Parser)]
#[command(name = "aegis", about = "Slashing-protection history tooling")]
struct CliOptions {
    /// Path to the protection database directory.
    #[arg(long)]
    db: PathBuf,
    /// Serve prometheus metrics on this address while the command runs.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Import an interchange file, reporting skipped entries and rejected keys.
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Export the complete signing history as an interchange file.
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// Print one key's recorded signing history.
    Inspect {
        #[arg(long)]
        pubkey: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let options = CliOptions::parse();

    println!("{ASCII_ART}");

    if let Some(address) = options.metrics_address {
        tokio::spawn(metrics_api::serve(address));
    }

    let backend = RocksDBBackend::open(&options.db).expect("Failed to open protection database");
    let store = ProtectionStore::new(Arc::new(backend));

    match options.command {
        Command::Import { file } => {
            let guard = SigningGuard::new(store);
            let reader = File::open(&file).expect("Failed to open interchange file");
            let report = import_interchange(&guard, reader).expect("Import failed");

            println!(
                "Imported {} keys: {} blocks, {} attestations",
                report.imported_keys, report.accepted_blocks, report.accepted_attestations
            );
            for skipped in &report.skipped {
                println!("  skipped ({}): {:?}", skipped.pubkey, skipped.record);
            }
            for rejected in &report.rejected_keys {
                println!("  rejected {}: {}", rejected.pubkey, rejected.reason);
            }
        }
        Command::Export { out } => {
            let writer = File::create(&out).expect("Failed to create output file");
            export_to_writer(&store, writer).expect("Export failed");
            println!("Exported protection history to {}", out.display());
        }
        Command::Inspect { pubkey } => {
            let pubkey = pubkey_from_hex(&pubkey).expect("Invalid pubkey");
            let blocks = store.signed_blocks(&pubkey).expect("Failed to read blocks");
            let attestations = store
                .signed_attestations(&pubkey)
                .expect("Failed to read attestations");

            println!("{} signed blocks:", blocks.len());
            for block in blocks {
                println!("  slot {} root {}", block.slot, block.signing_root);
            }
            println!("{} signed attestations:", attestations.len());
            for attestation in attestations {
                println!(
                    "  source {} target {} root {}",
                    attestation.source, attestation.target, attestation.signing_root
                );
            }
        }
    }
}
