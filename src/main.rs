use campus_orders::application::service::OrderService;
use campus_orders::domain::money::Money;
use campus_orders::domain::ports::OrderStoreBox;
use campus_orders::domain::pricing::{PricingConfig, PricingEngine};
use campus_orders::error::{InputError, OrderError};
use campus_orders::infrastructure::in_memory::{InMemoryCatalog, InMemoryOrderStore};
#[cfg(feature = "storage-rocksdb")]
use campus_orders::infrastructure::rocksdb::RocksDBStore;
use campus_orders::interfaces::csv::CatalogReader;
use campus_orders::interfaces::jsonl::{CommandReader, Response, ResponseWriter};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-lines file of commands to execute, one per line
    commands: PathBuf,

    /// Product catalog CSV file (id,name,price,available)
    #[arg(long)]
    catalog: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Orders with a smaller subtotal are rejected
    #[arg(long, default_value = "2.00")]
    minimum_order: Decimal,

    /// Flat delivery fee added to every order
    #[arg(long, default_value = "1.00")]
    delivery_fee: Decimal,
}

fn init_tracing() {
    // Logs go to stderr so stdout carries only responses. Override with RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<OrderStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(&path).into_diagnostic()?;
            info!(path = %path.display(), "using RocksDB order store");
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryOrderStore::new()))
        }
        None => Ok(Box::new(InMemoryOrderStore::new())),
    }
}

fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let file = File::open(path).into_diagnostic()?;
    let products = CatalogReader::new(file)
        .products()
        .collect::<std::result::Result<Vec<_>, _>>()
        .into_diagnostic()?;
    let unique: HashSet<_> = products.iter().map(|p| p.id).collect();
    if unique.len() != products.len() {
        warn!(
            duplicates = products.len() - unique.len(),
            "catalog repeats product ids; the last row wins"
        );
    }
    info!(products = unique.len(), "catalog loaded");
    Ok(InMemoryCatalog::from_products(products))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let pricing = PricingEngine::new(PricingConfig {
        minimum_order: Money::new(cli.minimum_order),
        delivery_fee: Money::new(cli.delivery_fee),
    });
    let catalog = load_catalog(&cli.catalog)?;
    let store = open_store(cli.db_path)?;
    let service = OrderService::new(Box::new(catalog), store, pricing);

    // Execute commands in file order
    let file = File::open(cli.commands).into_diagnostic()?;
    let reader = CommandReader::new(BufReader::new(file));
    let stdout = io::stdout();
    let mut writer = ResponseWriter::new(stdout.lock());

    for command in reader.commands() {
        match command {
            Ok(command) => {
                let response = command.execute(&service).await;
                writer.write_response(&response).into_diagnostic()?;
            }
            Err(InputError::MalformedCommand { line, op, source }) => {
                warn!(line, op, "Error reading command: {}", source);
                let err = OrderError::ValidationError(source.to_string());
                writer
                    .write_response(&Response::failure(op, &err))
                    .into_diagnostic()?;
            }
            Err(e) => {
                warn!("Error reading command: {}", e);
            }
        }
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}
