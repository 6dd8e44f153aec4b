use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use payrecon::application::checkout::CheckoutService;
use payrecon::application::dispatcher::CallbackDispatcher;
use payrecon::application::engine::ReconciliationEngine;
use payrecon::application::settings::{payment_method_options, validate_configuration};
use payrecon::config::GatewayConfig;
use payrecon::domain::ports::{OrderStoreBox, PaymentStoreBox, ProviderClient};
use payrecon::infrastructure::in_memory::{InMemoryOrderStore, InMemoryPaymentStore};
use payrecon::infrastructure::paynl::PaynlClient;
use payrecon::interfaces::csv::notification_reader::NotificationReader;
use payrecon::interfaces::csv::payment_writer::PaymentWriter;
use payrecon::interfaces::http;
use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayConfig,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve payment start and the provider callbacks over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
    /// Re-process notifications listed in a CSV file with a transaction_id column
    Replay {
        input: PathBuf,

        /// Print all payment records as CSV when done
        #[arg(long)]
        report: bool,
    },
    /// List the payment methods available as default
    Methods,
    /// Check the configured credentials against the provider
    Validate,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Hands out store handles that all share the same underlying data.
type StoreFactory = Box<dyn Fn() -> (PaymentStoreBox, OrderStoreBox)>;

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<StoreFactory> {
    use payrecon::infrastructure::rocksdb::RocksDBStore;

    if let Some(db_path) = db_path {
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        return Ok(Box::new(move || -> (PaymentStoreBox, OrderStoreBox) {
            (Box::new(store.clone()), Box::new(store.clone()))
        }));
    }
    Ok(in_memory_stores())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<StoreFactory> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> StoreFactory {
    let payments = InMemoryPaymentStore::new();
    let orders = InMemoryOrderStore::new();
    Box::new(move || -> (PaymentStoreBox, OrderStoreBox) {
        (Box::new(payments.clone()), Box::new(orders.clone()))
    })
}

fn provider_client(config: &GatewayConfig) -> Result<Option<PaynlClient>> {
    PaynlClient::from_config(config).into_diagnostic()
}

fn require_provider(config: &GatewayConfig) -> Result<PaynlClient> {
    provider_client(config)?.ok_or_else(|| {
        miette!("token code, API token and service id must all be configured")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            let provider = require_provider(&cli.gateway)?;
            let stores = open_stores(cli.db_path)?;

            let (payments, orders) = stores();
            let engine = ReconciliationEngine::new(payments, orders);
            let dispatcher = Arc::new(CallbackDispatcher::new(Box::new(provider.clone()), engine));

            let (payments, orders) = stores();
            let checkout = Arc::new(CheckoutService::new(
                Box::new(provider),
                payments,
                orders,
                &cli.gateway,
            ));

            let listener = tokio::net::TcpListener::bind(bind).await.into_diagnostic()?;
            info!(%bind, "serving payment callbacks");
            axum::serve(listener, http::router(dispatcher, checkout))
                .await
                .into_diagnostic()?;
        }
        Command::Replay { input, report } => {
            let provider = require_provider(&cli.gateway)?;
            let stores = open_stores(cli.db_path)?;
            let (payments, orders) = stores();
            let dispatcher =
                CallbackDispatcher::new(Box::new(provider), ReconciliationEngine::new(payments, orders));

            let file = File::open(input).into_diagnostic()?;
            let reader = NotificationReader::new(file);
            for record in reader.notifications() {
                match record {
                    Ok(record) => match dispatcher.handle_notify(&record.transaction_id).await {
                        Ok(ack) => println!("{}: {}", record.transaction_id, ack),
                        Err(e) => {
                            eprintln!("Error processing notification {}: {}", record.transaction_id, e)
                        }
                    },
                    Err(e) => {
                        eprintln!("Error reading notification: {}", e);
                    }
                }
            }

            if report {
                let all = dispatcher.engine().all_payments().await.into_diagnostic()?;
                let stdout = io::stdout();
                let mut writer = PaymentWriter::new(stdout.lock());
                writer.write_payments(all).into_diagnostic()?;
            }
        }
        Command::Methods => {
            let client = provider_client(&cli.gateway)?;
            let methods =
                payment_method_options(client.as_ref().map(|c| c as &dyn ProviderClient)).await;
            for method in methods {
                println!("{}\t{}", method.id, method.name);
            }
        }
        Command::Validate => {
            let client = provider_client(&cli.gateway)?;
            let errors =
                validate_configuration(&cli.gateway, client.as_ref().map(|c| c as &dyn ProviderClient))
                    .await;
            if !errors.is_empty() {
                for error in &errors {
                    eprintln!("{}", error);
                }
                return Err(miette!("configuration has {} problem(s)", errors.len()));
            }
            println!("Configuration OK");
        }
    }

    Ok(())
}
