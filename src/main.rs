mod bootstrap;
mod config;
mod error;
mod reconcile;
mod schedule;
mod sources;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

// Initialize logging; stdout is reserved for the JSON output
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting debt reconciler");

    let config = Config::from_env()?;

    let reconciliation = bootstrap::run(&config).await?;

    println!("{}", bootstrap::render(&reconciliation)?);

    info!(
        "✓ Emitted {} debts ({} paid off)",
        reconciliation.debts.len(),
        reconciliation.debts.iter().filter(|d| d.is_paid_off()).count()
    );

    Ok(())
}
