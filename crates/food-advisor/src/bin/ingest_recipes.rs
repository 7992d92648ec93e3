use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use advisor_common::embedding::Embedder;
use advisor_common::vectordb::VectorDb;
use food_advisor::config::IngestConfig;
use food_advisor::ingest::{self, IngestService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = IngestConfig::from_env(std::env::args().nth(1))?;
    info!(
        csv = %config.csv_path.display(),
        lancedb_path = %config.lancedb_path,
        table = %config.table_name,
        batch_size = config.batch_size,
        "starting recipe ingestion"
    );

    let rows = ingest::load_rows(&config.csv_path)?;

    info!("initializing embedding model (may download on first run)");
    let embedder = Arc::new(Embedder::new().await?);
    let vectordb = Arc::new(VectorDb::connect(&config.lancedb_path).await?);

    let service = IngestService::new(embedder, vectordb, config.table_name, config.batch_size);
    let report = service.run(rows).await?;

    info!(
        rows = report.rows,
        batches = report.batches,
        "Upload executed in {:.2} seconds.",
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
