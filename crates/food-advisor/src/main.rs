use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use advisor_common::embedding::Embedder;
use advisor_common::openai::{OpenAiClient, OpenAiClientConfig};
use advisor_common::vectordb::VectorDb;
use food_advisor::config::Config;
use food_advisor::llm::LanguageModel;
use food_advisor::pipeline::Recommender;
use food_advisor::search::LanceRecipeIndex;
use food_advisor::server::FoodAdvisorServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing to stderr (stdout is reserved for MCP JSON-RPC)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting food-advisor MCP server");

    // 1. Load config from environment
    let config = Config::from_env()?;
    let llm_config = OpenAiClientConfig::from_env();
    info!(
        lancedb_path = %config.lancedb_path,
        table = %config.table_name,
        recommendation_count = config.recommendation_count,
        model = %llm_config.model,
        base_url = %llm_config.base_url,
        "configuration loaded"
    );
    if llm_config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set, requests go out unauthenticated");
    }

    // 2. Language model client
    let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(llm_config)?);

    // 3. Initialize embedding model
    info!("initializing embedding model (may download on first run)");
    let embedder = Arc::new(Embedder::new().await?);
    info!("embedding model ready");

    // 4. Connect to LanceDB
    let vectordb = Arc::new(VectorDb::connect(&config.lancedb_path).await?);
    info!("lancedb connected");
    if !vectordb.table_exists(&config.table_name).await? {
        warn!(
            table = %config.table_name,
            "recipe table not found; run ingest-recipes first or searches will fail"
        );
    }

    // 5. Build the recommendation pipeline
    let index = Arc::new(LanceRecipeIndex::new(
        embedder,
        vectordb,
        config.table_name.clone(),
    ));
    let recommender = Arc::new(Recommender::new(llm, index, config.recommendation_count));

    // 6. Build MCP server and serve on stdio
    let server = FoodAdvisorServer::new(recommender);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
