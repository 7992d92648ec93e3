use std::path::PathBuf;

use crate::error::AppError;

const DEFAULT_TABLE: &str = "food_advisor";
const DEFAULT_RECOMMENDATION_COUNT: usize = 5;
const MAX_RECOMMENDATION_COUNT: usize = 20;
const DEFAULT_INGEST_BATCH_SIZE: usize = 100;

/// Recommendation server configuration loaded explicitly from environment variables.
///
/// Language-model settings live in `OpenAiClientConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Filesystem path to the LanceDB data directory.
    pub lancedb_path: String,
    /// LanceDB table holding the recipe vectors.
    pub table_name: String,
    /// How many recipes to retrieve per request.
    pub recommendation_count: usize,
}

impl Config {
    /// Required:
    /// - `LANCEDB_PATH`
    ///
    /// Optional:
    /// - `RECIPE_TABLE` (default: "food_advisor")
    /// - `RECOMMENDATION_COUNT` (default: 5, between 1 and 20)
    pub fn from_env() -> Result<Self, AppError> {
        let lancedb_path = lancedb_path()?;
        let table_name = table_name();

        let recommendation_count = match std::env::var("RECOMMENDATION_COUNT") {
            Ok(raw) => parse_count(&raw)?,
            Err(_) => DEFAULT_RECOMMENDATION_COUNT,
        };

        Ok(Self {
            lancedb_path,
            table_name,
            recommendation_count,
        })
    }
}

/// Configuration for the one-time CSV ingestion job.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub lancedb_path: String,
    pub table_name: String,
    pub csv_path: PathBuf,
    /// Rows embedded and written per index call.
    pub batch_size: usize,
}

impl IngestConfig {
    /// Required:
    /// - `LANCEDB_PATH`
    /// - the CSV path, as `csv_arg` (first CLI argument) or `RECIPES_CSV`
    ///
    /// Optional:
    /// - `RECIPE_TABLE` (default: "food_advisor")
    /// - `INGEST_BATCH_SIZE` (default: 100)
    pub fn from_env(csv_arg: Option<String>) -> Result<Self, AppError> {
        let lancedb_path = lancedb_path()?;

        let csv_path = csv_arg
            .or_else(|| std::env::var("RECIPES_CSV").ok())
            .map(PathBuf::from)
            .ok_or_else(|| {
                AppError::Config(
                    "recipes CSV path is required (first argument or RECIPES_CSV)".to_string(),
                )
            })?;
        if !csv_path.exists() {
            return Err(AppError::Config(format!(
                "recipes CSV not found at {}",
                csv_path.display()
            )));
        }

        let batch_size = match std::env::var("INGEST_BATCH_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    AppError::Config(format!("INGEST_BATCH_SIZE must be a positive integer, got '{raw}'"))
                })?,
            Err(_) => DEFAULT_INGEST_BATCH_SIZE,
        };

        Ok(Self {
            lancedb_path,
            table_name: table_name(),
            csv_path,
            batch_size,
        })
    }
}

fn lancedb_path() -> Result<String, AppError> {
    std::env::var("LANCEDB_PATH")
        .map_err(|_| AppError::Config("LANCEDB_PATH environment variable is required".to_string()))
}

fn table_name() -> String {
    std::env::var("RECIPE_TABLE")
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TABLE.to_string())
}

fn parse_count(raw: &str) -> Result<usize, AppError> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_RECOMMENDATION_COUNT).contains(n))
        .ok_or_else(|| {
            AppError::Config(format!(
                "RECOMMENDATION_COUNT must be between 1 and {MAX_RECOMMENDATION_COUNT}, got '{raw}'"
            ))
        })
}
