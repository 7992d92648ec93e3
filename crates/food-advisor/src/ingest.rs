/// One-time ingestion of the recipes CSV into the LanceDB recipe table.
///
/// Each row becomes a document: its description is embedded, everything else is stored as
/// metadata under the field names in `model::fields`. Rows are written in fixed-size
/// batches and upserted by a deterministic id, so re-running the job does not duplicate.
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arrow_array::{ArrayRef, FixedSizeListArray, Float32Array, Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::AppError;
use crate::model::fields;
use advisor_common::embedding::{Embedder, EMBEDDING_DIMENSIONS};
use advisor_common::error::CommonError;
use advisor_common::vectordb::VectorDb;

/// One CSV row. Empty cells deserialize to empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeRow {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "TotalTime", default)]
    pub total_time: String,
    #[serde(rename = "RecipeCategory", default)]
    pub category: String,
    #[serde(rename = "Keywords", default)]
    pub keywords: String,
    #[serde(rename = "Ingredients", default)]
    pub ingredients: String,
    #[serde(rename = "Calories", default)]
    pub calories: String,
    #[serde(rename = "CarbohydratePercentage", default)]
    pub carbohydrate_percentage: String,
    #[serde(rename = "ProteinPercentage", default)]
    pub protein_percentage: String,
    #[serde(rename = "FatPercentage", default)]
    pub fat_percentage: String,
    #[serde(rename = "SugarPercentage", default)]
    pub sugar_percentage: String,
    #[serde(rename = "RecipeInstructions", default)]
    pub instructions: String,
    #[serde(rename = "RecipeYield", default)]
    pub yields: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

/// A row ready to be embedded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDocument {
    pub id: String,
    pub name: String,
    pub time: String,
    pub category: String,
    pub keywords: String,
    pub ingredients: String,
    pub calories: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub proteins: Option<f64>,
    pub fat: Option<f64>,
    pub sugar: Option<f64>,
    pub instructions: String,
    pub yields: String,
    /// Embedded payload.
    pub text: String,
}

impl RecipeDocument {
    pub fn from_row(position: usize, row: RecipeRow) -> Self {
        Self {
            id: document_id(position, &row.name),
            calories: numeric_cell(position, "Calories", &row.calories),
            carbohydrates: numeric_cell(position, "CarbohydratePercentage", &row.carbohydrate_percentage),
            proteins: numeric_cell(position, "ProteinPercentage", &row.protein_percentage),
            fat: numeric_cell(position, "FatPercentage", &row.fat_percentage),
            sugar: numeric_cell(position, "SugarPercentage", &row.sugar_percentage),
            name: row.name,
            time: row.total_time,
            category: row.category,
            keywords: row.keywords,
            ingredients: row.ingredients,
            instructions: row.instructions,
            yields: row.yields,
            text: row.description,
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub rows: usize,
    pub batches: usize,
    pub elapsed: Duration,
}

/// Read every row of the recipes CSV.
pub fn load_rows(path: &Path) -> Result<Vec<RecipeRow>, AppError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(&e))?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<RecipeRow>() {
        rows.push(result.map_err(|e| csv_error(&e))?);
    }
    info!(path = %path.display(), rows = rows.len(), "loaded recipes csv");
    Ok(rows)
}

fn csv_error(e: &csv::Error) -> AppError {
    AppError::Csv {
        line: e.position().map(|p| p.line()).unwrap_or(0),
        message: e.to_string(),
    }
}

/// Deterministic id from the row's position and name.
pub fn document_id(position: usize, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(position.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Empty cells become `None`. Unparseable cells are logged and stored as `None`.
fn numeric_cell(position: usize, column: &str, raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(row = position, column, value = raw, "non-numeric cell stored as null");
            None
        }
    }
}

pub struct IngestService {
    embedder: Arc<Embedder>,
    vectordb: Arc<VectorDb>,
    table: String,
    batch_size: usize,
}

impl IngestService {
    pub fn new(embedder: Arc<Embedder>, vectordb: Arc<VectorDb>, table: impl Into<String>, batch_size: usize) -> Self {
        Self {
            embedder,
            vectordb,
            table: table.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Embed and upsert all rows, `batch_size` at a time.
    pub async fn run(&self, rows: Vec<RecipeRow>) -> Result<IngestReport, AppError> {
        let documents: Vec<RecipeDocument> = rows
            .into_iter()
            .enumerate()
            .map(|(position, row)| RecipeDocument::from_row(position, row))
            .collect();

        let total_batches = documents.len().div_ceil(self.batch_size);
        info!(
            table = %self.table,
            documents = documents.len(),
            batches = total_batches,
            "uploading to vector db"
        );

        let started = Instant::now();
        for (i, chunk) in documents.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = chunk.iter().map(|d| d.text.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts).await?;
            let batch = build_record_batch(chunk, &embeddings)?;
            self.vectordb.upsert(&self.table, batch).await?;
            info!(batch = i + 1, of = total_batches, rows = chunk.len(), "batch upserted");
        }

        let report = IngestReport {
            rows: documents.len(),
            batches: total_batches,
            elapsed: started.elapsed(),
        };
        info!(
            rows = report.rows,
            elapsed = %format!("{:.2}s", report.elapsed.as_secs_f64()),
            "upload complete"
        );
        Ok(report)
    }
}

/// Build an Arrow RecordBatch from documents and their embeddings.
pub fn build_record_batch(documents: &[RecipeDocument], embeddings: &[Vec<f32>]) -> Result<RecordBatch, AppError> {
    let embedding_dim = EMBEDDING_DIMENSIONS as i32;

    if embeddings.len() != documents.len() {
        return Err(AppError::Common(CommonError::Embedding(format!(
            "embedding count mismatch: expected {}, got {}",
            documents.len(),
            embeddings.len()
        ))));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != EMBEDDING_DIMENSIONS) {
        return Err(AppError::Common(CommonError::Embedding(format!(
            "embedding has {} dimensions, expected {EMBEDDING_DIMENSIONS}",
            bad.len()
        ))));
    }

    let text_column = |f: fn(&RecipeDocument) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(documents.iter().map(f).collect::<Vec<_>>()))
    };
    let number_column = |f: fn(&RecipeDocument) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(documents.iter().map(f).collect::<Vec<_>>()))
    };

    let flat_values: Vec<f32> = embeddings.iter().flat_map(|e| e.iter().copied()).collect();
    let embedding_array: ArrayRef = Arc::new(
        FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            embedding_dim,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| AppError::Common(CommonError::VectorDb(format!("failed to build embedding array: {e}"))))?,
    );

    let schema = Arc::new(Schema::new(vec![
        Field::new(fields::ID, DataType::Utf8, false),
        Field::new(fields::NAME, DataType::Utf8, false),
        Field::new(fields::TIME, DataType::Utf8, false),
        Field::new(fields::CATEGORY, DataType::Utf8, false),
        Field::new(fields::KEYWORDS, DataType::Utf8, false),
        Field::new(fields::INGREDIENTS, DataType::Utf8, false),
        Field::new(fields::CALORIES, DataType::Float64, true),
        Field::new(fields::CARBOHYDRATES, DataType::Float64, true),
        Field::new(fields::PROTEINS, DataType::Float64, true),
        Field::new(fields::FAT, DataType::Float64, true),
        Field::new(fields::SUGAR, DataType::Float64, true),
        Field::new(fields::INSTRUCTIONS, DataType::Utf8, false),
        Field::new(fields::YIELDS, DataType::Utf8, false),
        Field::new(fields::TEXT, DataType::Utf8, false),
        Field::new(
            fields::EMBEDDING,
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), embedding_dim),
            false,
        ),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            text_column(|d| d.id.as_str()),
            text_column(|d| d.name.as_str()),
            text_column(|d| d.time.as_str()),
            text_column(|d| d.category.as_str()),
            text_column(|d| d.keywords.as_str()),
            text_column(|d| d.ingredients.as_str()),
            number_column(|d| d.calories),
            number_column(|d| d.carbohydrates),
            number_column(|d| d.proteins),
            number_column(|d| d.fat),
            number_column(|d| d.sugar),
            text_column(|d| d.instructions.as_str()),
            text_column(|d| d.yields.as_str()),
            text_column(|d| d.text.as_str()),
            embedding_array,
        ],
    )
    .map_err(|e| AppError::Common(CommonError::VectorDb(format!("failed to build record batch: {e}"))))
}
