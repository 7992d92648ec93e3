/// Similarity search over the recipe index.
///
/// Embeds the synthesized query with fastembed, runs a vector search in LanceDB and hands
/// each hit back as an opaque metadata mapping. Ranking is whatever the index returns.
use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, RecordBatch, StringArray,
};
use arrow_schema::DataType;
use async_trait::async_trait;
use serde_json::{Number, Value};
use tracing::info;

use crate::model::{fields, RawRecipeRecord};
use advisor_common::embedding::Embedder;
use advisor_common::error::CommonError;
use advisor_common::vectordb::VectorDb;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("{0}")]
    Index(String),
}

/// Nearest-neighbour lookup returning up to `k` records, best match first.
#[async_trait]
pub trait RecipeIndex: Send + Sync {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RawRecipeRecord>, SearchError>;
}

pub struct LanceRecipeIndex {
    embedder: Arc<Embedder>,
    vectordb: Arc<VectorDb>,
    table: String,
}

impl LanceRecipeIndex {
    pub fn new(embedder: Arc<Embedder>, vectordb: Arc<VectorDb>, table: impl Into<String>) -> Self {
        Self {
            embedder,
            vectordb,
            table: table.into(),
        }
    }
}

#[async_trait]
impl RecipeIndex for LanceRecipeIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RawRecipeRecord>, SearchError> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let batches = self.vectordb.search(&self.table, &query_embedding, k).await?;
        let records = extract_records(&batches);
        info!(table = %self.table, requested = k, returned = records.len(), "similarity search complete");
        Ok(records)
    }
}

/// Convert LanceDB result batches into one metadata mapping per row, in row order.
///
/// The embedding column is dropped; every other column is kept under its own name.
pub fn extract_records(batches: &[RecordBatch]) -> Vec<RawRecipeRecord> {
    let mut records = Vec::new();

    for batch in batches {
        let schema = batch.schema();
        for row in 0..batch.num_rows() {
            let mut record = RawRecipeRecord::new();
            for (field, column) in schema.fields().iter().zip(batch.columns()) {
                if field.name() == fields::EMBEDDING {
                    continue;
                }
                record.insert(field.name().clone(), column_value(column, row));
            }
            records.push(record);
        }
    }

    records
}

fn column_value(column: &ArrayRef, row: usize) -> Value {
    if column.is_null(row) {
        return Value::Null;
    }
    let any = column.as_any();
    let value = match column.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| Value::String(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| Value::String(a.value(row).to_string())),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .and_then(|a| Number::from_f64(a.value(row) as f64))
            .map(Value::Number),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .and_then(|a| Number::from_f64(a.value(row)))
            .map(Value::Number),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Value::from(a.value(row))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Value::from(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| Value::Bool(a.value(row))),
        _ => None,
    };
    value.unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::{Field, Schema};
    use serde_json::json;

    #[test]
    fn test_extract_records_keeps_metadata_and_order() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("fat percentage", DataType::Float64, true),
            Field::new("embedding", DataType::Float32, false),
            Field::new("_distance", DataType::Float32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["Pancakes", "Waffles"])),
                Arc::new(Float64Array::from(vec![Some(0.25), None])),
                Arc::new(Float32Array::from(vec![1.0, 2.0])),
                Arc::new(Float32Array::from(vec![0.5, 0.75])),
            ],
        )
        .unwrap();

        let records = extract_records(&[batch]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], json!("Pancakes"));
        assert_eq!(records[0]["fat percentage"], json!(0.25));
        assert_eq!(records[0]["_distance"], json!(0.5));
        assert!(records[0].get("embedding").is_none());
        assert_eq!(records[1]["name"], json!("Waffles"));
        assert_eq!(records[1]["fat percentage"], Value::Null);
    }

    #[test]
    fn test_empty_result_yields_no_records() {
        assert!(extract_records(&[]).is_empty());
    }
}
