/// LanceDB vector database wrapper.
///
/// Tables are keyed by a Utf8 `id` column and carry an `embedding`
/// FixedSizeList<Float32> column; every other column is treated as record metadata.
use arrow_array::{RecordBatch, RecordBatchIterator};
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::{debug, info};

use crate::error::CommonError;

pub struct VectorDb {
    db: lancedb::Connection,
}

impl VectorDb {
    /// Connect to a LanceDB database at the given filesystem path.
    pub async fn connect(path: &str) -> Result<Self, CommonError> {
        let db = lancedb::connect(path)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("connection failed: {e}")))?;
        Ok(Self { db })
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool, CommonError> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("listing tables failed: {e}")))?;
        Ok(names.iter().any(|n| n == table_name))
    }

    /// Insert or update one batch of rows, matching existing rows on `id`.
    ///
    /// Creates the table from the batch when it does not exist yet.
    pub async fn upsert(&self, table_name: &str, batch: RecordBatch) -> Result<(), CommonError> {
        let schema = batch.schema();
        let rows = batch.num_rows();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if !self.table_exists(table_name).await? {
            self.db
                .create_table(table_name, Box::new(reader))
                .execute()
                .await
                .map_err(|e| CommonError::VectorDb(format!("create table failed: {e}")))?;
            info!(table = table_name, rows, "vector table created");
            return Ok(());
        }

        let table = self
            .db
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("open table failed: {e}")))?;

        let mut merge = table.merge_insert(&["id"]);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| CommonError::VectorDb(format!("merge insert failed: {e}")))?;

        debug!(table = table_name, rows, "batch upserted");
        Ok(())
    }

    /// Search for the nearest vectors to the given query embedding.
    ///
    /// Returns up to `limit` rows, nearest first, with a `_distance` column added by LanceDB.
    pub async fn search(
        &self,
        table_name: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RecordBatch>, CommonError> {
        let table = self
            .db
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("open table failed: {e}")))?;

        let results = table
            .vector_search(query_embedding)
            .map_err(|e| CommonError::VectorDb(format!("vector search setup failed: {e}")))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("vector search failed: {e}")))?;

        futures::TryStreamExt::try_collect(results)
            .await
            .map_err(|e| CommonError::VectorDb(format!("collecting search results failed: {e}")))
    }
}
