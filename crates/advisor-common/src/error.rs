/// Error types shared by the food advisor crates.
///
/// These cover the infrastructure collaborators (vector DB, embeddings). Application
/// errors are defined in the application crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("vector db error: {0}")]
    VectorDb(String),

    #[error("embedding error: {0}")]
    Embedding(String),
}
