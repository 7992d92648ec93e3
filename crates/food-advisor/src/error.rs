use advisor_common::error::CommonError;

use crate::parser::ParseError;
use crate::search::SearchError;
use crate::synthesizer::SynthesisError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("csv error at line {line}: {message}")]
    Csv { line: u64, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures that abort a recommendation request.
///
/// Per-record normalization failures are not here; they are reported next to the results.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("query synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("could not parse model response: {0}")]
    Parse(#[from] ParseError),

    #[error("recipe search failed: {0}")]
    Search(#[from] SearchError),
}
