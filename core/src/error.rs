/// Why a query could not be answered.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("unknown retrieval model '{0}' (expected \"boolean\" or \"vector\")")]
    UnknownModel(String),
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("vector model unavailable: {0}")]
    ModelUnavailable(String),
}

impl SearchError {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::UnknownModel(_) => "unknown_model",
            SearchError::IndexUnavailable(_) => "index_unavailable",
            SearchError::ModelUnavailable(_) => "model_unavailable",
        }
    }
}
