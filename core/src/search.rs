use crate::boolean::boolean_search;
use crate::error::SearchError;
use crate::persist::ArtifactPaths;
use crate::ranker::VectorModel;
use crate::store::IndexStore;
use crate::tokenizer::Normalizer;
use crate::{DocId, Document};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchModel {
    Boolean,
    Vector,
}

impl FromStr for SearchModel {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, SearchError> {
        match s.trim().to_lowercase().as_str() {
            "boolean" => Ok(SearchModel::Boolean),
            "vector" => Ok(SearchModel::Vector),
            _ => Err(SearchError::UnknownModel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub author: Option<String>,
    pub score: f32,
}

/// Query-time context: built once at startup and shared by every query.
///
/// The persisted index is opened and closed per call; the vector model is
/// held for the lifetime of the searcher.
pub struct Searcher {
    index_dir: PathBuf,
    normalizer: Normalizer,
    vector: Option<VectorModel>,
}

impl Searcher {
    pub fn new<P: AsRef<Path>>(index_dir: P, normalizer: Normalizer, vector: Option<VectorModel>) -> Self {
        Self { index_dir: index_dir.as_ref().to_path_buf(), normalizer, vector }
    }

    /// Like [`Searcher::new`], loading the vector model from `artifacts`.
    /// A missing or inconsistent model degrades vector search to empty results.
    pub fn open<P: AsRef<Path>>(index_dir: P, artifacts: &ArtifactPaths, normalizer: Normalizer) -> Self {
        let vector = match VectorModel::load(artifacts) {
            Ok(model) if model.stem_language() != normalizer.stem_language() => {
                tracing::warn!(
                    model = ?model.stem_language(),
                    queries = ?normalizer.stem_language(),
                    "vector model was trained with a different stemmer; vector search disabled"
                );
                None
            }
            Ok(model) => Some(model),
            Err(err) => {
                tracing::warn!(error = %err, "vector search disabled");
                None
            }
        };
        Self::new(index_dir, normalizer, vector)
    }

    pub fn has_vector_model(&self) -> bool { self.vector.is_some() }

    /// Run `query` with the model named `model` ("boolean" or "vector").
    pub fn search(&self, query: &str, model: &str) -> Result<Vec<SearchHit>, SearchError> {
        let model: SearchModel = model.parse()?;
        self.search_with(query, model)
    }

    pub fn search_with(&self, query: &str, model: SearchModel) -> Result<Vec<SearchHit>, SearchError> {
        let store = self.open_index()?;
        let raw: Vec<(DocId, f32)> = match model {
            SearchModel::Boolean => boolean_search(query, &self.normalizer, &store)
                .map_err(unavailable)?
                .into_iter()
                .map(|doc_id| (doc_id, 1.0))
                .collect(),
            SearchModel::Vector => match &self.vector {
                Some(vector) => vector.rank(query, &self.normalizer),
                None => {
                    tracing::warn!(query, "vector model unavailable; returning no results");
                    Vec::new()
                }
            },
        };
        let hits = enrich(&store, raw)?;
        tracing::debug!(query, ?model, hits = hits.len(), "search complete");
        Ok(hits)
    }

    pub fn document(&self, doc_id: DocId) -> Result<Option<Document>, SearchError> {
        self.open_index()?.document(doc_id).map_err(unavailable)
    }

    fn open_index(&self) -> Result<IndexStore, SearchError> {
        IndexStore::open(&self.index_dir).map_err(unavailable)
    }
}

fn unavailable(err: anyhow::Error) -> SearchError {
    SearchError::IndexUnavailable(format!("{err:#}"))
}

/// Attach title and author. Ids without a stored document are dropped.
fn enrich(store: &IndexStore, raw: Vec<(DocId, f32)>) -> Result<Vec<SearchHit>, SearchError> {
    let mut hits = Vec::with_capacity(raw.len());
    for (doc_id, score) in raw {
        match store.document(doc_id).map_err(unavailable)? {
            Some(doc) => hits.push(SearchHit { doc_id, title: doc.title, author: doc.author, score }),
            None => tracing::debug!(doc_id, "dropping result without a stored document"),
        }
    }
    Ok(hits)
}
