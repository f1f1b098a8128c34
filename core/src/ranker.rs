use crate::error::SearchError;
use crate::persist::{load_artifacts, load_manifest, ArtifactPaths};
use crate::tokenizer::{Normalizer, StemLanguage};
use crate::vector::{DocTermMatrix, TfidfVectorizer};
use crate::DocId;
use std::collections::HashMap;

/// Scores at or below this are dropped from vector results.
pub const RELEVANCE_FLOOR: f32 = 0.01;

/// Matrix row <-> document id, in the order the matrix was built.
#[derive(Debug, Clone)]
pub struct DocRowMap {
    rows: Vec<DocId>,
    by_doc: HashMap<DocId, usize>,
}

impl DocRowMap {
    pub fn new(rows: Vec<DocId>) -> Result<Self, SearchError> {
        let mut by_doc = HashMap::with_capacity(rows.len());
        for (row, &doc_id) in rows.iter().enumerate() {
            if by_doc.insert(doc_id, row).is_some() {
                return Err(SearchError::ModelUnavailable(format!("document {doc_id} mapped to more than one row")));
            }
        }
        Ok(Self { rows, by_doc })
    }

    pub fn doc_id(&self, row: usize) -> Option<DocId> { self.rows.get(row).copied() }

    pub fn row(&self, doc_id: DocId) -> Option<usize> { self.by_doc.get(&doc_id).copied() }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

/// Trained vector space, loaded once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct VectorModel {
    vectorizer: TfidfVectorizer,
    matrix: DocTermMatrix,
    rows: DocRowMap,
    stem: Option<StemLanguage>,
}

impl VectorModel {
    /// Assemble a model, checking that the three parts agree with each other.
    pub fn from_parts(vectorizer: TfidfVectorizer, matrix: DocTermMatrix, doc_ids: Vec<DocId>) -> Result<Self, SearchError> {
        if matrix.len() != doc_ids.len() {
            return Err(SearchError::ModelUnavailable(format!(
                "matrix has {} rows but the document map has {} entries",
                matrix.len(),
                doc_ids.len()
            )));
        }
        if matrix.columns() != vectorizer.vocabulary_len() {
            return Err(SearchError::ModelUnavailable(format!(
                "matrix has {} columns but the vocabulary has {} terms",
                matrix.columns(),
                vectorizer.vocabulary_len()
            )));
        }
        let rows = DocRowMap::new(doc_ids)?;
        Ok(Self { vectorizer, matrix, rows, stem: None })
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self, SearchError> {
        if !paths.complete() {
            return Err(SearchError::ModelUnavailable(format!("no trained model in {}", paths.root.display())));
        }
        let (vectorizer, matrix, doc_ids) =
            load_artifacts(paths).map_err(|e| SearchError::ModelUnavailable(format!("{e:#}")))?;
        let manifest = load_manifest(paths).map_err(|e| SearchError::ModelUnavailable(format!("{e:#}")))?;
        let mut model = Self::from_parts(vectorizer, matrix, doc_ids)?;
        model.stem = manifest.stem;
        tracing::info!(documents = model.rows.len(), vocabulary = model.vectorizer.vocabulary_len(), "vector model loaded");
        Ok(model)
    }

    pub fn rows(&self) -> &DocRowMap { &self.rows }

    /// Stemmer the model was trained with.
    pub fn stem_language(&self) -> Option<StemLanguage> { self.stem }

    /// Documents ranked by cosine similarity to `query`, best first.
    /// Equal scores keep matrix row order.
    pub fn rank(&self, query: &str, normalizer: &Normalizer) -> Vec<(DocId, f32)> {
        let q = self.vectorizer.transform(&normalizer.normalize(query));
        if q.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(DocId, f32)> = self
            .matrix
            .cosine_scores(&q)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > RELEVANCE_FLOOR)
            .filter_map(|(row, score)| self.rows.doc_id(row).map(|doc_id| (doc_id, score)))
            .collect();
        // stable: ties stay in row order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}
