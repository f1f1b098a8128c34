use serde::{Deserialize, Serialize};

/// Externally assigned, positive document identifier.
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub title: String,
    pub author: Option<String>,
    /// Number of significant terms produced by the normalizer for `raw_text`.
    pub total_terms: u32,
    /// Verbatim source text, kept for training the vector model.
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub term: String,
    pub doc_id: DocId,
    pub term_frequency: u32,
}

/// Collection-wide statistics for one term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub total_occurrences: u64,
    pub document_frequency: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub max_doc_id: DocId,
    pub total_terms: u64,
    pub total_documents: u32,
}
