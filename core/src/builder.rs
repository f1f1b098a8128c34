use crate::store::IndexStore;
use crate::tokenizer::Normalizer;
use crate::{CollectionMetadata, DocId, Document, TermEntry};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// One entry of the collection descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentDescriptor {
    #[serde(default, alias = "DocumentId")]
    pub doc_id: Option<DocId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Where the raw text of a document lives.
pub trait TextStore {
    fn read_text(&self, doc_id: DocId) -> io::Result<String>;
}

/// Texts stored as `{doc_id}.txt` inside one directory.
pub struct DirTextStore {
    root: PathBuf,
}

impl DirTextStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn path_for(&self, doc_id: DocId) -> PathBuf { self.root.join(format!("{doc_id}.txt")) }
}

impl TextStore for DirTextStore {
    fn read_text(&self, doc_id: DocId) -> io::Result<String> {
        fs::read_to_string(self.path_for(doc_id))
    }
}

impl TextStore for HashMap<DocId, String> {
    fn read_text(&self, doc_id: DocId) -> io::Result<String> {
        self.get(&doc_id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no text for document {doc_id}")))
    }
}

/// Counts reported after a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub documents: u32,
    pub terms: usize,
    pub postings: usize,
    pub total_terms: u64,
    pub skipped: usize,
}

/// Read the descriptor file: a JSON array of `{DocId, Title, Author}` objects.
///
/// A missing or malformed file is fatal. Entries that do not decode are
/// skipped with a warning.
pub fn load_descriptors<P: AsRef<Path>>(path: P) -> Result<Vec<DocumentDescriptor>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("collection descriptor file not found at {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let serde_json::Value::Array(entries) = json else {
        bail!("{} must contain a JSON array of documents", path.display());
    };
    let mut out = Vec::with_capacity(entries.len());
    for (pos, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<DocumentDescriptor>(entry) {
            Ok(desc) => out.push(desc),
            Err(err) => tracing::warn!(position = pos, error = %err, "skipping undecodable document descriptor"),
        }
    }
    Ok(out)
}

/// Build a fresh index at `index_dir`, discarding whatever was there.
pub fn build_index<T: TextStore + ?Sized>(
    index_dir: &Path,
    descriptors: &[DocumentDescriptor],
    texts: &T,
    normalizer: &Normalizer,
) -> Result<IndexSummary> {
    let store = IndexStore::create(index_dir)?;
    tracing::info!(documents = descriptors.len(), path = %index_dir.display(), "building index");

    // Accumulators
    let mut occurrences: BTreeMap<String, u64> = BTreeMap::new();
    let mut docs_per_term: BTreeMap<String, BTreeSet<DocId>> = BTreeMap::new();
    let mut seen: HashSet<DocId> = HashSet::new();
    let mut meta = CollectionMetadata::default();
    let mut postings = 0usize;
    let mut skipped = 0usize;

    for desc in descriptors {
        let (doc_id, title) = match (desc.doc_id, desc.title.as_deref()) {
            (Some(id), Some(title)) if id > 0 && !title.trim().is_empty() => (id, title),
            _ => {
                tracing::warn!(?desc, "skipping document with incomplete descriptor");
                skipped += 1;
                continue;
            }
        };
        if !seen.insert(doc_id) {
            tracing::warn!(doc_id, "skipping duplicate document id");
            skipped += 1;
            continue;
        }
        let raw_text = match texts.read_text(doc_id) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(doc_id, error = %err, "skipping document without readable text");
                skipped += 1;
                continue;
            }
        };

        let tokens = normalizer.normalize(&raw_text);
        let mut tf: BTreeMap<&str, u32> = BTreeMap::new();
        for token in &tokens {
            *tf.entry(token.as_str()).or_insert(0) += 1;
        }
        for (term, count) in &tf {
            *occurrences.entry((*term).to_string()).or_insert(0) += u64::from(*count);
            docs_per_term.entry((*term).to_string()).or_default().insert(doc_id);
        }

        let total_terms = tokens.len() as u32;
        store.put_document(&Document {
            doc_id,
            title: title.to_string(),
            author: desc.author.clone().filter(|a| !a.trim().is_empty()),
            total_terms,
            raw_text,
        })?;
        store.put_postings(doc_id, &tf)?;

        postings += tf.len();
        meta.max_doc_id = meta.max_doc_id.max(doc_id);
        meta.total_terms += u64::from(total_terms);
        meta.total_documents += 1;
        tracing::debug!(doc_id, title, terms = total_terms, "indexed document");
    }

    store.put_terms(docs_per_term.iter().map(|(term, ids)| {
        let entry = TermEntry {
            total_occurrences: occurrences.get(term).copied().unwrap_or(0),
            document_frequency: ids.len() as u32,
        };
        (term.as_str(), entry)
    }))?;
    if meta.total_documents > 0 {
        store.put_metadata(&meta)?;
    }
    store.seal(normalizer.stem_language())?;

    let summary = IndexSummary {
        documents: meta.total_documents,
        terms: docs_per_term.len(),
        postings,
        total_terms: meta.total_terms,
        skipped,
    };
    tracing::info!(
        documents = summary.documents,
        terms = summary.terms,
        postings = summary.postings,
        skipped = summary.skipped,
        "index build complete"
    );
    Ok(summary)
}
