//! Persisted index: four sled trees holding documents, the term dictionary,
//! postings and collection metadata.
//!
//! Key layout:
//! - `documents`: big-endian doc id -> bincode [`Document`]
//! - `terms`: term bytes -> bincode [`TermEntry`]
//! - `postings`: term bytes, `0x00`, big-endian doc id -> big-endian term frequency
//! - `metadata`: key name -> decimal string
//!
//! Big-endian ids make sled's byte ordering coincide with ascending doc ids.
//! An empty collection leaves every tree, metadata included, without rows.

use crate::tokenizer::StemLanguage;
use crate::{CollectionMetadata, DocId, Document, Posting, TermEntry};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

const DOCUMENTS: &str = "documents";
const TERMS: &str = "terms";
const POSTINGS: &str = "postings";
const METADATA: &str = "metadata";

pub const MAX_DOCUMENT_ID: &str = "MaxDocumentId";
pub const TOTAL_TERMS: &str = "TotalTerms";
pub const TOTAL_DOCUMENTS: &str = "TotalDocuments";

const SEPARATOR: u8 = 0;

/// Written next to the sled files so an index directory can be recognized.
const MARKER: &str = "INDEX_FORMAT";
const FORMAT_VERSION: u32 = 1;

/// Contents of the marker file. `complete` is only set once a build has flushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFormat {
    pub version: u32,
    pub complete: bool,
    #[serde(default)]
    pub stem: Option<StemLanguage>,
}

pub struct IndexStore {
    root: PathBuf,
    db: sled::Db,
    documents: sled::Tree,
    terms: sled::Tree,
    postings: sled::Tree,
    metadata: sled::Tree,
}

impl IndexStore {
    /// Discard any index at `root` and open an empty one in its place.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if root.exists() {
            ensure_store_dir(root)?;
            fs::remove_dir_all(root)
                .with_context(|| format!("removing previous index at {}", root.display()))?;
            tracing::info!(path = %root.display(), "removed previous index");
        }
        let store = Self::open_db(root)?;
        write_marker(root, &IndexFormat { version: FORMAT_VERSION, complete: false, stem: None })?;
        Ok(store)
    }

    /// Flush everything and mark the index complete. `stem` is the stemmer
    /// the terms were produced with.
    pub fn seal(&self, stem: Option<StemLanguage>) -> Result<()> {
        self.flush()?;
        write_marker(&self.root, &IndexFormat { version: FORMAT_VERSION, complete: true, stem })
    }

    /// Open a complete index. Fails when nothing, or only a partial build, is at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        match Self::format(root)? {
            Some(format) if format.complete => Self::open_db(root),
            Some(_) => bail!("index at {} was not completely built; rebuild it", root.display()),
            None => bail!("no persisted index at {}", root.display()),
        }
    }

    /// The marker of the index at `root`, if there is one.
    pub fn format<P: AsRef<Path>>(root: P) -> Result<Option<IndexFormat>> {
        let path = root.as_ref().join(MARKER);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let format = serde_json::from_str(&text).with_context(|| format!("decoding {}", path.display()))?;
        Ok(Some(format))
    }

    fn open_db(root: &Path) -> Result<Self> {
        let db = sled::Config::new()
            .path(root)
            .flush_every_ms(None)
            .open()
            .with_context(|| format!("opening index store at {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
            documents: db.open_tree(DOCUMENTS)?,
            terms: db.open_tree(TERMS)?,
            postings: db.open_tree(POSTINGS)?,
            metadata: db.open_tree(METADATA)?,
            db,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    // --- writes ---

    pub fn put_document(&self, doc: &Document) -> Result<()> {
        let bytes = bincode::serialize(doc)?;
        self.documents.insert(doc.doc_id.to_be_bytes(), bytes)?;
        Ok(())
    }

    /// Write every posting of one document.
    pub fn put_postings(&self, doc_id: DocId, frequencies: &BTreeMap<&str, u32>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for (term, tf) in frequencies {
            batch.insert(posting_key(term, doc_id), tf.to_be_bytes().to_vec());
        }
        self.postings.apply_batch(batch)?;
        Ok(())
    }

    pub fn put_terms<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, TermEntry)>,
    {
        let mut batch = sled::Batch::default();
        for (term, entry) in entries {
            batch.insert(term.as_bytes(), bincode::serialize(&entry)?);
        }
        self.terms.apply_batch(batch)?;
        Ok(())
    }

    pub fn put_metadata(&self, meta: &CollectionMetadata) -> Result<()> {
        let mut batch = sled::Batch::default();
        batch.insert(MAX_DOCUMENT_ID.as_bytes(), meta.max_doc_id.to_string().as_bytes());
        batch.insert(TOTAL_TERMS.as_bytes(), meta.total_terms.to_string().as_bytes());
        batch.insert(TOTAL_DOCUMENTS.as_bytes(), meta.total_documents.to_string().as_bytes());
        self.metadata.apply_batch(batch)?;
        Ok(())
    }

    // --- reads ---

    pub fn document(&self, doc_id: DocId) -> Result<Option<Document>> {
        match self.documents.get(doc_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All documents in ascending id order.
    pub fn documents(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(self.documents.len());
        for entry in self.documents.iter() {
            let (_, bytes) = entry?;
            docs.push(bincode::deserialize(&bytes)?);
        }
        Ok(docs)
    }

    pub fn doc_ids(&self) -> Result<BTreeSet<DocId>> {
        let mut ids = BTreeSet::new();
        for key in self.documents.iter().keys() {
            ids.insert(decode_doc_id(&key?)?);
        }
        Ok(ids)
    }

    pub fn document_count(&self) -> usize { self.documents.len() }

    pub fn term(&self, term: &str) -> Result<Option<TermEntry>> {
        match self.terms.get(term.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// The whole term dictionary, sorted by term.
    pub fn terms(&self) -> Result<Vec<(String, TermEntry)>> {
        let mut out = Vec::with_capacity(self.terms.len());
        for entry in self.terms.iter() {
            let (key, bytes) = entry?;
            let term = String::from_utf8(key.to_vec()).context("term key is not utf-8")?;
            out.push((term, bincode::deserialize(&bytes)?));
        }
        Ok(out)
    }

    pub fn term_count(&self) -> usize { self.terms.len() }

    /// (doc id, term frequency) for every document containing `term`, ascending by id.
    pub fn postings_for_term(&self, term: &str) -> Result<Vec<(DocId, u32)>> {
        let mut prefix = term.as_bytes().to_vec();
        prefix.push(SEPARATOR);
        let mut out = Vec::new();
        for entry in self.postings.scan_prefix(&prefix) {
            let (key, value) = entry?;
            let posting = decode_posting(&key, &value)?;
            out.push((posting.doc_id, posting.term_frequency));
        }
        Ok(out)
    }

    pub fn docs_for_term(&self, term: &str) -> Result<BTreeSet<DocId>> {
        Ok(self.postings_for_term(term)?.into_iter().map(|(doc_id, _)| doc_id).collect())
    }

    /// Every posting, ordered by (term, doc id).
    pub fn postings(&self) -> Result<Vec<Posting>> {
        let mut out = Vec::with_capacity(self.postings.len());
        for entry in self.postings.iter() {
            let (key, value) = entry?;
            out.push(decode_posting(&key, &value)?);
        }
        Ok(out)
    }

    pub fn posting_count(&self) -> usize { self.postings.len() }

    /// Collection statistics; all zero when none were written.
    pub fn metadata(&self) -> Result<CollectionMetadata> {
        if self.metadata.is_empty() {
            return Ok(CollectionMetadata::default());
        }
        Ok(CollectionMetadata {
            max_doc_id: self.metadata_value(MAX_DOCUMENT_ID)?,
            total_terms: self.metadata_value(TOTAL_TERMS)?,
            total_documents: self.metadata_value(TOTAL_DOCUMENTS)?,
        })
    }

    fn metadata_value<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        let bytes = self
            .metadata
            .get(key)?
            .with_context(|| format!("collection metadata is missing {key}"))?;
        let text = std::str::from_utf8(&bytes).context("metadata value is not utf-8")?;
        text.parse()
            .map_err(|_| anyhow::anyhow!("metadata {key} has invalid value '{text}'"))
    }
}

/// Refuse to wipe a directory that does not look like an index we created.
fn ensure_store_dir(root: &Path) -> Result<()> {
    if !root.is_dir() {
        bail!("{} exists and is not a directory", root.display());
    }
    let empty = fs::read_dir(root)?.next().is_none();
    if !empty && !root.join(MARKER).is_file() {
        bail!("{} is not an index directory; refusing to delete it", root.display());
    }
    Ok(())
}

fn write_marker(root: &Path, format: &IndexFormat) -> Result<()> {
    let json = serde_json::to_string(format)?;
    fs::write(root.join(MARKER), json)
        .with_context(|| format!("writing index marker in {}", root.display()))
}

fn posting_key(term: &str, doc_id: DocId) -> Vec<u8> {
    let mut key = Vec::with_capacity(term.len() + 5);
    key.extend_from_slice(term.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(&doc_id.to_be_bytes());
    key
}

fn decode_doc_id(bytes: &[u8]) -> Result<DocId> {
    let arr: [u8; 4] = bytes.try_into().context("malformed document key")?;
    Ok(DocId::from_be_bytes(arr))
}

fn decode_posting(key: &[u8], value: &[u8]) -> Result<Posting> {
    if key.len() < 6 || key[key.len() - 5] != SEPARATOR {
        bail!("malformed posting key");
    }
    let (term, rest) = key.split_at(key.len() - 5);
    let term = String::from_utf8(term.to_vec()).context("posting term is not utf-8")?;
    let doc_id = decode_doc_id(&rest[1..])?;
    let tf: [u8; 4] = value.try_into().context("malformed term frequency")?;
    Ok(Posting { term, doc_id, term_frequency: u32::from_be_bytes(tf) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_index;
    use crate::tokenizer::Normalizer;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn posting_keys_round_trip_and_prefix_scan() {
        let dir = tempdir().unwrap();
        let store = IndexStore::create(dir.path().join("index")).unwrap();
        let mut tf = BTreeMap::new();
        tf.insert("rede", 1);
        tf.insert("redes", 2);
        store.put_postings(7, &tf).unwrap();
        store.put_postings(300, &BTreeMap::from([("redes", 1)])).unwrap();

        // "rede" must not pick up "redes" postings
        assert_eq!(store.postings_for_term("rede").unwrap(), vec![(7, 1)]);
        assert_eq!(store.postings_for_term("redes").unwrap(), vec![(7, 2), (300, 1)]);
        assert!(store.postings_for_term("missing").unwrap().is_empty());
    }

    #[test]
    fn open_requires_existing_index() {
        let dir = tempdir().unwrap();
        assert!(IndexStore::open(dir.path().join("nothing")).is_err());
    }

    #[test]
    fn create_refuses_foreign_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        assert!(IndexStore::create(dir.path()).is_err());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn unsealed_index_cannot_be_opened_but_can_be_rebuilt() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("index");
        {
            let store = IndexStore::create(&root).unwrap();
            store.put_postings(1, &BTreeMap::from([("redes", 1)])).unwrap();
            store.flush().unwrap();
        }
        assert_eq!(IndexStore::format(&root).unwrap().map(|f| f.complete), Some(false));
        assert!(IndexStore::open(&root).is_err());

        let store = IndexStore::create(&root).unwrap();
        store.seal(Some(StemLanguage::Portuguese)).unwrap();
        drop(store);
        let format = IndexStore::format(&root).unwrap().unwrap();
        assert!(format.complete);
        assert_eq!(format.stem, Some(StemLanguage::Portuguese));
        assert_eq!(IndexStore::open(&root).unwrap().posting_count(), 0);
    }

    #[test]
    fn empty_collection_writes_no_metadata_rows() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("index");
        build_index(&root, &[], &HashMap::<DocId, String>::new(), &Normalizer::new(["de"])).unwrap();

        let store = IndexStore::open(&root).unwrap();
        assert!(store.metadata.is_empty());
        assert_eq!(store.metadata().unwrap(), CollectionMetadata::default());
    }
}
