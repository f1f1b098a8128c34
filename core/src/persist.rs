use crate::tokenizer::StemLanguage;
use crate::vector::{DocTermMatrix, TfidfVectorizer, VectorConfig};
use crate::DocId;
use anyhow::{Context, Result};
use bincode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

/// Human-readable description of a trained vector model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub documents: usize,
    pub vocabulary: usize,
    pub config: VectorConfig,
    /// Stemmer the training texts were normalized with; queries must use the same.
    #[serde(default)]
    pub stem: Option<StemLanguage>,
    pub created_at: String,
    pub version: u32,
}

/// File layout of the vector-space artifacts.
pub struct ArtifactPaths {
    pub root: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn vectorizer(&self) -> PathBuf { self.root.join("vectorizer.bin") }
    fn matrix(&self) -> PathBuf { self.root.join("tfidf_matrix.bin") }
    fn doc_id_map(&self) -> PathBuf { self.root.join("doc_id_map.bin") }
    fn manifest(&self) -> PathBuf { self.root.join("model.json") }

    /// True when all three co-versioned blobs are on disk.
    pub fn complete(&self) -> bool {
        self.vectorizer().is_file() && self.matrix().is_file() && self.doc_id_map().is_file()
    }
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf).with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

pub fn save_vectorizer(paths: &ArtifactPaths, vectorizer: &TfidfVectorizer) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(&paths.vectorizer(), vectorizer)
}

pub fn load_vectorizer(paths: &ArtifactPaths) -> Result<TfidfVectorizer> {
    read_bincode(&paths.vectorizer())
}

pub fn save_matrix(paths: &ArtifactPaths, matrix: &DocTermMatrix) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(&paths.matrix(), matrix)
}

pub fn load_matrix(paths: &ArtifactPaths) -> Result<DocTermMatrix> {
    read_bincode(&paths.matrix())
}

pub fn save_doc_id_map(paths: &ArtifactPaths, map: &[DocId]) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(&paths.doc_id_map(), &map)
}

pub fn load_doc_id_map(paths: &ArtifactPaths) -> Result<Vec<DocId>> {
    read_bincode(&paths.doc_id_map())
}

pub fn save_manifest(paths: &ArtifactPaths, manifest: &ModelManifest) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.manifest())?;
    let json = serde_json::to_string_pretty(manifest)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_manifest(paths: &ArtifactPaths) -> Result<ModelManifest> {
    let mut f = File::open(paths.manifest())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let manifest: ModelManifest = serde_json::from_str(&buf)?;
    Ok(manifest)
}

/// The manifest of a trained model, `None` when no model has been trained.
/// A manifest that exists but cannot be read is an error.
pub fn load_manifest_if_trained(paths: &ArtifactPaths) -> Result<Option<ModelManifest>> {
    if !paths.complete() {
        return Ok(None);
    }
    let manifest = load_manifest(paths).with_context(|| format!("reading {}", paths.manifest().display()))?;
    Ok(Some(manifest))
}

/// Load the three blobs that must be used together.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<(TfidfVectorizer, DocTermMatrix, Vec<DocId>)> {
    let vectorizer = load_vectorizer(paths)?;
    let matrix = load_matrix(paths)?;
    let doc_ids = load_doc_id_map(paths)?;
    Ok((vectorizer, matrix, doc_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unreadable_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        assert!(load_manifest_if_trained(&paths).unwrap().is_none());

        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&[vec!["redes".to_string()]], VectorConfig::default());
        save_vectorizer(&paths, &vectorizer).unwrap();
        save_matrix(&paths, &matrix).unwrap();
        save_doc_id_map(&paths, &[1]).unwrap();
        fs::write(paths.manifest(), "{ not json").unwrap();
        assert!(load_manifest_if_trained(&paths).is_err());

        let manifest = ModelManifest {
            documents: 1,
            vocabulary: 1,
            config: VectorConfig::default(),
            stem: Some(StemLanguage::Portuguese),
            created_at: String::new(),
            version: FORMAT_VERSION,
        };
        save_manifest(&paths, &manifest).unwrap();
        assert_eq!(load_manifest_if_trained(&paths).unwrap(), Some(manifest));
    }
}
