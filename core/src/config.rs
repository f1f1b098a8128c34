use crate::persist::ArtifactPaths;
use crate::store::IndexStore;
use crate::tokenizer::{Normalizer, StemLanguage};
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Conventional layout of a data directory:
///
/// ```text
/// data/
///   metadata.json   collection descriptors
///   texts/{id}.txt  raw document texts
///   stopwords.txt   one stop word per line
///   index/          persisted index
///   model/          vector-space artifacts
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub metadata: PathBuf,
    pub texts: PathBuf,
    pub stopwords: PathBuf,
    pub index: PathBuf,
    pub model: PathBuf,
}

impl DataPaths {
    pub fn from_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            metadata: root.join("metadata.json"),
            texts: root.join("texts"),
            stopwords: root.join("stopwords.txt"),
            index: root.join("index"),
            model: root.join("model"),
        }
    }

    pub fn artifacts(&self) -> ArtifactPaths { ArtifactPaths::new(&self.model) }

    /// Normalizer matching the built index: stop words from `stopwords`, and
    /// the stemmer recorded by the index unless `stem` names one. A `stem`
    /// that contradicts the index is an error.
    pub fn normalizer(&self, stem: Option<StemLanguage>) -> Result<Normalizer> {
        let normalizer = Normalizer::from_stopword_file(&self.stopwords)?;
        let stem = match IndexStore::format(&self.index)? {
            Some(format) if format.complete => match stem {
                Some(requested) if format.stem != Some(requested) => bail!(
                    "index at {} was built with stemming {:?}, not {:?}",
                    self.index.display(),
                    format.stem,
                    requested
                ),
                _ => format.stem,
            },
            _ => stem,
        };
        Ok(match stem {
            Some(language) => normalizer.with_stemming(language),
            None => normalizer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_index, DocumentDescriptor};
    use crate::DocId;
    use std::collections::HashMap;
    use std::fs;

    #[test]
    fn resolves_conventional_names() {
        let p = DataPaths::from_root("/srv/data");
        assert_eq!(p.metadata, PathBuf::from("/srv/data/metadata.json"));
        assert_eq!(p.texts, PathBuf::from("/srv/data/texts"));
        assert_eq!(p.artifacts().root, PathBuf::from("/srv/data/model"));
    }

    #[test]
    fn normalizer_follows_the_recorded_stemmer() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::from_root(dir.path());
        fs::write(&paths.stopwords, "de\n").unwrap();
        assert_eq!(paths.normalizer(Some(StemLanguage::Spanish)).unwrap().stem_language(), Some(StemLanguage::Spanish));

        let descs = [DocumentDescriptor { doc_id: Some(1), title: Some("Redes".into()), author: None }];
        let texts = HashMap::<DocId, String>::from([(1, "redes de computadores".into())]);
        let stemmed = Normalizer::new(["de"]).with_stemming(StemLanguage::Portuguese);
        build_index(&paths.index, &descs, &texts, &stemmed).unwrap();

        assert_eq!(paths.normalizer(None).unwrap().stem_language(), Some(StemLanguage::Portuguese));
        assert_eq!(
            paths.normalizer(Some(StemLanguage::Portuguese)).unwrap().stem_language(),
            Some(StemLanguage::Portuguese)
        );
        assert!(paths.normalizer(Some(StemLanguage::English)).is_err());
    }
}
