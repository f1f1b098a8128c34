use crate::persist::{save_doc_id_map, save_manifest, save_matrix, save_vectorizer, ArtifactPaths, ModelManifest, FORMAT_VERSION};
use crate::store::IndexStore;
use crate::tokenizer::Normalizer;
use crate::vector::{TfidfVectorizer, VectorConfig};
use crate::DocId;
use anyhow::{bail, Result};
use std::path::Path;

/// Fit the TF-IDF model over every stored document and write the artifacts.
///
/// Documents are read in ascending id order; row `i` of the matrix belongs
/// to the `i`-th id of the saved mapping.
pub fn train_vector_model(
    index_dir: &Path,
    out: &ArtifactPaths,
    normalizer: &Normalizer,
    config: VectorConfig,
) -> Result<ModelManifest> {
    let format = match IndexStore::format(index_dir)? {
        Some(format) if format.complete => format,
        _ => bail!("no persisted index at {}; run the index build first", index_dir.display()),
    };
    if format.stem != normalizer.stem_language() {
        bail!(
            "index at {} was built with stemming {:?} but training uses {:?}",
            index_dir.display(),
            format.stem,
            normalizer.stem_language()
        );
    }
    let documents = {
        let store = IndexStore::open(index_dir)?;
        store.documents()?
    };
    if documents.is_empty() {
        bail!("index at {} holds no documents", index_dir.display());
    }
    tracing::info!(documents = documents.len(), "training vector model");

    let doc_ids: Vec<DocId> = documents.iter().map(|d| d.doc_id).collect();
    let tokenized: Vec<Vec<String>> = documents.iter().map(|d| normalizer.normalize(&d.raw_text)).collect();
    let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&tokenized, config);

    save_vectorizer(out, &vectorizer)?;
    save_matrix(out, &matrix)?;
    save_doc_id_map(out, &doc_ids)?;
    let manifest = ModelManifest {
        documents: doc_ids.len(),
        vocabulary: vectorizer.vocabulary_len(),
        config,
        stem: normalizer.stem_language(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_manifest(out, &manifest)?;

    tracing::info!(documents = manifest.documents, vocabulary = manifest.vocabulary, path = %out.root.display(), "vector model saved");
    Ok(manifest)
}
