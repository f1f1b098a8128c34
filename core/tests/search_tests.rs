mod common;

use retrieval_core::builder::build_index;
use retrieval_core::persist::{load_manifest, ArtifactPaths};
use retrieval_core::ranker::{VectorModel, RELEVANCE_FLOOR};
use retrieval_core::tokenizer::StemLanguage;
use retrieval_core::train::train_vector_model;
use retrieval_core::vector::VectorConfig;
use retrieval_core::{DocId, SearchError, SearchHit, SearchModel, Searcher};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tempfile::tempdir;

fn searcher(root: &Path) -> Searcher {
    let index = root.join("index");
    let model = ArtifactPaths::new(root.join("model"));
    common::build_example(&index);
    train_vector_model(&index, &model, &common::normalizer(), VectorConfig::default()).unwrap();
    Searcher::open(&index, &model, common::normalizer())
}

fn ids(hits: &[SearchHit]) -> Vec<DocId> {
    hits.iter().map(|h| h.doc_id).collect()
}

#[test]
fn boolean_example_queries() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());

    let hits = s.search("redes AND segurança", "boolean").unwrap();
    assert_eq!(ids(&hits), vec![2]);
    assert_eq!(hits[0].title, "Segurança");
    assert_eq!(hits[0].author, None);
    assert_eq!(hits[0].score, 1.0);

    let hits = s.search("redes", "boolean").unwrap();
    assert_eq!(ids(&hits), vec![1, 2]);
    assert_eq!(hits[0].author.as_deref(), Some("Tanenbaum"));
}

#[test]
fn boolean_set_algebra_matches_single_term_results() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());
    let single = |t: &str| -> BTreeSet<DocId> { ids(&s.search(t, "boolean").unwrap()).into_iter().collect() };
    let query = |q: &str| -> Vec<DocId> { ids(&s.search(q, "boolean").unwrap()) };

    let (a, b) = (single("redes"), single("computadores"));
    assert_eq!(query("redes AND computadores"), a.intersection(&b).copied().collect::<Vec<_>>());
    assert_eq!(query("redes OR dados"), a.union(&single("dados")).copied().collect::<Vec<_>>());
    assert_eq!(query("redes AND NOT computadores"), a.difference(&b).copied().collect::<Vec<_>>());
    assert_eq!(query("NOT redes"), vec![3]);
}

#[test]
fn vector_example_query() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());
    assert!(s.has_vector_model());

    let hits = s.search("redes", "vector").unwrap();
    assert_eq!(ids(&hits), vec![1, 2]);
    assert!(hits.iter().all(|h| h.score > RELEVANCE_FLOOR && h.score <= 1.0));
}

#[test]
fn vector_results_are_ordered_and_deterministic() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());
    let first = s.search("segurança de redes e dados", "vector").unwrap();
    assert!(!first.is_empty());
    assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(s.search("segurança de redes e dados", "vector").unwrap(), first);
}

#[test]
fn own_text_ranks_its_document_first() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());
    for (id, text) in [(1, "redes de computadores"), (2, "segurança em redes"), (3, "banco de dados")] {
        let hits = s.search(text, "vector").unwrap();
        let top = hits[0].score;
        let own = hits.iter().find(|h| h.doc_id == id).unwrap();
        assert!((own.score - top).abs() < 1e-6, "document {id} should score highest for its own text");
    }
}

#[test]
fn unknown_model_is_an_error_value() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());
    assert_eq!(
        s.search("redes", "desconhecido"),
        Err(SearchError::UnknownModel("desconhecido".into()))
    );
}

#[test]
fn untrained_model_degrades_to_empty_results() {
    let dir = tempdir().unwrap();
    let index = dir.path().join("index");
    common::build_example(&index);
    let s = Searcher::open(&index, &ArtifactPaths::new(dir.path().join("model")), common::normalizer());
    assert!(!s.has_vector_model());
    assert!(s.search("redes", "vector").unwrap().is_empty());
    assert_eq!(ids(&s.search("redes", "boolean").unwrap()), vec![1, 2]);
}

#[test]
fn stale_vector_results_are_dropped_during_enrichment() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());

    // rebuild the index without document 1, keeping the old vector model loaded
    let (descs, texts) = common::collection();
    let remaining: Vec<_> = descs.into_iter().filter(|d| d.doc_id != Some(1)).collect();
    build_index(&dir.path().join("index"), &remaining, &texts, &common::normalizer()).unwrap();

    assert_eq!(ids(&s.search_with("redes", SearchModel::Vector).unwrap()), vec![2]);
}

#[test]
fn training_requires_an_index_with_documents() {
    let dir = tempdir().unwrap();
    let index = dir.path().join("index");
    let model = ArtifactPaths::new(dir.path().join("model"));
    assert!(train_vector_model(&index, &model, &common::normalizer(), VectorConfig::default()).is_err());

    build_index(&index, &[], &HashMap::<DocId, String>::new(), &common::normalizer()).unwrap();
    assert!(train_vector_model(&index, &model, &common::normalizer(), VectorConfig::default()).is_err());
    assert!(!model.complete());
}

#[test]
fn training_rejects_a_stemmer_the_index_was_not_built_with() {
    let dir = tempdir().unwrap();
    let index = dir.path().join("index");
    let model = ArtifactPaths::new(dir.path().join("model"));
    common::build_example(&index);
    let stemmed = common::normalizer().with_stemming(StemLanguage::Portuguese);
    assert!(train_vector_model(&index, &model, &stemmed, VectorConfig::default()).is_err());
    assert!(!model.complete());
}

#[test]
fn model_trained_with_another_stemmer_is_not_used() {
    let dir = tempdir().unwrap();
    let index = dir.path().join("index");
    let model = ArtifactPaths::new(dir.path().join("model"));
    let stemmed = || common::normalizer().with_stemming(StemLanguage::Portuguese);
    let (descriptors, texts) = common::collection();
    build_index(&index, &descriptors, &texts, &stemmed()).unwrap();
    let manifest = train_vector_model(&index, &model, &stemmed(), VectorConfig::default()).unwrap();
    assert_eq!(manifest.stem, Some(StemLanguage::Portuguese));

    let matching = Searcher::open(&index, &model, stemmed());
    assert!(matching.has_vector_model());
    assert_eq!(ids(&matching.search("redes", "vector").unwrap()), vec![1, 2]);

    let plain = Searcher::open(&index, &model, common::normalizer());
    assert!(!plain.has_vector_model());
    assert!(plain.search("redes", "vector").unwrap().is_empty());
}

#[test]
fn trained_artifacts_reload_consistently() {
    let dir = tempdir().unwrap();
    let _ = searcher(dir.path());
    let paths = ArtifactPaths::new(dir.path().join("model"));
    let manifest = load_manifest(&paths).unwrap();
    assert_eq!(manifest.documents, 3);
    assert_eq!(manifest.vocabulary, 5);

    let model = VectorModel::load(&paths).unwrap();
    assert_eq!(model.stem_language(), None);
    assert_eq!(model.rows().len(), 3);
    assert_eq!(model.rows().doc_id(0), Some(1));
}

#[test]
fn document_lookup() {
    let dir = tempdir().unwrap();
    let s = searcher(dir.path());
    let doc = s.document(3).unwrap().unwrap();
    assert_eq!(doc.raw_text, "banco de dados");
    assert!(s.document(42).unwrap().is_none());
}
