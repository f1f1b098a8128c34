#![allow(dead_code)]

use retrieval_core::builder::{build_index, DocumentDescriptor, IndexSummary};
use retrieval_core::tokenizer::Normalizer;
use retrieval_core::DocId;
use std::collections::HashMap;
use std::path::Path;

pub fn normalizer() -> Normalizer {
    Normalizer::new(["de", "em", "o", "a", "e", "do", "da"])
}

pub fn collection() -> (Vec<DocumentDescriptor>, HashMap<DocId, String>) {
    let docs = [
        (1, "Redes de Computadores", Some("Tanenbaum"), "redes de computadores"),
        (2, "Segurança", None, "segurança em redes"),
        (3, "Bancos de Dados", Some("Date"), "banco de dados"),
    ];
    let descriptors = docs
        .iter()
        .map(|(id, title, author, _)| DocumentDescriptor {
            doc_id: Some(*id),
            title: Some(title.to_string()),
            author: author.map(str::to_string),
        })
        .collect();
    let texts = docs.iter().map(|(id, _, _, text)| (*id, text.to_string())).collect();
    (descriptors, texts)
}

pub fn build_example(index_dir: &Path) -> IndexSummary {
    let (descriptors, texts) = collection();
    build_index(index_dir, &descriptors, &texts, &normalizer()).unwrap()
}
