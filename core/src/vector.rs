//! TF-IDF vector space over pre-normalized token sequences.
//!
//! Vocabulary columns are assigned in lexicographic term order. Document and
//! query vectors are L2-normalized, so cosine similarity between them reduces
//! to a dot product, but [`cosine`] still divides by both norms.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sparse vector as (column, weight) pairs sorted by column.
pub type SparseVector = Vec<(u32, f32)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfWeighting {
    /// `ln((1 + N) / (1 + df)) + 1`
    #[default]
    Smooth,
    /// `ln(N / df) + 1`
    Plain,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorConfig {
    pub idf: IdfWeighting,
    /// Use `1 + ln(tf)` instead of raw counts.
    pub sublinear_tf: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorConfig,
    vocabulary: BTreeMap<String, u32>,
    idf: Vec<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocTermMatrix {
    columns: usize,
    rows: Vec<SparseVector>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and IDF weights from tokenized documents.
    pub fn fit(docs: &[Vec<String>], config: VectorConfig) -> Self {
        let mut df: BTreeMap<&str, u32> = BTreeMap::new();
        for tokens in docs {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }
        let n = docs.len() as f32;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(df.len());
        for (col, (term, df_t)) in df.into_iter().enumerate() {
            let df_t = df_t as f32;
            let weight = match config.idf {
                IdfWeighting::Smooth => ((1.0 + n) / (1.0 + df_t)).ln() + 1.0,
                IdfWeighting::Plain => (n / df_t).ln() + 1.0,
            };
            vocabulary.insert(term.to_string(), col as u32);
            idf.push(weight);
        }
        Self { config, vocabulary, idf }
    }

    pub fn fit_transform(docs: &[Vec<String>], config: VectorConfig) -> (Self, DocTermMatrix) {
        let vectorizer = Self::fit(docs, config);
        let rows = docs.iter().map(|tokens| vectorizer.transform(tokens)).collect();
        let matrix = DocTermMatrix { columns: vectorizer.vocabulary_len(), rows };
        (vectorizer, matrix)
    }

    /// Weight a token sequence with the fitted model. Unknown terms are ignored.
    pub fn transform(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for token in tokens {
            if let Some(&col) = self.vocabulary.get(token) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        let mut vec: SparseVector = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if self.config.sublinear_tf { 1.0 + (tf as f32).ln() } else { tf as f32 };
                (col, tf * self.idf[col as usize])
            })
            .collect();
        vec.sort_by_key(|(col, _)| *col);
        let norm = l2_norm(&vec);
        if norm > 0.0 {
            for (_, w) in vec.iter_mut() { *w /= norm; }
        }
        vec
    }

    pub fn vocabulary_len(&self) -> usize { self.vocabulary.len() }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary.get(term).map(|&col| self.idf[col as usize])
    }
}

impl DocTermMatrix {
    pub fn columns(&self) -> usize { self.columns }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn row(&self, i: usize) -> Option<&SparseVector> { self.rows.get(i) }

    /// Cosine similarity of `query` against every row, in row order.
    pub fn cosine_scores(&self, query: &SparseVector) -> Vec<f32> {
        self.rows.iter().map(|row| cosine(query, row)).collect()
    }
}

fn l2_norm(v: &SparseVector) -> f32 {
    v.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
}

pub fn cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    let (na, nb) = (l2_norm(a), l2_norm(b));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    // merge join over sorted columns
    let (mut i, mut j, mut dot) = (0, 0, 0.0f32);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    (dot / (na * nb)).min(1.0)
}
