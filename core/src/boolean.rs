//! Boolean retrieval: `term [AND|OR|NOT term ...]` evaluated as set algebra
//! over the postings, strictly left to right.
//!
//! Two simplifications are deliberate and covered by tests:
//! - each segment between operators contributes only its first normalized
//!   term, so `redes sem fio AND x` searches for `redes AND x`;
//! - a leading `NOT term` complements that one term against the whole
//!   collection and ignores the rest of the query.

use crate::store::IndexStore;
use crate::tokenizer::Normalizer;
use crate::DocId;
use anyhow::Result;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    AndNot,
}

impl Operator {
    fn keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("and") {
            Some(Operator::And)
        } else if word.eq_ignore_ascii_case("or") {
            Some(Operator::Or)
        } else if word.eq_ignore_ascii_case("not") {
            Some(Operator::Not)
        } else {
            None
        }
    }

    fn apply(self, acc: BTreeSet<DocId>, docs: &BTreeSet<DocId>) -> BTreeSet<DocId> {
        match self {
            Operator::And => acc.intersection(docs).copied().collect(),
            Operator::Or => acc.union(docs).copied().collect(),
            Operator::Not | Operator::AndNot => acc.difference(docs).copied().collect(),
        }
    }
}

/// A parsed query. `None` marks a segment that produced no term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BooleanQuery {
    Complement(Option<String>),
    Chain { first: Option<String>, rest: Vec<(Operator, Option<String>)> },
}

/// Lookups the evaluator needs from an index.
pub trait TermLookup {
    fn docs_for_term(&self, term: &str) -> Result<BTreeSet<DocId>>;
    fn all_doc_ids(&self) -> Result<BTreeSet<DocId>>;
}

impl TermLookup for IndexStore {
    fn docs_for_term(&self, term: &str) -> Result<BTreeSet<DocId>> { IndexStore::docs_for_term(self, term) }
    fn all_doc_ids(&self) -> Result<BTreeSet<DocId>> { self.doc_ids() }
}

/// Split into text segments and the operators between them.
/// Always returns `operators.len() + 1` segments; segments may be empty.
fn lex(raw: &str) -> (Vec<String>, Vec<Operator>) {
    let mut segments = vec![String::new()];
    let mut operators = Vec::new();
    for word in raw.split_whitespace() {
        match Operator::keyword(word) {
            Some(op) => {
                operators.push(op);
                segments.push(String::new());
            }
            None => {
                if let Some(seg) = segments.last_mut() {
                    if !seg.is_empty() { seg.push(' '); }
                    seg.push_str(word);
                }
            }
        }
    }
    (segments, operators)
}

impl BooleanQuery {
    pub fn parse(raw: &str, normalizer: &Normalizer) -> Self {
        let (segments, operators) = lex(raw);
        let term = |i: usize| normalizer.first_term(&segments[i]);

        let mut rest = Vec::with_capacity(operators.len());
        let mut i = 0;
        while i < operators.len() {
            let collapses = operators[i] == Operator::And
                && operators.get(i + 1) == Some(&Operator::Not)
                && segments[i + 1].is_empty();
            if collapses {
                rest.push((Operator::AndNot, term(i + 2)));
                i += 2;
            } else {
                rest.push((operators[i], term(i + 1)));
                i += 1;
            }
        }

        if segments[0].is_empty() {
            if let Some((Operator::Not, negated)) = rest.first() {
                return BooleanQuery::Complement(negated.clone());
            }
        }
        BooleanQuery::Chain { first: term(0), rest }
    }

    /// Matching doc ids in ascending order.
    pub fn evaluate<L: TermLookup + ?Sized>(&self, index: &L) -> Result<Vec<DocId>> {
        let lookup = |term: &Option<String>| -> Result<BTreeSet<DocId>> {
            match term {
                Some(t) => index.docs_for_term(t),
                None => Ok(BTreeSet::new()),
            }
        };
        let result = match self {
            BooleanQuery::Complement(term) => {
                let excluded = lookup(term)?;
                index.all_doc_ids()?.difference(&excluded).copied().collect()
            }
            BooleanQuery::Chain { first: None, .. } => BTreeSet::new(),
            BooleanQuery::Chain { first, rest } => {
                let mut acc = lookup(first)?;
                for (op, term) in rest {
                    acc = op.apply(acc, &lookup(term)?);
                }
                acc
            }
        };
        Ok(result.into_iter().collect())
    }
}

pub fn boolean_search<L: TermLookup + ?Sized>(raw: &str, normalizer: &Normalizer, index: &L) -> Result<Vec<DocId>> {
    let query = BooleanQuery::parse(raw, normalizer);
    tracing::debug!(?query, "evaluating boolean query");
    query.evaluate(index)
}
