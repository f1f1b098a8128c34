pub mod boolean;
pub mod builder;
pub mod config;
pub mod error;
pub mod index;
pub mod persist;
pub mod ranker;
pub mod search;
pub mod store;
pub mod tokenizer;
pub mod train;
pub mod vector;

pub use error::SearchError;
pub use index::*;
pub use search::{SearchHit, SearchModel, Searcher};
