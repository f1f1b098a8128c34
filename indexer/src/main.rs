use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use retrieval_core::builder::{build_index, load_descriptors, DirTextStore};
use retrieval_core::config::DataPaths;
use retrieval_core::persist::{load_manifest_if_trained, ArtifactPaths};
use retrieval_core::store::IndexStore;
use retrieval_core::tokenizer::{Normalizer, StemLanguage};
use retrieval_core::train::train_vector_model;
use retrieval_core::vector::{IdfWeighting, VectorConfig};
use tracing_subscriber::{EnvFilter, fmt};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the term index and train the TF-IDF vector model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Data directory holding metadata.json, texts/, stopwords.txt, index/ and model/
    #[arg(long, default_value = "./data")]
    data: PathBuf,
    /// Stop-word list (defaults to <data>/stopwords.txt)
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Index directory (defaults to <data>/index)
    #[arg(long)]
    index: Option<PathBuf>,
    /// Snowball stemming language, e.g. portuguese. `build` records it in the
    /// index; later commands default to the recorded one.
    #[arg(long)]
    stem: Option<StemLanguage>,
}

impl DataArgs {
    fn paths(&self) -> DataPaths {
        let mut paths = DataPaths::from_root(&self.data);
        if let Some(p) = &self.stopwords { paths.stopwords = p.clone(); }
        if let Some(p) = &self.index { paths.index = p.clone(); }
        paths
    }

    /// Normalizer for a fresh build: the stemmer is whatever `--stem` says.
    fn build_normalizer(&self, paths: &DataPaths) -> Result<Normalizer> {
        let normalizer = Normalizer::from_stopword_file(&paths.stopwords)?;
        Ok(match self.stem {
            Some(lang) => normalizer.with_stemming(lang),
            None => normalizer,
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Idf {
    /// ln((1 + N) / (1 + df)) + 1
    Smooth,
    /// ln(N / df) + 1
    Plain,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from the collection descriptors and texts
    Build {
        #[command(flatten)]
        data: DataArgs,
        /// Collection descriptor file (defaults to <data>/metadata.json)
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Directory with {id}.txt files (defaults to <data>/texts)
        #[arg(long)]
        texts: Option<PathBuf>,
    },
    /// Fit the TF-IDF model over the indexed documents
    Train {
        #[command(flatten)]
        data: DataArgs,
        /// Output directory for the model artifacts (defaults to <data>/model)
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Idf::Smooth)]
        idf: Idf,
        /// Use 1 + ln(tf) instead of raw term counts
        #[arg(long, default_value_t = false)]
        sublinear_tf: bool,
    },
    /// Print collection statistics of an existing index
    Stats {
        #[command(flatten)]
        data: DataArgs,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { data, metadata, texts } => {
            let mut paths = data.paths();
            if let Some(p) = metadata { paths.metadata = p; }
            if let Some(p) = texts { paths.texts = p; }
            build(&data, &paths)
        }
        Commands::Train { data, model, idf, sublinear_tf } => {
            let mut paths = data.paths();
            if let Some(p) = model { paths.model = p; }
            let idf = match idf {
                Idf::Smooth => IdfWeighting::Smooth,
                Idf::Plain => IdfWeighting::Plain,
            };
            train(&data, &paths, VectorConfig { idf, sublinear_tf })
        }
        Commands::Stats { data } => stats(&data.paths()),
    }
}

fn build(data: &DataArgs, paths: &DataPaths) -> Result<()> {
    let normalizer = data.build_normalizer(paths)?;
    let descriptors = load_descriptors(&paths.metadata)?;
    if descriptors.is_empty() {
        tracing::warn!(path = %paths.metadata.display(), "collection is empty; writing an empty index");
    }
    let texts = DirTextStore::new(&paths.texts);
    let summary = build_index(&paths.index, &descriptors, &texts, &normalizer)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn train(data: &DataArgs, paths: &DataPaths, config: VectorConfig) -> Result<()> {
    let normalizer = paths.normalizer(data.stem)?;
    let manifest = train_vector_model(&paths.index, &paths.artifacts(), &normalizer, config)?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

fn stats(paths: &DataPaths) -> Result<()> {
    let store = IndexStore::open(&paths.index)?;
    let meta = store.metadata()?;
    let stem = IndexStore::format(&paths.index)?.and_then(|format| format.stem);
    let mut out = serde_json::json!({
        "index": paths.index.display().to_string(),
        "stem": stem,
        "max_doc_id": meta.max_doc_id,
        "total_terms": meta.total_terms,
        "total_documents": meta.total_documents,
        "dictionary_terms": store.term_count(),
        "postings": store.posting_count(),
    });
    let artifacts = ArtifactPaths::new(&paths.model);
    match load_manifest_if_trained(&artifacts) {
        Ok(Some(manifest)) => out["model"] = serde_json::to_value(manifest)?,
        Ok(None) => {}
        Err(err) => tracing::warn!(path = %artifacts.root.display(), error = %format!("{err:#}"), "unreadable model manifest"),
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
