use anyhow::Result;
use axum::Router;
use clap::Parser;
use retrieval_core::config::DataPaths;
use retrieval_core::tokenizer::StemLanguage;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use server::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Data directory holding stopwords.txt, index/ and model/
    #[arg(long, default_value = "./data")]
    data: PathBuf,
    /// Stop-word list (defaults to <data>/stopwords.txt)
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Snowball stemming language; defaults to the one the index was built with
    #[arg(long)]
    stem: Option<StemLanguage>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let mut paths = DataPaths::from_root(&args.data);
    if let Some(p) = args.stopwords { paths.stopwords = p; }
    let app: Router = build_app(&paths, args.stem)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
