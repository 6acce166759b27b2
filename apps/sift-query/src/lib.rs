use std::{io, path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use sift_config::Config;
use sift_retrieval::{ChunkStore, Retriever, TopChunksRequest};
use sift_storage::{db::Db, memory::MemoryStore};

/// Select the chunks that best answer a question.
#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Document to search; repeat for several documents.
	#[arg(long = "doc", value_name = "ID", required = true)]
	pub doc_ids: Vec<String>,
	#[arg(long, short = 'q')]
	pub question: String,
	#[arg(long, short = 'k', default_value_t = 5)]
	pub top_k: u32,
	/// Cap per document. 0 disables the cap; omitted uses the configured multi-document default.
	#[arg(long, value_name = "N")]
	pub per_doc_limit: Option<u32>,
	/// Use the legacy weighted-average fusion instead of reciprocal rank fusion.
	#[arg(long)]
	pub weighted: bool,
	#[arg(long)]
	pub no_evidence_filter: bool,
}
impl Args {
	pub fn request(&self) -> TopChunksRequest {
		TopChunksRequest {
			doc_ids: self.doc_ids.clone(),
			question: self.question.clone(),
			top_k: self.top_k,
			per_doc_limit: self.per_doc_limit,
			use_rrf: self.weighted.then_some(false),
			filter_by_evidence: self.no_evidence_filter.then_some(false),
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;

	init_tracing(&config)?;

	let store = open_store(&config).await?;
	let retriever = Retriever::new(config, store);
	let top = retriever.get_top_chunks(args.request()).await?;

	println!("{}", serde_json::to_string_pretty(&top)?);

	Ok(())
}

async fn open_store(config: &Config) -> color_eyre::Result<Arc<dyn ChunkStore>> {
	if let Some(postgres) = config.storage.postgres.as_ref() {
		let db = Db::connect(postgres).await?;

		db.ensure_schema().await?;

		tracing::info!(
			pool_max_conns = postgres.pool_max_conns,
			"Connected to Postgres chunk store."
		);

		return Ok(Arc::new(db));
	}
	if let Some(path) = config.storage.chunks_path.as_ref() {
		return Ok(Arc::new(MemoryStore::from_json_file(path)?));
	}

	Err(eyre::eyre!("storage must configure either postgres or chunks_path."))
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	// Results go to stdout.
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

	Ok(())
}
