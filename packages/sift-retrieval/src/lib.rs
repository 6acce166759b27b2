pub mod cache;
pub mod cancel;
pub mod dense;
pub mod evidence;
pub mod fusion;
pub mod pipeline;
pub mod rerank;
pub mod score;
pub mod select;
pub mod sparse;
pub mod store;
pub mod text;
pub mod vector;

mod error;

pub use cache::{CacheStats, EmbeddingCache};
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use evidence::{EvidenceFilter, EvidenceSpan};
pub use fusion::FusionMode;
pub use pipeline::{Retriever, TopChunk, TopChunksRequest};
pub use rerank::{CrossEncoderSlot, CrossEncoderState, RerankCascade, RerankStrategy};
pub use score::ScoredChunk;
pub use sift_storage::models::ChunkRecord;
pub use sparse::{SparseScorer, SparseStrategy};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};

use sift_config::{EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use sift_providers::{completion, embedding, rerank::CrossEncoderClient};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bounds `fut` by `limit`; expiry becomes [`Error::Timeout`] for `stage`.
pub(crate) async fn with_timeout<T>(
	stage: &'static str,
	limit: Duration,
	fut: impl Future<Output = Result<T>>,
) -> Result<T> {
	tokio::time::timeout(limit, fut).await.map_err(|_| Error::Timeout { stage })?
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Joint (question, passage) relevance model.
pub trait CrossEncoderProvider
where
	Self: Send + Sync,
{
	fn score<'a>(
		&'a self,
		query: &'a str,
		passages: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Builds the cross-encoder on first use. A failed load marks it unavailable for the
/// lifetime of the [`Retriever`].
pub trait CrossEncoderLoader
where
	Self: Send + Sync,
{
	fn load<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
	) -> BoxFuture<'a, Result<Arc<dyn CrossEncoderProvider>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>>;
}

pub trait ChunkStore
where
	Self: Send + Sync,
{
	/// Chunks of one document in stored order.
	fn load_chunks<'a>(&'a self, doc_id: &'a str) -> BoxFuture<'a, Result<Vec<ChunkRecord>>>;

	/// Precomputed vectors keyed by chunk id. Chunks without a vector are simply absent.
	fn load_vectors<'a>(
		&'a self,
		doc_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub cross_encoder: Arc<dyn CrossEncoderLoader>,
	pub completion: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		cross_encoder: Arc<dyn CrossEncoderLoader>,
		completion: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, cross_encoder, completion }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), cross_encoder: provider.clone(), completion: provider }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

impl CrossEncoderLoader for DefaultProviders {
	fn load<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
	) -> BoxFuture<'a, Result<Arc<dyn CrossEncoderProvider>>> {
		Box::pin(async move {
			let client = CrossEncoderClient::new(cfg)?;

			tracing::info!(
				provider_id = cfg.provider_id.as_str(),
				model = client.model(),
				"Cross-encoder client ready."
			);

			Ok(Arc::new(client) as Arc<dyn CrossEncoderProvider>)
		})
	}
}

impl CrossEncoderProvider for CrossEncoderClient {
	fn score<'a>(
		&'a self,
		query: &'a str,
		passages: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(CrossEncoderClient::score(self, query, passages).await?) })
	}
}

impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(completion::complete(cfg, prompt).await?) })
	}
}
