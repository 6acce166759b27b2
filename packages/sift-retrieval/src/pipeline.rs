use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
	time::Duration,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sift_config::Config;
use sift_storage::models::ChunkRecord;

use crate::{
	CancellationToken, ChunkStore, EmbeddingCache, Error, EvidenceFilter, EvidenceSpan, FusionMode,
	Providers, Result, ScoredChunk, SparseScorer,
	dense::DenseScorer,
	rerank::{CrossEncoderSlot, CrossEncoderStrategy, LlmRankStrategy, RerankCascade},
	select, vector,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopChunksRequest {
	pub doc_ids: Vec<String>,
	pub question: String,
	pub top_k: u32,
	/// `None` applies the multi-document default; `Some(0)` disables the cap.
	#[serde(default)]
	pub per_doc_limit: Option<u32>,
	/// `None` uses the configured fusion mode.
	#[serde(default)]
	pub use_rrf: Option<bool>,
	/// `None` uses `evidence.enabled`.
	#[serde(default)]
	pub filter_by_evidence: Option<bool>,
}
impl TopChunksRequest {
	pub fn new(doc_ids: Vec<String>, question: impl Into<String>, top_k: u32) -> Self {
		Self {
			doc_ids,
			question: question.into(),
			top_k,
			per_doc_limit: None,
			use_rrf: None,
			filter_by_evidence: None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopChunk {
	pub doc_id: String,
	pub chunk_id: String,
	pub content: String,
	pub score: f32,
	pub evidence_spans: Vec<EvidenceSpan>,
}

/// Hybrid retrieval over the chunks of a set of documents.
///
/// One instance serves many concurrent queries. The embedding cache and the lazily loaded
/// cross-encoder are the only state shared between them.
pub struct Retriever {
	pub cfg: Config,
	pub store: Arc<dyn ChunkStore>,
	pub providers: Providers,
	pub cache: Arc<EmbeddingCache>,
	cross_encoder: CrossEncoderSlot,
}
impl Retriever {
	pub fn new(cfg: Config, store: Arc<dyn ChunkStore>) -> Self {
		Self::with_providers(cfg, store, Providers::default())
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn ChunkStore>, providers: Providers) -> Self {
		let cache = Arc::new(EmbeddingCache::from_config(&cfg.cache));

		Self { cfg, store, providers, cache, cross_encoder: CrossEncoderSlot::new() }
	}

	/// Shares an existing cache, e.g. between retrievers over different stores.
	pub fn with_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
		self.cache = cache;

		self
	}

	pub async fn get_top_chunks(&self, req: TopChunksRequest) -> Result<Vec<TopChunk>> {
		self.get_top_chunks_with_cancel(req, &CancellationToken::new()).await
	}

	/// Runs the full pipeline. Missing content, invalid input, chunk loading and cancellation
	/// are errors; every provider failure degrades the ranking instead.
	pub async fn get_top_chunks_with_cancel(
		&self,
		req: TopChunksRequest,
		cancel: &CancellationToken,
	) -> Result<Vec<TopChunk>> {
		validate_top_chunks_request(&req)?;

		let query_id = Uuid::new_v4();
		let question = req.question.trim();
		let doc_ids = dedup_preserving_order(&req.doc_ids);

		cancel.check("embed")?;

		let (question_vector, loaded) =
			tokio::join!(self.embed_question(query_id, question), self.load(&doc_ids));
		let (chunks, mut vectors) = loaded?;

		if chunks.is_empty() {
			tracing::info!(
				%query_id,
				doc_count = doc_ids.len(),
				"No chunks for requested documents."
			);

			return Err(Error::NoContent { doc_ids });
		}

		cancel.check("score")?;

		let dense_scorer = DenseScorer::from_config(&self.cfg.retrieval);
		let sparse_scorer = SparseScorer::from_config(&self.cfg.sparse);
		let dense_task = async {
			let Some(question_vector) = question_vector.as_deref() else {
				return Vec::new();
			};

			dense_scorer
				.score(
					self.providers.embedding.as_ref(),
					&self.cfg.providers.embedding,
					question_vector,
					&chunks,
					&mut vectors,
				)
				.await
		};
		let sparse_task = async { sparse_scorer.score(question, &chunks) };
		let (mut dense, mut sparse) = tokio::join!(dense_task, sparse_task);

		dense.truncate(self.cfg.retrieval.dense_top_n as usize);
		sparse.truncate(self.cfg.retrieval.sparse_top_n as usize);

		cancel.check("fuse")?;

		let fusion = FusionMode::from_config(&self.cfg.fusion, req.use_rrf);
		let fused = fusion.fuse(&dense, &sparse);

		tracing::debug!(
			%query_id,
			fusion = fusion.name(),
			dense = dense.len(),
			sparse = sparse.len(),
			fused = fused.len(),
			"Fused rankings."
		);

		cancel.check("evidence")?;

		let evidence = EvidenceFilter::from_config(&self.cfg.evidence);
		let (filtered, mut spans) =
			if req.filter_by_evidence.unwrap_or(self.cfg.evidence.enabled) {
				let outcome = evidence.filter(question, fused);

				(outcome.chunks, outcome.spans)
			} else {
				let spans = evidence.annotate(question, &fused);

				(fused, spans)
			};

		cancel.check("rerank")?;

		let reranked = self.rerank(question, filtered).await;

		cancel.check("select")?;

		let distinct_docs: HashSet<&str> =
			chunks.iter().map(|chunk| chunk.doc_id.as_str()).collect();
		let per_doc_limit = select::resolve_per_doc_limit(
			req.per_doc_limit,
			distinct_docs.len(),
			self.cfg.selection.multi_doc_per_doc_limit,
		);
		let selected = select::select(&reranked, req.top_k as usize, per_doc_limit);

		tracing::info!(
			%query_id,
			doc_count = doc_ids.len(),
			chunk_count = chunks.len(),
			candidates = reranked.len(),
			returned = selected.len(),
			per_doc_limit = per_doc_limit.map(|limit| limit as u64),
			"Top chunks selected."
		);

		Ok(selected
			.into_iter()
			.map(|chunk| {
				let evidence_spans = spans.remove(chunk.chunk_id()).unwrap_or_default();
				let ScoredChunk { score, record } = chunk;

				TopChunk {
					doc_id: record.doc_id,
					chunk_id: record.chunk_id,
					content: record.content,
					score,
					evidence_spans,
				}
			})
			.collect())
	}

	/// Question embedding through the shared cache. A failure only disables dense scoring.
	async fn embed_question(&self, query_id: Uuid, question: &str) -> Option<Vec<f32>> {
		let timeout = Duration::from_millis(self.cfg.retrieval.embed_timeout_ms);
		let embed = self.cache.get_or_embed(
			self.providers.embedding.as_ref(),
			&self.cfg.providers.embedding,
			question,
		);

		match crate::with_timeout("embed", timeout, embed).await {
			Ok(vector) => Some(vector),
			Err(err) => {
				tracing::warn!(
					%query_id,
					error = %err,
					"Question embedding failed; ranking with sparse scores only."
				);

				None
			},
		}
	}

	/// Chunks of every document in request order, without duplicate chunk ids, plus whatever
	/// stored vectors could be loaded and normalized.
	async fn load(
		&self,
		doc_ids: &[String],
	) -> Result<(Vec<ChunkRecord>, HashMap<String, Vec<f32>>)> {
		let mut chunks = Vec::new();
		let mut seen = HashSet::new();

		for doc_id in doc_ids {
			for chunk in self.store.load_chunks(doc_id).await? {
				if seen.insert(chunk.chunk_id.clone()) {
					chunks.push(chunk);
				} else {
					tracing::warn!(chunk_id = %chunk.chunk_id, "Skipping duplicate chunk id.");
				}
			}
		}

		if chunks.is_empty() {
			return Ok((chunks, HashMap::new()));
		}

		let mut vectors = match self.store.load_vectors(doc_ids).await {
			Ok(vectors) => vectors,
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Loading stored vectors failed; embedding all chunks on demand."
				);

				HashMap::new()
			},
		};

		vectors.retain(|chunk_id, _| seen.contains(chunk_id));
		vector::normalize_all(&mut vectors);

		Ok((chunks, vectors))
	}

	async fn rerank(&self, question: &str, candidates: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
		let mut cascade = RerankCascade::new(&self.cfg.rerank);

		if cascade.skip_reason(&candidates).is_some() {
			return cascade.rerank(question, candidates).await;
		}

		if let Some(model) = self
			.cross_encoder
			.get(
				self.providers.cross_encoder.as_ref(),
				self.cfg.providers.cross_encoder.as_ref(),
				cascade.timeout(),
			)
			.await
		{
			cascade = cascade.with_strategy(Box::new(CrossEncoderStrategy::new(
				model,
				self.cfg.rerank.original_weight_cross_encoder,
			)));
		}
		if let Some(completion) = self.cfg.providers.completion.as_ref() {
			cascade = cascade.with_strategy(Box::new(LlmRankStrategy::new(
				self.providers.completion.clone(),
				completion.clone(),
				&self.cfg.rerank,
			)));
		}

		cascade.rerank(question, candidates).await
	}
}

fn validate_top_chunks_request(req: &TopChunksRequest) -> Result<()> {
	if req.top_k == 0 {
		return Err(Error::InvalidRequest {
			message: "top_k must be greater than zero.".to_string(),
		});
	}
	if req.question.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "question must be non-empty.".to_string() });
	}
	if req.doc_ids.iter().any(|doc_id| doc_id.trim().is_empty()) {
		return Err(Error::InvalidRequest {
			message: "doc_ids must not contain empty values.".to_string(),
		});
	}

	Ok(())
}

fn dedup_preserving_order(values: &[String]) -> Vec<String> {
	let mut seen = HashSet::with_capacity(values.len());

	values.iter().filter(|value| seen.insert(value.as_str())).cloned().collect()
}
