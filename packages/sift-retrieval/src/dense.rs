use std::{collections::HashMap, time::Duration};

use sift_config::EmbeddingProviderConfig;
use sift_storage::models::ChunkRecord;

use crate::{EmbeddingProvider, ScoredChunk, score, vector};

/// Cosine ranking of chunks against the question vector.
#[derive(Clone, Debug)]
pub struct DenseScorer {
	tolerance: f32,
	embed_timeout: Duration,
}
impl DenseScorer {
	pub fn new(tolerance: f32, embed_timeout: Duration) -> Self {
		Self { tolerance, embed_timeout }
	}

	pub fn from_config(cfg: &sift_config::Retrieval) -> Self {
		Self::new(cfg.unit_norm_tolerance, Duration::from_millis(cfg.embed_timeout_ms))
	}

	/// Embeds chunks that have no stored vector, then ranks every chunk that ends up with one.
	/// New vectors are written into `vectors` so later stages of the same query can reuse them.
	pub async fn score(
		&self,
		provider: &dyn EmbeddingProvider,
		cfg: &EmbeddingProviderConfig,
		question_vector: &[f32],
		chunks: &[ChunkRecord],
		vectors: &mut HashMap<String, Vec<f32>>,
	) -> Vec<ScoredChunk> {
		self.embed_missing(provider, cfg, chunks, vectors).await;

		self.rank(question_vector, chunks, vectors)
	}

	/// Returns how many chunks received a vector.
	pub async fn embed_missing(
		&self,
		provider: &dyn EmbeddingProvider,
		cfg: &EmbeddingProviderConfig,
		chunks: &[ChunkRecord],
		vectors: &mut HashMap<String, Vec<f32>>,
	) -> usize {
		let missing: Vec<&ChunkRecord> =
			chunks.iter().filter(|chunk| !vectors.contains_key(&chunk.chunk_id)).collect();

		if missing.is_empty() {
			return 0;
		}

		let texts: Vec<String> = missing.iter().map(|chunk| chunk.content.clone()).collect();
		let embed = provider.embed(cfg, &texts);
		let embedded = match crate::with_timeout("embed", self.embed_timeout, embed).await {
			Ok(embedded) if embedded.len() == missing.len() => {
				embedded.into_iter().map(Some).collect()
			},
			Ok(embedded) => {
				tracing::warn!(
					expected = missing.len(),
					got = embedded.len(),
					"Chunk embedding count mismatch; retrying chunks one at a time."
				);

				self.embed_each(provider, cfg, &missing).await
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					missing = missing.len(),
					"Chunk embedding batch failed; retrying chunks one at a time."
				);

				self.embed_each(provider, cfg, &missing).await
			},
		};
		let mut added = 0;

		for (chunk, raw) in missing.into_iter().zip(embedded) {
			let Some(raw) = raw else {
				continue;
			};
			let Some(unit) = vector::normalize(&raw) else {
				tracing::warn!(
					chunk_id = %chunk.chunk_id,
					"Chunk embedding has zero norm; skipping."
				);

				continue;
			};

			vectors.insert(chunk.chunk_id.clone(), unit);

			added += 1;
		}

		tracing::debug!(added, "Embedded chunks without stored vectors.");

		added
	}

	/// One provider call per chunk. A chunk whose own call fails maps to `None` and stays out of
	/// dense ranking.
	async fn embed_each(
		&self,
		provider: &dyn EmbeddingProvider,
		cfg: &EmbeddingProviderConfig,
		missing: &[&ChunkRecord],
	) -> Vec<Option<Vec<f32>>> {
		let mut out = Vec::with_capacity(missing.len());

		for chunk in missing {
			let input = [chunk.content.clone()];
			let embed = provider.embed(cfg, &input);
			let raw = match crate::with_timeout("embed", self.embed_timeout, embed).await {
				Ok(mut embedded) if embedded.len() == 1 => embedded.pop(),
				Ok(embedded) => {
					tracing::warn!(
						chunk_id = %chunk.chunk_id,
						got = embedded.len(),
						"Chunk embedding count mismatch; excluding chunk from dense ranking."
					);

					None
				},
				Err(err) => {
					tracing::warn!(
						chunk_id = %chunk.chunk_id,
						error = %err,
						"Chunk embedding failed; excluding chunk from dense ranking."
					);

					None
				},
			};

			out.push(raw);
		}

		out
	}

	/// Full ranking over chunks that have a comparable vector. Ties keep stored chunk order.
	pub fn rank(
		&self,
		question_vector: &[f32],
		chunks: &[ChunkRecord],
		vectors: &HashMap<String, Vec<f32>>,
	) -> Vec<ScoredChunk> {
		let mut ranked = Vec::with_capacity(chunks.len());

		for chunk in chunks {
			let Some(candidate) = vectors.get(&chunk.chunk_id) else {
				continue;
			};
			let Some(similarity) =
				vector::cosine_similarity(question_vector, candidate, self.tolerance)
			else {
				tracing::warn!(
					chunk_id = %chunk.chunk_id,
					question_dim = question_vector.len(),
					chunk_dim = candidate.len(),
					"Vector is not comparable with the question; skipping."
				);

				continue;
			};

			ranked.push(ScoredChunk::new(similarity, chunk.clone()));
		}

		score::sort_desc(&mut ranked);

		ranked
	}
}
impl Default for DenseScorer {
	fn default() -> Self {
		Self::from_config(&sift_config::Retrieval::default())
	}
}
