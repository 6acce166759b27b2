//! Lexical ranking: BM25 with a word-overlap fallback for degenerate inputs.

use std::collections::{HashMap, HashSet};

use crate::{
	ScoredChunk,
	score::{self, min_max_normalize},
	text,
};
use sift_storage::models::ChunkRecord;

/// One way of scoring chunks against a question. Returning `None` hands over to the next
/// strategy in the chain.
pub trait SparseStrategy
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	/// Scores aligned with `chunks`.
	fn score(&self, question: &str, chunks: &[ChunkRecord]) -> Option<Vec<f32>>;
}

/// Okapi BM25, min-max normalized into [0, 1].
#[derive(Clone, Debug)]
pub struct Bm25 {
	pub k1: f32,
	pub b: f32,
	/// Negative IDF values are replaced by `epsilon * mean_idf`.
	pub epsilon: f32,
}
impl Default for Bm25 {
	fn default() -> Self {
		Self { k1: 1.5, b: 0.75, epsilon: 0.25 }
	}
}
impl SparseStrategy for Bm25 {
	fn name(&self) -> &'static str {
		"bm25"
	}

	fn score(&self, question: &str, chunks: &[ChunkRecord]) -> Option<Vec<f32>> {
		if chunks.is_empty() {
			return None;
		}

		let query = text::tokenize(question);

		if query.is_empty() {
			return None;
		}

		let docs: Vec<Vec<String>> =
			chunks.iter().map(|chunk| text::tokenize(&chunk.content)).collect();
		let total_len: usize = docs.iter().map(Vec::len).sum();

		if total_len == 0 {
			return None;
		}

		let doc_count = docs.len() as f32;
		let avg_len = total_len as f32 / doc_count;
		let mut frequencies = Vec::with_capacity(docs.len());
		let mut document_frequency: HashMap<&str, usize> = HashMap::new();

		for doc in &docs {
			let mut tf: HashMap<&str, usize> = HashMap::new();

			for token in doc {
				*tf.entry(token.as_str()).or_default() += 1;
			}
			for token in tf.keys() {
				*document_frequency.entry(*token).or_default() += 1;
			}

			frequencies.push(tf);
		}

		let idf = self.idf(&document_frequency, doc_count);

		let raw: Vec<f32> = docs
			.iter()
			.zip(frequencies.iter())
			.map(|(doc, tf)| {
				let len_norm = 1.0 - self.b + self.b * doc.len() as f32 / avg_len;

				query
					.iter()
					.map(|token| {
						let Some(freq) = tf.get(token.as_str()) else {
							return 0.0;
						};
						let freq = *freq as f32;
						let weight = idf.get(token.as_str()).copied().unwrap_or(0.0);

						weight * freq * (self.k1 + 1.0) / (freq + self.k1 * len_norm)
					})
					.sum::<f32>()
			})
			.collect();

		if raw.iter().all(|value| *value == 0.0) || raw.iter().any(|value| !value.is_finite()) {
			return None;
		}

		Some(min_max_normalize(&raw))
	}
}
impl Bm25 {
	/// Per-token IDF with negative values replaced by `epsilon * mean_idf`. The mean is taken
	/// over the raw values, so the floor is negative when common terms dominate.
	fn idf<'a>(
		&self,
		document_frequency: &HashMap<&'a str, usize>,
		doc_count: f32,
	) -> HashMap<&'a str, f32> {
		let mut idf = HashMap::with_capacity(document_frequency.len());
		let mut idf_sum = 0.0_f32;
		let mut negative = Vec::new();

		for (token, df) in document_frequency {
			let df = *df as f32;
			let value = ((doc_count - df + 0.5) / (df + 0.5)).ln();

			idf_sum += value;

			if value < 0.0 {
				negative.push(*token);
			}

			idf.insert(*token, value);
		}

		let floor = self.epsilon * idf_sum / document_frequency.len() as f32;

		for token in negative {
			idf.insert(token, floor);
		}

		idf
	}
}

/// Share of question words found in the chunk, plus a bonus when the whole question occurs
/// verbatim.
#[derive(Clone, Debug)]
pub struct OverlapHeuristic {
	pub substring_bonus: f32,
}
impl Default for OverlapHeuristic {
	fn default() -> Self {
		Self { substring_bonus: 0.5 }
	}
}
impl SparseStrategy for OverlapHeuristic {
	fn name(&self) -> &'static str {
		"overlap"
	}

	fn score(&self, question: &str, chunks: &[ChunkRecord]) -> Option<Vec<f32>> {
		let query: HashSet<String> = text::token_set(question);
		let needle = question.trim().to_lowercase();

		Some(
			chunks
				.iter()
				.map(|chunk| {
					let mut value = text::overlap_ratio(&query, &text::token_set(&chunk.content));

					if !needle.is_empty() && chunk.content.to_lowercase().contains(&needle) {
						value += self.substring_bonus;
					}

					value
				})
				.collect(),
		)
	}
}

pub struct SparseScorer {
	strategies: Vec<Box<dyn SparseStrategy>>,
}
impl SparseScorer {
	pub fn new(strategies: Vec<Box<dyn SparseStrategy>>) -> Self {
		Self { strategies }
	}

	pub fn from_config(cfg: &sift_config::Sparse) -> Self {
		let mut strategies: Vec<Box<dyn SparseStrategy>> = Vec::with_capacity(2);

		if cfg.bm25_enabled {
			strategies.push(Box::new(Bm25 { k1: cfg.k1, b: cfg.b, epsilon: cfg.epsilon }));
		}

		strategies.push(Box::new(OverlapHeuristic { substring_bonus: cfg.substring_bonus }));

		Self { strategies }
	}

	/// Full ranking of `chunks`, best first. Equal scores keep the stored chunk order.
	pub fn score(&self, question: &str, chunks: &[ChunkRecord]) -> Vec<ScoredChunk> {
		for strategy in &self.strategies {
			let Some(scores) = strategy.score(question, chunks) else {
				tracing::debug!(
					strategy = strategy.name(),
					"Sparse strategy declined; falling back."
				);

				continue;
			};

			if scores.len() != chunks.len() {
				tracing::warn!(
					strategy = strategy.name(),
					expected = chunks.len(),
					got = scores.len(),
					"Sparse strategy returned a misaligned score list."
				);

				continue;
			}

			let mut ranked: Vec<ScoredChunk> = scores
				.into_iter()
				.zip(chunks.iter())
				.map(|(value, chunk)| ScoredChunk::new(value, chunk.clone()))
				.collect();

			score::sort_desc(&mut ranked);

			tracing::debug!(
				strategy = strategy.name(),
				count = ranked.len(),
				"Sparse ranking done."
			);

			return ranked;
		}

		chunks.iter().map(|chunk| ScoredChunk::new(0.0, chunk.clone())).collect()
	}
}
impl Default for SparseScorer {
	fn default() -> Self {
		Self::from_config(&sift_config::Sparse::default())
	}
}
