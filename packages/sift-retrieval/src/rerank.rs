//! Second-pass ordering of the leading candidates: cross-encoder first, then an LLM
//! permutation, and finally the fused order as is.

use std::{collections::HashSet, sync::Arc, time::Duration};

use regex::Regex;
use tokio::sync::OnceCell;

use sift_config::{LlmProviderConfig, ProviderConfig};

use crate::{
	BoxFuture, CompletionProvider, CrossEncoderLoader, CrossEncoderProvider, Error, Result,
	ScoredChunk, score, text,
};

/// Produces new scores for `candidates`, aligned by position. An error hands over to the next
/// strategy.
pub trait RerankStrategy
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	fn rerank<'a>(
		&'a self,
		question: &'a str,
		candidates: &'a [ScoredChunk],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

pub struct CrossEncoderStrategy {
	model: Arc<dyn CrossEncoderProvider>,
	original_weight: f32,
}
impl CrossEncoderStrategy {
	pub fn new(model: Arc<dyn CrossEncoderProvider>, original_weight: f32) -> Self {
		Self { model, original_weight }
	}
}
impl RerankStrategy for CrossEncoderStrategy {
	fn name(&self) -> &'static str {
		"cross_encoder"
	}

	fn rerank<'a>(
		&'a self,
		question: &'a str,
		candidates: &'a [ScoredChunk],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			let passages: Vec<String> =
				candidates.iter().map(|chunk| chunk.record.content.clone()).collect();
			let raw = self.model.score(question, &passages).await?;

			if raw.len() != candidates.len() {
				return Err(Error::Provider {
					message: format!(
						"Cross-encoder returned {} scores for {} passages.",
						raw.len(),
						candidates.len()
					),
				});
			}
			if raw.iter().any(|value| !value.is_finite()) {
				return Err(Error::Provider {
					message: "Cross-encoder returned a non-finite score.".to_string(),
				});
			}

			let model_weight = 1.0 - self.original_weight;

			Ok(candidates
				.iter()
				.zip(score::min_max_normalize(&raw))
				.map(|(chunk, relevance)| {
					self.original_weight * chunk.score + model_weight * relevance
				})
				.collect())
		})
	}
}

/// Asks a completion model for a permutation of numbered previews.
pub struct LlmRankStrategy {
	provider: Arc<dyn CompletionProvider>,
	cfg: LlmProviderConfig,
	original_weight: f32,
	rank_step: f32,
	rank_floor: f32,
	preview_chars: usize,
}
impl LlmRankStrategy {
	pub fn new(
		provider: Arc<dyn CompletionProvider>,
		cfg: LlmProviderConfig,
		rerank: &sift_config::Rerank,
	) -> Self {
		Self {
			provider,
			cfg,
			original_weight: rerank.original_weight_llm,
			rank_step: rerank.rank_step,
			rank_floor: rerank.rank_floor,
			preview_chars: rerank.preview_chars as usize,
		}
	}

	pub fn build_prompt(&self, question: &str, candidates: &[ScoredChunk]) -> String {
		let mut prompt = format!(
			"Question: {}\n\nRank the passages below by how well they answer the question. \
			 Reply only with the passage numbers, most relevant first, separated by commas. \
			 Include every number exactly once.\n\n",
			question.trim()
		);

		for (index, chunk) in candidates.iter().enumerate() {
			prompt.push_str(&format!(
				"{}. {}\n",
				index + 1,
				text::preview(&chunk.record.content, self.preview_chars)
			));
		}

		prompt
	}
}
impl RerankStrategy for LlmRankStrategy {
	fn name(&self) -> &'static str {
		"llm"
	}

	fn rerank<'a>(
		&'a self,
		question: &'a str,
		candidates: &'a [ScoredChunk],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			let prompt = self.build_prompt(question, candidates);
			let reply = self.provider.complete(&self.cfg, &prompt).await?;
			let order = parse_permutation(&reply, candidates.len())?;
			let mut rank_scores = vec![0.0; candidates.len()];

			for (position, index) in order.into_iter().enumerate() {
				rank_scores[index] = (1.0 - position as f32 * self.rank_step).max(self.rank_floor);
			}

			let model_weight = 1.0 - self.original_weight;

			Ok(candidates
				.iter()
				.zip(rank_scores)
				.map(|(chunk, rank_score)| {
					self.original_weight * chunk.score + model_weight * rank_score
				})
				.collect())
		})
	}
}

/// Reads a 1-based permutation of `count` items and returns 0-based indices in reply order.
pub fn parse_permutation(reply: &str, count: usize) -> Result<Vec<usize>> {
	let pattern = Regex::new(r"\d+").map_err(|err| Error::Provider { message: err.to_string() })?;
	let mut seen = HashSet::with_capacity(count);
	let mut order = Vec::with_capacity(count);

	for found in pattern.find_iter(reply) {
		let Ok(number) = found.as_str().parse::<usize>() else {
			return Err(Error::Provider {
				message: format!("Ranking reply has an unreadable index: {}.", found.as_str()),
			});
		};

		if number == 0 || number > count || !seen.insert(number) {
			return Err(Error::Provider {
				message: format!("Ranking reply has an invalid or repeated index: {number}."),
			});
		}

		order.push(number - 1);
	}

	if order.len() != count {
		return Err(Error::Provider {
			message: format!("Ranking reply lists {} of {count} passages.", order.len()),
		});
	}

	Ok(order)
}

pub struct RerankCascade {
	strategies: Vec<Box<dyn RerankStrategy>>,
	top_n: usize,
	min_candidates: usize,
	skip_score: f32,
	timeout: Duration,
}
impl RerankCascade {
	pub fn new(cfg: &sift_config::Rerank) -> Self {
		Self {
			strategies: Vec::new(),
			top_n: cfg.top_n as usize,
			min_candidates: cfg.min_candidates as usize,
			skip_score: cfg.skip_score,
			timeout: Duration::from_millis(cfg.timeout_ms),
		}
	}

	/// Strategies are tried in the order they are added.
	pub fn with_strategy(mut self, strategy: Box<dyn RerankStrategy>) -> Self {
		self.strategies.push(strategy);

		self
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Why reranking would be skipped for `candidates`, if it would.
	pub fn skip_reason(&self, candidates: &[ScoredChunk]) -> Option<&'static str> {
		if candidates.len() < self.min_candidates {
			return Some("too_few_candidates");
		}
		if candidates.first().map(|chunk| chunk.score >= self.skip_score).unwrap_or(false) {
			return Some("confident_leader");
		}

		None
	}

	/// Reorders the leading `top_n` candidates with the first strategy that succeeds. The rest
	/// are appended in their incoming order. Never fails; with no usable strategy the input is
	/// returned unchanged.
	pub async fn rerank(
		&self,
		question: &str,
		mut candidates: Vec<ScoredChunk>,
	) -> Vec<ScoredChunk> {
		if let Some(reason) = self.skip_reason(&candidates) {
			tracing::debug!(reason, count = candidates.len(), "Skipping rerank.");

			return candidates;
		}

		let split = self.top_n.min(candidates.len());
		let remainder = candidates.split_off(split);
		let mut head = candidates;

		for strategy in &self.strategies {
			let scores =
				match crate::with_timeout("rerank", self.timeout, strategy.rerank(question, &head))
					.await
				{
					Ok(scores) if scores.len() == head.len() => scores,
					Ok(scores) => {
						tracing::warn!(
							strategy = strategy.name(),
							expected = head.len(),
							got = scores.len(),
							"Rerank strategy returned a misaligned score list."
						);

						continue;
					},
					Err(err) => {
						tracing::warn!(
							strategy = strategy.name(),
							error = %err,
							"Rerank strategy failed."
						);

						continue;
					},
				};

			for (chunk, value) in head.iter_mut().zip(scores) {
				chunk.score = value;
			}

			score::sort_desc(&mut head);

			tracing::info!(strategy = strategy.name(), reranked = head.len(), "Rerank applied.");

			head.extend(remainder);

			return head;
		}

		tracing::info!("No rerank strategy succeeded; keeping fused order.");

		head.extend(remainder);

		head
	}
}

pub enum CrossEncoderState {
	Ready(Arc<dyn CrossEncoderProvider>),
	Unavailable,
}

/// Lazily loaded cross-encoder shared by every query of one [`crate::Retriever`]. The first
/// query that needs it attempts the load; the outcome sticks.
#[derive(Default)]
pub struct CrossEncoderSlot {
	state: OnceCell<CrossEncoderState>,
}
impl CrossEncoderSlot {
	pub fn new() -> Self {
		Self::default()
	}

	/// A slot that never loads, for deployments without a cross-encoder.
	pub fn unavailable() -> Self {
		Self { state: OnceCell::new_with(Some(CrossEncoderState::Unavailable)) }
	}

	pub fn is_initialized(&self) -> bool {
		self.state.initialized()
	}

	pub async fn get(
		&self,
		loader: &dyn CrossEncoderLoader,
		cfg: Option<&ProviderConfig>,
		timeout: Duration,
	) -> Option<Arc<dyn CrossEncoderProvider>> {
		let state = self
			.state
			.get_or_init(|| async move {
				let Some(cfg) = cfg else {
					tracing::info!("No cross-encoder configured; reranking falls back to the LLM.");

					return CrossEncoderState::Unavailable;
				};

				match crate::with_timeout("cross_encoder_load", timeout, loader.load(cfg)).await {
					Ok(model) => CrossEncoderState::Ready(model),
					Err(err) => {
						tracing::warn!(
							error = %err,
							"Cross-encoder failed to load; marking unavailable."
						);

						CrossEncoderState::Unavailable
					},
				}
			})
			.await;

		match state {
			CrossEncoderState::Ready(model) => Some(model.clone()),
			CrossEncoderState::Unavailable => None,
		}
	}
}
