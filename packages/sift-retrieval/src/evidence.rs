//! Sentence-level support for fused candidates, and the filter that drops candidates
//! without any.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{ScoredChunk, score, text};

/// A sentence of a chunk that supports the question. Offsets are byte positions into the
/// chunk content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSpan {
	pub text: String,
	pub score: f32,
	pub start_pos: usize,
	pub end_pos: usize,
	pub sentence_index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct EvidenceOutcome {
	pub chunks: Vec<ScoredChunk>,
	/// Spans for every chunk that was looked at, keyed by chunk id.
	pub spans: HashMap<String, Vec<EvidenceSpan>>,
	pub demoted: usize,
	pub dropped: usize,
}

#[derive(Clone, Debug)]
pub struct EvidenceFilter {
	pub min_score: f32,
	/// Chunks scoring at least `min_score * demotion_factor` survive with their score
	/// multiplied by the same factor.
	pub demotion_factor: f32,
	pub keep_top_n: usize,
	pub max_spans: usize,
	pub substring_bonus: f32,
	pub keyword_bonus: f32,
	keywords: Vec<Vec<String>>,
}
impl EvidenceFilter {
	pub fn from_config(cfg: &sift_config::Evidence) -> Self {
		Self {
			min_score: cfg.min_score,
			demotion_factor: cfg.demotion_factor,
			keep_top_n: cfg.keep_top_n as usize,
			max_spans: cfg.max_spans as usize,
			substring_bonus: cfg.substring_bonus,
			keyword_bonus: cfg.keyword_bonus,
			keywords: Vec::new(),
		}
		.with_keywords(&cfg.keywords)
	}

	/// Domain terms that earn a bonus when both the question and a sentence mention them.
	pub fn with_keywords(mut self, keywords: &[String]) -> Self {
		self.keywords = keywords
			.iter()
			.map(|keyword| text::tokenize(keyword))
			.filter(|tokens| !tokens.is_empty())
			.collect();

		self
	}

	/// Up to `max_spans` positively scored sentences of `content`, best first.
	pub fn extract_spans(&self, question: &str, content: &str) -> Vec<EvidenceSpan> {
		let query = Query::new(question, &self.keywords);

		self.spans_for(&query, content)
	}

	/// Keeps the first `keep_top_n` chunks untouched and judges the rest by their best span.
	pub fn filter(&self, question: &str, chunks: Vec<ScoredChunk>) -> EvidenceOutcome {
		let query = Query::new(question, &self.keywords);
		let threshold = self.min_score;
		let demote_threshold = self.min_score * self.demotion_factor;
		let mut outcome =
			EvidenceOutcome { chunks: Vec::with_capacity(chunks.len()), ..Default::default() };

		for (position, mut chunk) in chunks.into_iter().enumerate() {
			let spans = self.spans_for(&query, &chunk.record.content);
			let best = spans.first().map(|span| span.score).unwrap_or(0.0);

			if position >= self.keep_top_n {
				if best < demote_threshold {
					tracing::debug!(
						chunk_id = chunk.chunk_id(),
						best,
						"Dropping chunk without evidence."
					);

					outcome.dropped += 1;

					continue;
				}
				if best < threshold {
					chunk.score *= self.demotion_factor;
					outcome.demoted += 1;
				}
			}

			outcome.spans.insert(chunk.record.chunk_id.clone(), spans);
			outcome.chunks.push(chunk);
		}

		score::sort_desc(&mut outcome.chunks);

		tracing::debug!(
			kept = outcome.chunks.len(),
			demoted = outcome.demoted,
			dropped = outcome.dropped,
			"Evidence filter done."
		);

		outcome
	}

	/// Spans for every chunk without changing scores or membership.
	pub fn annotate(
		&self,
		question: &str,
		chunks: &[ScoredChunk],
	) -> HashMap<String, Vec<EvidenceSpan>> {
		let query = Query::new(question, &self.keywords);

		chunks
			.iter()
			.map(|chunk| {
				(chunk.record.chunk_id.clone(), self.spans_for(&query, &chunk.record.content))
			})
			.collect()
	}

	fn spans_for(&self, query: &Query, content: &str) -> Vec<EvidenceSpan> {
		let mut spans: Vec<EvidenceSpan> = text::split_sentences(content)
			.into_iter()
			.filter_map(|sentence| {
				let value = self.sentence_score(query, sentence.text);

				(value > 0.0).then(|| EvidenceSpan {
					text: sentence.text.to_string(),
					score: value,
					start_pos: sentence.start,
					end_pos: sentence.end,
					sentence_index: sentence.index,
				})
			})
			.collect();

		spans.sort_by(|left, right| score::cmp_f32_desc(left.score, right.score));
		spans.truncate(self.max_spans);

		spans
	}

	fn sentence_score(&self, query: &Query, sentence: &str) -> f32 {
		let tokens = text::token_set(sentence);
		let mut value = text::overlap_ratio(&query.tokens, &tokens);

		if !query.needle.is_empty() && sentence.to_lowercase().contains(&query.needle) {
			value += self.substring_bonus;
		}

		for keyword in &query.keywords {
			if keyword.iter().all(|token| tokens.contains(token)) {
				value += self.keyword_bonus;
			}
		}

		value
	}
}
impl Default for EvidenceFilter {
	fn default() -> Self {
		Self::from_config(&sift_config::Evidence::default())
	}
}

struct Query<'a> {
	tokens: HashSet<String>,
	needle: String,
	/// Keywords the question itself mentions.
	keywords: Vec<&'a [String]>,
}
impl<'a> Query<'a> {
	fn new(question: &str, keywords: &'a [Vec<String>]) -> Self {
		let tokens = text::token_set(question);
		let keywords = keywords
			.iter()
			.filter(|keyword| keyword.iter().all(|token| tokens.contains(token)))
			.map(Vec::as_slice)
			.collect();

		Self { tokens, needle: question.trim().to_lowercase(), keywords }
	}
}
