//! Word and sentence segmentation shared by sparse scoring, evidence extraction and the
//! embedding cache key.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

/// A trimmed sentence and its byte range within the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentence<'a> {
	pub index: usize,
	pub text: &'a str,
	pub start: usize,
	pub end: usize,
}

/// Lowercased Unicode word tokens, in order and with repetitions.
pub fn tokenize(text: &str) -> Vec<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

pub fn token_set(text: &str) -> HashSet<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

/// Cache key form of a question: lowercased, trimmed, internal whitespace collapsed.
pub fn normalize_query(text: &str) -> String {
	text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
	let mut out = Vec::new();

	for (offset, raw) in text.split_sentence_bound_indices() {
		let leading = raw.len() - raw.trim_start().len();
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			continue;
		}

		let start = offset + leading;

		out.push(Sentence { index: out.len(), text: trimmed, start, end: start + trimmed.len() });
	}

	out
}

/// Share of `query_tokens` present in `candidate_tokens`.
pub fn overlap_ratio(query_tokens: &HashSet<String>, candidate_tokens: &HashSet<String>) -> f32 {
	if query_tokens.is_empty() {
		return 0.0;
	}

	let matched = query_tokens.iter().filter(|token| candidate_tokens.contains(*token)).count();

	matched as f32 / query_tokens.len() as f32
}

/// Truncates to `max_chars` characters on a char boundary, flattening newlines.
pub fn preview(text: &str, max_chars: usize) -> String {
	let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");

	if flat.chars().count() <= max_chars {
		return flat;
	}

	let mut out: String = flat.chars().take(max_chars).collect();

	out.push_str("...");

	out
}
