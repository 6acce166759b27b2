use std::collections::{HashMap, HashSet};

use crate::ScoredChunk;

/// Effective per-document cap. An explicit request value wins, `Some(0)` meaning no cap.
/// Otherwise queries over several documents get `multi_doc_default` and single-document
/// queries are uncapped.
pub fn resolve_per_doc_limit(
	requested: Option<u32>,
	distinct_docs: usize,
	multi_doc_default: u32,
) -> Option<usize> {
	match requested {
		Some(0) => None,
		Some(limit) => Some(limit as usize),
		None if distinct_docs > 1 && multi_doc_default > 0 => Some(multi_doc_default as usize),
		None => None,
	}
}

/// Takes up to `top_k` chunks in ranked order, admitting at most `per_doc_limit` per document.
/// Slots left over after that pass are backfilled from the ranking, quota ignored, and
/// appended after the quota-admitted chunks.
pub fn select(
	ranked: &[ScoredChunk],
	top_k: usize,
	per_doc_limit: Option<usize>,
) -> Vec<ScoredChunk> {
	let Some(limit) = per_doc_limit else {
		return ranked.iter().take(top_k).cloned().collect();
	};
	let mut selected = Vec::with_capacity(top_k.min(ranked.len()));
	let mut taken: HashSet<usize> = HashSet::new();
	let mut per_doc: HashMap<&str, usize> = HashMap::new();

	for (index, chunk) in ranked.iter().enumerate() {
		if selected.len() >= top_k {
			break;
		}

		let count = per_doc.entry(chunk.doc_id()).or_default();

		if *count >= limit {
			continue;
		}

		*count += 1;

		taken.insert(index);
		selected.push(chunk.clone());
	}

	let quota_admitted = selected.len();

	for (index, chunk) in ranked.iter().enumerate() {
		if selected.len() >= top_k {
			break;
		}
		if taken.contains(&index) {
			continue;
		}

		selected.push(chunk.clone());
	}

	if selected.len() > quota_admitted {
		tracing::debug!(
			quota_admitted,
			backfilled = selected.len() - quota_admitted,
			"Backfilled selection past the per-document limit."
		);
	}

	selected
}
