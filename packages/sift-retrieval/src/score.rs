use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use sift_storage::models::ChunkRecord;

/// The unit passed between pipeline stages. What `score` means depends on the stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
	pub score: f32,
	pub record: ChunkRecord,
}
impl ScoredChunk {
	pub fn new(score: f32, record: ChunkRecord) -> Self {
		Self { score, record }
	}

	pub fn chunk_id(&self) -> &str {
		&self.record.chunk_id
	}

	pub fn doc_id(&self) -> &str {
		&self.record.doc_id
	}
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Stable sort by descending score; equal scores keep their incoming order.
pub fn sort_desc(chunks: &mut [ScoredChunk]) {
	chunks.sort_by(|left, right| cmp_f32_desc(left.score, right.score));
}

/// Min-max scaling into [0, 1]. A constant input maps to all ones.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
	let mut min = f32::INFINITY;
	let mut max = f32::NEG_INFINITY;

	for score in scores {
		min = min.min(*score);
		max = max.max(*score);
	}

	let range = max - min;

	if !range.is_finite() || range <= f32::EPSILON {
		return vec![1.0; scores.len()];
	}

	scores.iter().map(|score| (score - min) / range).collect()
}
