use std::collections::HashMap;

use sift_config::FusionModeKind;

use crate::{ScoredChunk, score};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FusionMode {
	/// Reciprocal rank fusion: each list contributes `1 / (k + rank)` with 0-based ranks.
	Rrf { k: f32 },
	/// Deprecated. Min-max normalizes each list and blends the scores.
	WeightedAverage { dense_weight: f32, sparse_weight: f32 },
}
impl FusionMode {
	/// `use_rrf` overrides the configured mode for one query.
	pub fn from_config(cfg: &sift_config::Fusion, use_rrf: Option<bool>) -> Self {
		let kind = match use_rrf {
			Some(true) => FusionModeKind::Rrf,
			Some(false) => FusionModeKind::WeightedAverage,
			None => cfg.mode,
		};

		match kind {
			FusionModeKind::Rrf => Self::Rrf { k: cfg.rrf_k },
			FusionModeKind::WeightedAverage => Self::WeightedAverage {
				dense_weight: cfg.dense_weight,
				sparse_weight: cfg.sparse_weight,
			},
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Rrf { .. } => "rrf",
			Self::WeightedAverage { .. } => "weighted_average",
		}
	}

	/// Fuses two already truncated rankings. The candidate set is their union; ties keep the
	/// order in which chunks first appear, dense list first.
	pub fn fuse(&self, dense: &[ScoredChunk], sparse: &[ScoredChunk]) -> Vec<ScoredChunk> {
		let mut fused: Vec<ScoredChunk> = Vec::with_capacity(dense.len() + sparse.len());
		let mut positions: HashMap<&str, usize> = HashMap::new();
		let (dense_scores, sparse_scores) = match self {
			Self::Rrf { k } => (rrf_scores(dense, *k), rrf_scores(sparse, *k)),
			Self::WeightedAverage { dense_weight, sparse_weight } => (
				weighted_scores(dense, *dense_weight),
				weighted_scores(sparse, *sparse_weight),
			),
		};

		for (list, contributions) in [(dense, dense_scores), (sparse, sparse_scores)] {
			for (chunk, contribution) in list.iter().zip(contributions) {
				match positions.get(chunk.chunk_id()) {
					Some(index) => fused[*index].score += contribution,
					None => {
						positions.insert(chunk.chunk_id(), fused.len());
						fused.push(ScoredChunk::new(contribution, chunk.record.clone()));
					},
				}
			}
		}

		score::sort_desc(&mut fused);

		fused
	}
}
impl Default for FusionMode {
	fn default() -> Self {
		Self::from_config(&sift_config::Fusion::default(), None)
	}
}

fn rrf_scores(list: &[ScoredChunk], k: f32) -> Vec<f32> {
	(0..list.len()).map(|rank| 1.0 / (k + rank as f32)).collect()
}

fn weighted_scores(list: &[ScoredChunk], weight: f32) -> Vec<f32> {
	let raw: Vec<f32> = list.iter().map(|chunk| chunk.score).collect();

	score::min_max_normalize(&raw).into_iter().map(|value| value * weight).collect()
}
