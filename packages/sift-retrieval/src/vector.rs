use std::collections::HashMap;

pub fn l2_norm(vector: &[f32]) -> f32 {
	vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

/// Unit-length copy of `vector`, or `None` when it is empty, zero or not finite.
pub fn normalize(vector: &[f32]) -> Option<Vec<f32>> {
	let norm = l2_norm(vector);

	if vector.is_empty() || !norm.is_finite() || norm <= f32::EPSILON {
		return None;
	}

	Some(vector.iter().map(|value| value / norm).collect())
}

pub fn is_unit(vector: &[f32], tolerance: f32) -> bool {
	(l2_norm(vector) - 1.0).abs() <= tolerance
}

/// Normalizes every vector in place and drops the ones that cannot be normalized, so those
/// chunks get embedded on demand.
pub fn normalize_all(vectors: &mut HashMap<String, Vec<f32>>) -> usize {
	let mut dropped = 0;

	vectors.retain(|chunk_id, vector| match normalize(vector) {
		Some(unit) => {
			*vector = unit;

			true
		},
		None => {
			tracing::warn!(
				chunk_id = %chunk_id,
				"Dropping stored vector with zero or invalid norm."
			);

			dropped += 1;

			false
		},
	});

	dropped
}

/// Cosine similarity. Uses a plain dot product when both inputs are unit length within
/// `tolerance`.
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32], tolerance: f32) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let dot: f32 = lhs.iter().zip(rhs.iter()).map(|(l, r)| l * r).sum();

	if is_unit(lhs, tolerance) && is_unit(rhs, tolerance) {
		return Some(dot);
	}

	let lhs_norm = l2_norm(lhs);
	let rhs_norm = l2_norm(rhs);

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some(dot / (lhs_norm * rhs_norm))
}
