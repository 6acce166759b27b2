use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Cross-encoder scoring client. The HTTP client is built once and reused across calls.
pub struct CrossEncoderClient {
	cfg: sift_config::ProviderConfig,
	client: Client,
}
impl CrossEncoderClient {
	pub fn new(cfg: &sift_config::ProviderConfig) -> Result<Self> {
		if cfg.model.trim().is_empty() {
			return Err(Error::InvalidConfig {
				message: "Cross-encoder model must be non-empty.".to_string(),
			});
		}

		let client = crate::build_client(cfg.timeout_ms)?;

		Ok(Self { cfg: cfg.clone(), client })
	}

	pub fn model(&self) -> &str {
		&self.cfg.model
	}

	pub async fn score(&self, query: &str, docs: &[String]) -> Result<Vec<f32>> {
		let url = crate::endpoint(&self.cfg.api_base, &self.cfg.path);
		let body =
			serde_json::json!({ "model": self.cfg.model, "query": query, "documents": docs });
		let res = self
			.client
			.post(url)
			.headers(crate::auth_headers(&self.cfg.api_key, &self.cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_rerank_response(json, docs.len())
	}
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let mut scores: Vec<Option<f32>> = vec![None; doc_count];
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Rerank response is missing results array.".to_string(),
		})?;

	for item in results {
		let index = item.get("index").and_then(|v| v.as_u64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Rerank result missing index.".to_string() }
		})? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Rerank result missing score.".to_string(),
			})? as f32;
		let slot = scores.get_mut(index).ok_or_else(|| Error::InvalidResponse {
			message: format!("Rerank result index {index} is out of range for {doc_count} docs."),
		})?;

		if slot.replace(score).is_some() {
			return Err(Error::InvalidResponse {
				message: format!("Rerank result index {index} appears more than once."),
			});
		}
	}

	scores
		.into_iter()
		.enumerate()
		.map(|(index, score)| {
			score.ok_or_else(|| Error::InvalidResponse {
				message: format!("Rerank response has no score for document {index}."),
			})
		})
		.collect()
}
