use serde::{Deserialize, Serialize};

/// A precomputed text fragment. Treated as immutable for the lifetime of a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
	pub chunk_id: String,
	pub doc_id: String,
	pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredChunk {
	pub chunk_id: String,
	pub doc_id: String,
	pub content: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vector: Option<Vec<f32>>,
}
impl StoredChunk {
	pub fn record(&self) -> ChunkRecord {
		ChunkRecord {
			chunk_id: self.chunk_id.clone(),
			doc_id: self.doc_id.clone(),
			content: self.content.clone(),
		}
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChunkFile {
	pub chunks: Vec<StoredChunk>,
}
