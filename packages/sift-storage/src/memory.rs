use std::{collections::HashMap, fs, path::Path};

use crate::{
	Error, Result,
	models::{ChunkFile, ChunkRecord},
};

/// Chunk store backed by process memory, optionally seeded from a JSON chunk file.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	docs: HashMap<String, Vec<ChunkRecord>>,
	vectors: HashMap<String, Vec<f32>>,
	chunk_ids: HashMap<String, String>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_chunk_file(file: ChunkFile) -> Result<Self> {
		let mut store = Self::new();

		for chunk in file.chunks {
			let record = chunk.record();

			store.insert(record, chunk.vector)?;
		}

		Ok(store)
	}

	pub fn from_json_file(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;
		let file: ChunkFile = serde_json::from_str(&raw)
			.map_err(|err| Error::SerdeJson { path: path.to_path_buf(), source: err })?;
		let store = Self::from_chunk_file(file)?;

		tracing::info!(path = %path.display(), chunk_count = store.len(), "Loaded chunk file.");

		Ok(store)
	}

	/// Appends a chunk to its document. Chunk ids are unique across the whole store.
	pub fn insert(&mut self, record: ChunkRecord, vector: Option<Vec<f32>>) -> Result<()> {
		if record.chunk_id.trim().is_empty() {
			return Err(Error::InvalidArgument("chunk_id must be non-empty.".to_string()));
		}
		if let Some(existing_doc) = self.chunk_ids.get(&record.chunk_id) {
			return Err(Error::InvalidArgument(format!(
				"Duplicate chunk_id {} (already stored under {existing_doc}).",
				record.chunk_id
			)));
		}
		if let Some(vector) = vector {
			if vector.is_empty() {
				return Err(Error::InvalidArgument(format!(
					"Vector for chunk {} is empty.",
					record.chunk_id
				)));
			}

			self.vectors.insert(record.chunk_id.clone(), vector);
		}

		self.chunk_ids.insert(record.chunk_id.clone(), record.doc_id.clone());
		self.docs.entry(record.doc_id.clone()).or_default().push(record);

		Ok(())
	}

	pub fn len(&self) -> usize {
		self.chunk_ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunk_ids.is_empty()
	}

	pub fn load_chunks(&self, doc_id: &str) -> Vec<ChunkRecord> {
		self.docs.get(doc_id).cloned().unwrap_or_default()
	}

	pub fn load_vectors(&self, doc_ids: &[String]) -> HashMap<String, Vec<f32>> {
		let mut out = HashMap::new();

		for doc_id in doc_ids {
			let Some(chunks) = self.docs.get(doc_id) else { continue };

			for chunk in chunks {
				if let Some(vector) = self.vectors.get(&chunk.chunk_id) {
					out.insert(chunk.chunk_id.clone(), vector.clone());
				}
			}
		}

		out
	}
}
