use std::collections::HashMap;

use sift_storage::{db::Db, memory::MemoryStore, models::ChunkRecord, queries};

use crate::{BoxFuture, ChunkStore, Result};

impl ChunkStore for MemoryStore {
	fn load_chunks<'a>(&'a self, doc_id: &'a str) -> BoxFuture<'a, Result<Vec<ChunkRecord>>> {
		Box::pin(async move { Ok(MemoryStore::load_chunks(self, doc_id)) })
	}

	fn load_vectors<'a>(
		&'a self,
		doc_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, Vec<f32>>>> {
		Box::pin(async move { Ok(MemoryStore::load_vectors(self, doc_ids)) })
	}
}

impl ChunkStore for Db {
	fn load_chunks<'a>(&'a self, doc_id: &'a str) -> BoxFuture<'a, Result<Vec<ChunkRecord>>> {
		Box::pin(async move { Ok(queries::load_chunks(self, doc_id).await?) })
	}

	fn load_vectors<'a>(
		&'a self,
		doc_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, Vec<f32>>>> {
		Box::pin(async move { Ok(queries::load_vectors(self, doc_ids).await?) })
	}
}
