use std::{collections::HashMap, sync::Arc};

use sift_config::EmbeddingProviderConfig;
use sift_retrieval::{
	BoxFuture, ChunkRecord, ChunkStore, EmbeddingProvider, Error, Result, TopChunksRequest,
};
use sift_storage::memory::MemoryStore;

use crate::acceptance::{
	FailingEmbedding, StubCompletion, StubLoader, build_retriever, concept_vector, ids,
	memory_store, record, test_config,
};

const QUESTION: &str = "What is the maximum health?";

/// Embeds the question but fails every chunk request, batched or not.
struct QuestionOnlyEmbedding;
impl EmbeddingProvider for QuestionOnlyEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		let out = if texts.len() == 1 && texts[0] == QUESTION {
			Ok(vec![concept_vector(&texts[0])])
		} else {
			Err(Error::Provider { message: "batch quota exceeded".to_string() })
		};

		Box::pin(async move { out })
	}
}

/// Serves chunks but fails to load vectors.
struct BrokenVectorStore(MemoryStore);
impl ChunkStore for BrokenVectorStore {
	fn load_chunks<'a>(&'a self, doc_id: &'a str) -> BoxFuture<'a, Result<Vec<ChunkRecord>>> {
		Box::pin(async move { Ok(self.0.load_chunks(doc_id)) })
	}

	fn load_vectors<'a>(
		&'a self,
		_doc_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, Vec<f32>>>> {
		Box::pin(async move { Err(Error::Storage { message: "vector table missing".to_string() }) })
	}
}

#[tokio::test]
async fn question_embedding_failure_falls_back_to_sparse_ranking() {
	let store = memory_store(&[
		("docA", "c1", "Map size is 256x256."),
		("docA", "c2", "Maximum health is 100."),
		("docA", "c3", "Music plays at night."),
	]);
	let retriever = build_retriever(
		test_config(false, false),
		store,
		Arc::new(FailingEmbedding),
		Arc::new(StubLoader::Missing),
		Arc::new(StubCompletion::Failing),
	);
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 2);
	let top = retriever.get_top_chunks(req).await.expect("Query must degrade, not fail.");

	assert_eq!(ids(&top), vec!["c2", "c1"]);
	assert!(retriever.cache.is_empty());
}

#[tokio::test]
async fn chunk_embedding_failure_only_drops_dense_signal_for_those_chunks() {
	let mut store = MemoryStore::new();

	store
		.insert(record("docA", "c1", "Max HP is 100."), Some(concept_vector("Max HP is 100.")))
		.expect("Failed to insert chunk.");
	store
		.insert(record("docA", "c2", "Map size is 256x256."), None)
		.expect("Failed to insert chunk.");

	let retriever = build_retriever(
		test_config(false, false),
		Arc::new(store),
		Arc::new(QuestionOnlyEmbedding),
		Arc::new(StubLoader::Missing),
		Arc::new(StubCompletion::Failing),
	);
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 2);
	let top = retriever.get_top_chunks(req).await.expect("Query must degrade, not fail.");

	assert_eq!(ids(&top), vec!["c1", "c2"]);
}

#[tokio::test]
async fn vector_load_failure_embeds_on_demand() {
	let mut inner = MemoryStore::new();

	inner.insert(record("docA", "c1", "Max HP is 100."), None).expect("Failed to insert chunk.");
	inner
		.insert(record("docA", "c2", "Map size is 256x256."), None)
		.expect("Failed to insert chunk.");

	let retriever = crate::acceptance::basic_retriever(
		test_config(false, false),
		Arc::new(BrokenVectorStore(inner)),
	);
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 1);
	let top = retriever.get_top_chunks(req).await.expect("Query must degrade, not fail.");

	assert_eq!(ids(&top), vec!["c1"]);
}
