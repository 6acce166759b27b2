use std::sync::{Arc, atomic::Ordering};

use sift_retrieval::{EmbeddingCache, TopChunksRequest};
use sift_storage::memory::MemoryStore;

use crate::acceptance::{
	ConceptEmbedding, StubCompletion, StubLoader, build_retriever, concept_vector,
	dummy_embedding_provider, record, test_config,
};

#[tokio::test]
async fn same_normalized_question_embeds_once() {
	let mut store = MemoryStore::new();

	for (chunk_id, content) in [("c1", "Max HP is 100."), ("c2", "Map size is 256x256.")] {
		store
			.insert(record("docA", chunk_id, content), Some(concept_vector(content)))
			.expect("Failed to insert chunk.");
	}

	let embedding = Arc::new(ConceptEmbedding::default());
	let calls = embedding.calls.clone();
	let retriever = build_retriever(
		test_config(false, false),
		Arc::new(store),
		embedding,
		Arc::new(StubLoader::Missing),
		Arc::new(StubCompletion::Failing),
	);

	for question in ["What is the maximum health?", "  what IS the maximum\thealth? "] {
		let req = TopChunksRequest::new(vec!["docA".to_string()], question, 1);

		retriever.get_top_chunks(req).await.expect("Query failed.");
	}

	assert_eq!(calls.load(Ordering::SeqCst), 1);

	let stats = retriever.cache.stats();

	assert_eq!(stats.hits, 1);
	assert_eq!(stats.misses, 1);
	assert_eq!(stats.len, 1);
}

#[tokio::test]
async fn least_recently_used_entry_is_evicted() {
	let provider = ConceptEmbedding::default();
	let cfg = dummy_embedding_provider();
	let cache = EmbeddingCache::with_capacity(2);

	cache.get_or_embed(&provider, &cfg, "first").await.expect("Embed failed.");
	cache.get_or_embed(&provider, &cfg, "second").await.expect("Embed failed.");
	// Touch "first" so "second" becomes the eviction candidate.
	cache.get_or_embed(&provider, &cfg, "FIRST").await.expect("Embed failed.");
	cache.get_or_embed(&provider, &cfg, "third").await.expect("Embed failed.");

	assert_eq!(cache.len(), 2);
	assert!(cache.get("first").is_some());
	assert!(cache.get("second").is_none());
	assert!(cache.get("third").is_some());
	assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn cached_vectors_are_unit_length() {
	let provider = ConceptEmbedding::default();
	let cache = EmbeddingCache::default();
	let vector = cache
		.get_or_embed(&provider, &dummy_embedding_provider(), "max hp")
		.await
		.expect("Embed failed.");
	let norm: f32 = vector.iter().map(|value| value * value).sum::<f32>().sqrt();

	assert!((norm - 1.0).abs() < 1e-5);
	assert_eq!(cache.capacity(), 100);
}

#[tokio::test]
async fn reset_clears_entries_and_counters() {
	let provider = ConceptEmbedding::default();
	let cfg = dummy_embedding_provider();
	let cache = EmbeddingCache::default();

	cache.get_or_embed(&provider, &cfg, "max hp").await.expect("Embed failed.");
	cache.get_or_embed(&provider, &cfg, "max hp").await.expect("Embed failed.");
	cache.reset();

	assert!(cache.is_empty());
	assert_eq!(cache.stats(), Default::default());

	cache.get_or_embed(&provider, &cfg, "max hp").await.expect("Embed failed.");

	assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_queries_share_one_cache() {
	let provider = Arc::new(ConceptEmbedding::default());
	let cache = Arc::new(EmbeddingCache::default());
	let mut handles = Vec::new();

	for _ in 0..8 {
		let provider = provider.clone();
		let cache = cache.clone();

		handles.push(tokio::spawn(async move {
			cache
				.get_or_embed(provider.as_ref(), &dummy_embedding_provider(), "max hp")
				.await
				.expect("Embed failed.")
		}));
	}

	for handle in handles {
		handle.await.expect("Task panicked.");
	}

	assert_eq!(cache.len(), 1);

	let stats = cache.stats();

	assert_eq!(stats.hits + stats.misses, 8);
}
