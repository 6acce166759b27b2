use std::sync::Arc;

use sift_retrieval::TopChunksRequest;

use crate::acceptance::{
	ConceptEmbedding, StubCompletion, StubLoader, build_retriever, ids, memory_store, test_config,
};

const CHUNKS: [(&str, &str, &str); 6] = [
	("docA", "c1", "Max HP is 100."),
	("docA", "c2", "The boss has 300 HP."),
	("docA", "c3", "Potions restore health."),
	("docA", "c4", "Map size is 256x256."),
	("docA", "c5", "Tiles are drawn at 16 pixels."),
	("docA", "c6", "Music plays at night."),
];
const QUESTION: &str = "How much health does the boss have?";

#[derive(Clone, Copy, Debug)]
enum Cross {
	Present,
	Absent,
	Throwing,
	LoadFails,
}

#[derive(Clone, Copy, Debug)]
enum Llm {
	Present,
	Absent,
	Throwing,
	Malformed,
}

async fn run(cross: Cross, llm: Llm) -> Vec<String> {
	let loader = match cross {
		Cross::Present => StubLoader::Reversing,
		Cross::Absent => StubLoader::Missing,
		Cross::Throwing => StubLoader::Throwing,
		Cross::LoadFails => StubLoader::LoadFails,
	};
	let completion = match llm {
		Llm::Present => StubCompletion::Reversing,
		Llm::Absent | Llm::Throwing => StubCompletion::Failing,
		Llm::Malformed => StubCompletion::Malformed,
	};
	let cfg = test_config(!matches!(cross, Cross::Absent), !matches!(llm, Llm::Absent));
	let retriever = build_retriever(
		cfg,
		memory_store(&CHUNKS),
		Arc::new(ConceptEmbedding::default()),
		Arc::new(loader),
		Arc::new(completion),
	);
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, CHUNKS.len() as u32);
	let top = retriever.get_top_chunks(req).await.expect("Reranking must never fail the query.");

	ids(&top).into_iter().map(str::to_string).collect()
}

#[tokio::test]
async fn every_provider_combination_returns_all_candidates() {
	let fused_order = run(Cross::Absent, Llm::Absent).await;
	let mut reversed = fused_order.clone();

	reversed.reverse();

	assert_eq!(fused_order.len(), CHUNKS.len());

	for cross in [Cross::Present, Cross::Absent, Cross::Throwing, Cross::LoadFails] {
		for llm in [Llm::Present, Llm::Absent, Llm::Throwing, Llm::Malformed] {
			let order = run(cross, llm).await;
			let expected = match (cross, llm) {
				(Cross::Present, _) | (_, Llm::Present) => &reversed,
				_ => &fused_order,
			};

			assert_eq!(&order, expected, "cross={cross:?} llm={llm:?}");
		}
	}
}

#[tokio::test]
async fn confident_or_small_candidate_sets_skip_reranking() {
	let retriever = build_retriever(
		test_config(true, true),
		memory_store(&CHUNKS[..3]),
		Arc::new(ConceptEmbedding::default()),
		Arc::new(StubLoader::Reversing),
		Arc::new(StubCompletion::Reversing),
	);
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 3);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");
	let baseline = build_retriever(
		test_config(false, false),
		memory_store(&CHUNKS[..3]),
		Arc::new(ConceptEmbedding::default()),
		Arc::new(StubLoader::Missing),
		Arc::new(StubCompletion::Failing),
	)
	.get_top_chunks(TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 3))
	.await
	.expect("Query failed.");

	assert_eq!(ids(&top), ids(&baseline));
}
