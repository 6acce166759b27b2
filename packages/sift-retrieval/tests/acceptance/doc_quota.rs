use std::collections::HashMap;

use sift_retrieval::{TopChunk, TopChunksRequest};

use crate::acceptance::{basic_retriever, memory_store, test_config};

const QUESTION: &str = "What is the maximum health?";

fn per_doc(chunks: &[TopChunk]) -> HashMap<&str, usize> {
	let mut counts = HashMap::new();

	for chunk in chunks {
		*counts.entry(chunk.doc_id.as_str()).or_default() += 1;
	}

	counts
}

fn docs(ids: &[&str]) -> Vec<String> {
	ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn multi_document_queries_cap_each_document_at_two() {
	let chunks = [
		("docA", "a1", "Max HP is 100."),
		("docA", "a2", "Max HP grows per level."),
		("docA", "a3", "Health potions restore HP."),
		("docB", "b1", "Boss max HP is 300."),
		("docB", "b2", "Boss health regenerates."),
		("docB", "b3", "Boss HP doubles in hard mode."),
		("docC", "c1", "Map size is 256x256."),
		("docC", "c2", "Tiles are 16 pixels."),
		("docC", "c3", "The map wraps around."),
	];
	let retriever = basic_retriever(test_config(false, false), memory_store(&chunks));
	let req = TopChunksRequest::new(docs(&["docA", "docB", "docC"]), QUESTION, 6);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");
	let counts = per_doc(&top);

	assert_eq!(top.len(), 6);
	assert!(counts.values().all(|count| *count == 2), "Unexpected spread: {counts:?}");
}

#[tokio::test]
async fn short_quota_pass_is_backfilled_at_the_end() {
	let chunks = [
		("docA", "a1", "Max HP is 100."),
		("docA", "a2", "Max HP grows per level."),
		("docA", "a3", "Health potions restore HP."),
		("docA", "a4", "HP bars are red."),
		("docB", "b1", "Map size is 256x256."),
	];
	let retriever = basic_retriever(test_config(false, false), memory_store(&chunks));
	let req = TopChunksRequest::new(docs(&["docA", "docB"]), QUESTION, 4);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");
	let counts = per_doc(&top);

	assert_eq!(top.len(), 4);
	assert_eq!(counts.get("docA"), Some(&3));
	assert_eq!(counts.get("docB"), Some(&1));
	assert_eq!(top[3].doc_id, "docA");
	assert!(top[..3].iter().filter(|chunk| chunk.doc_id == "docA").count() == 2);
}

#[tokio::test]
async fn single_document_and_explicit_zero_are_uncapped() {
	let chunks = [
		("docA", "a1", "Max HP is 100."),
		("docA", "a2", "Max HP grows per level."),
		("docA", "a3", "Health potions restore HP."),
		("docB", "b1", "Map size is 256x256."),
	];
	let retriever = basic_retriever(test_config(false, false), memory_store(&chunks));
	let single = retriever
		.get_top_chunks(TopChunksRequest::new(docs(&["docA"]), QUESTION, 3))
		.await
		.expect("Query failed.");

	assert_eq!(per_doc(&single).get("docA"), Some(&3));

	let mut req = TopChunksRequest::new(docs(&["docA", "docB"]), QUESTION, 3);

	req.per_doc_limit = Some(0);

	let uncapped = retriever.get_top_chunks(req).await.expect("Query failed.");

	assert_eq!(per_doc(&uncapped).get("docA"), Some(&3));
}
