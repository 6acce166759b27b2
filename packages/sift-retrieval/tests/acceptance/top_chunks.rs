use sift_retrieval::{Error, TopChunksRequest};

use crate::acceptance::{basic_retriever, ids, memory_store, test_config};

const HEALTH_QUESTION: &str = "What is the maximum health?";
const GAME_CHUNKS: [(&str, &str, &str); 2] =
	[("docA", "c1", "Max HP is 100."), ("docA", "c2", "Map size is 256x256.")];

fn request(doc_id: &str, question: &str, top_k: u32) -> TopChunksRequest {
	TopChunksRequest::new(vec![doc_id.to_string()], question, top_k)
}

#[tokio::test]
async fn answers_health_question_with_supporting_sentence() {
	let retriever = basic_retriever(test_config(false, false), memory_store(&GAME_CHUNKS));
	let req = request("docA", HEALTH_QUESTION, 1);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");

	assert_eq!(ids(&top), vec!["c1"]);
	assert_eq!(top[0].doc_id, "docA");
	assert_eq!(top[0].content, "Max HP is 100.");
	assert!(top[0].evidence_spans.iter().any(|span| span.text.contains("Max HP is 100.")));
}

#[tokio::test]
async fn weighted_average_mode_still_ranks_relevant_chunk_first() {
	let retriever = basic_retriever(test_config(false, false), memory_store(&GAME_CHUNKS));
	let mut req = request("docA", HEALTH_QUESTION, 2);

	req.use_rrf = Some(false);

	let top = retriever.get_top_chunks(req).await.expect("Query failed.");

	assert_eq!(ids(&top), vec!["c1", "c2"]);
	assert!(top[0].score > top[1].score);
}

#[tokio::test]
async fn unknown_documents_are_a_no_content_error() {
	let retriever = basic_retriever(test_config(false, false), memory_store(&GAME_CHUNKS));
	let req = request("missing", HEALTH_QUESTION, 3);
	let err = retriever.get_top_chunks(req).await.expect_err("Expected no-content error.");

	match err {
		Error::NoContent { doc_ids } => assert_eq!(doc_ids, vec!["missing".to_string()]),
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn zero_top_k_is_rejected() {
	let retriever = basic_retriever(test_config(false, false), memory_store(&GAME_CHUNKS));
	let req = request("docA", HEALTH_QUESTION, 0);
	let err = retriever.get_top_chunks(req).await.expect_err("Expected invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn repeated_queries_return_identical_results() {
	let chunks = [
		("docA", "c1", "Max HP is 100. Health regenerates slowly."),
		("docA", "c2", "Map size is 256x256."),
		("docA", "c3", "The boss has 300 HP."),
		("docA", "c4", "Tiles are drawn at 16 pixels."),
		("docA", "c5", "Potions restore health."),
	];
	let retriever = basic_retriever(test_config(false, false), memory_store(&chunks));
	let fresh = basic_retriever(test_config(false, false), memory_store(&chunks));
	let req = request("docA", "How much health does the boss have?", 5);
	let first = retriever.get_top_chunks(req.clone()).await.expect("Query failed.");
	let second = retriever.get_top_chunks(req.clone()).await.expect("Query failed.");
	let third = fresh.get_top_chunks(req).await.expect("Query failed.");

	assert_eq!(first, second);
	assert_eq!(first, third);
	assert_eq!(first.len(), 5);
}

#[tokio::test]
async fn duplicate_doc_ids_do_not_duplicate_chunks() {
	let retriever = basic_retriever(test_config(false, false), memory_store(&GAME_CHUNKS));
	let req = TopChunksRequest::new(
		vec!["docA".to_string(), "docA".to_string()],
		HEALTH_QUESTION,
		10,
	);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");

	assert_eq!(ids(&top), vec!["c1", "c2"]);
}
