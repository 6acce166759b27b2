use sift_retrieval::TopChunksRequest;

use crate::acceptance::{basic_retriever, ids, memory_store, test_config};

const CHUNKS: [(&str, &str, &str); 3] = [
	("docA", "c1", "Intro text. Max HP is 100."),
	("docA", "c2", "Map size is 256x256."),
	("docA", "c3", "Music plays at night."),
];
const QUESTION: &str = "What is the maximum health?";

fn strict_config() -> sift_config::Config {
	let mut cfg = test_config(false, false);

	cfg.evidence.keep_top_n = 1;

	cfg
}

#[tokio::test]
async fn chunks_without_evidence_are_dropped_past_keep_top_n() {
	let retriever = basic_retriever(strict_config(), memory_store(&CHUNKS));
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 10);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");

	assert_eq!(ids(&top), vec!["c1", "c2"]);
}

#[tokio::test]
async fn disabled_filter_keeps_everything_and_still_attaches_spans() {
	let retriever = basic_retriever(strict_config(), memory_store(&CHUNKS));
	let mut req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 10);

	req.filter_by_evidence = Some(false);

	let top = retriever.get_top_chunks(req).await.expect("Query failed.");
	let music = top.iter().find(|chunk| chunk.chunk_id == "c3").expect("c3 must be returned.");
	let hp = top.iter().find(|chunk| chunk.chunk_id == "c1").expect("c1 must be returned.");

	assert_eq!(top.len(), 3);
	assert!(music.evidence_spans.is_empty());
	assert_eq!(hp.evidence_spans[0].text, "Max HP is 100.");
	assert_eq!(hp.evidence_spans[0].sentence_index, 1);
}

#[tokio::test]
async fn span_offsets_index_into_chunk_content() {
	let retriever = basic_retriever(test_config(false, false), memory_store(&CHUNKS));
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 3);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");

	for chunk in &top {
		assert!(chunk.evidence_spans.len() <= 3);

		for span in &chunk.evidence_spans {
			assert_eq!(&chunk.content[span.start_pos..span.end_pos], span.text);
			assert!(span.score > 0.0);
		}
	}
}

#[tokio::test]
async fn top_chunks_serialize_with_evidence_fields() {
	let retriever = basic_retriever(test_config(false, false), memory_store(&CHUNKS));
	let req = TopChunksRequest::new(vec!["docA".to_string()], QUESTION, 1);
	let top = retriever.get_top_chunks(req).await.expect("Query failed.");
	let value = serde_json::to_value(&top).expect("Failed to serialize top chunks.");
	let span = &value[0]["evidence_spans"][0];

	assert_eq!(value[0]["chunk_id"], "c1");
	assert_eq!(span["text"], "Max HP is 100.");
	assert_eq!(span["start_pos"], 12);
	assert_eq!(span["end_pos"], 26);
}
