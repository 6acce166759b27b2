use sift_retrieval::{CancellationToken, Error, TopChunksRequest};

use crate::acceptance::{basic_retriever, memory_store, test_config};

#[tokio::test]
async fn cancelled_token_stops_before_first_stage() {
	let store = memory_store(&[("docA", "c1", "Max HP is 100.")]);
	let retriever = basic_retriever(test_config(false, false), store);
	let cancel = CancellationToken::new();

	cancel.cancel();

	let req = TopChunksRequest::new(vec!["docA".to_string()], "What is the maximum health?", 1);
	let err = retriever
		.get_top_chunks_with_cancel(req, &cancel)
		.await
		.expect_err("Expected cancellation.");

	assert!(matches!(err, Error::Cancelled { stage: "embed" }), "Unexpected error: {err:?}");
	assert!(retriever.cache.is_empty());
}
