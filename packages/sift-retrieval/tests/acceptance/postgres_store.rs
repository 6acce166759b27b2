use std::sync::Arc;

use sift_config::Postgres;
use sift_retrieval::TopChunksRequest;
use sift_storage::{db::Db, queries};

use crate::acceptance::{basic_retriever, concept_vector, ids, record, test_config};

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn retrieves_from_postgres_store() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping retrieves_from_postgres_store; set SIFT_PG_DSN to run this test.");

		return;
	};

	sift_testkit::with_test_db(&base_dsn, |test_db| {
		let dsn = test_db.dsn().to_string();

		async move {
			let db = Db::connect(&Postgres { dsn, pool_max_conns: 2 })
				.await
				.expect("Failed to connect to Postgres.");

			db.ensure_schema().await.expect("Failed to ensure schema.");

			for (index, (chunk_id, content)) in
				[("c1", "Max HP is 100."), ("c2", "Map size is 256x256.")].into_iter().enumerate()
			{
				queries::upsert_chunk(&db, &record("docA", chunk_id, content), index as i32)
					.await
					.expect("Failed to insert chunk.");
			}

			queries::upsert_vector(&db, "c1", &concept_vector("Max HP is 100."))
				.await
				.expect("Failed to insert vector.");

			let retriever = basic_retriever(test_config(false, false), Arc::new(db));
			let req =
				TopChunksRequest::new(vec!["docA".to_string()], "What is the maximum health?", 1);
			let top = retriever.get_top_chunks(req).await.expect("Query failed.");

			assert_eq!(ids(&top), vec!["c1"]);

			Ok(())
		}
	})
	.await
	.expect("Postgres retrieval failed.");
}
