use std::collections::HashMap;

use crate::{Error, Result, db::Db, models::ChunkRecord};

pub async fn upsert_chunk(db: &Db, record: &ChunkRecord, chunk_index: i32) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO sift_chunks (chunk_id, doc_id, chunk_index, content)
VALUES ($1, $2, $3, $4)
ON CONFLICT (chunk_id) DO UPDATE
SET
	doc_id = EXCLUDED.doc_id,
	chunk_index = EXCLUDED.chunk_index,
	content = EXCLUDED.content",
	)
	.bind(record.chunk_id.as_str())
	.bind(record.doc_id.as_str())
	.bind(chunk_index)
	.bind(record.content.as_str())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn upsert_vector(db: &Db, chunk_id: &str, vector: &[f32]) -> Result<()> {
	if vector.is_empty() {
		return Err(Error::InvalidArgument(format!("Vector for chunk {chunk_id} is empty.")));
	}

	let dimensions = i32::try_from(vector.len())
		.map_err(|_| Error::InvalidArgument("Vector dimension exceeds i32.".to_string()))?;

	sqlx::query(
		"\
INSERT INTO sift_chunk_vectors (chunk_id, embedding, dimensions)
VALUES ($1, $2, $3)
ON CONFLICT (chunk_id) DO UPDATE
SET
	embedding = EXCLUDED.embedding,
	dimensions = EXCLUDED.dimensions",
	)
	.bind(chunk_id)
	.bind(vector)
	.bind(dimensions)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn load_chunks(db: &Db, doc_id: &str) -> Result<Vec<ChunkRecord>> {
	let rows: Vec<(String, String, String)> = sqlx::query_as(
		"\
SELECT chunk_id, doc_id, content
FROM sift_chunks
WHERE doc_id = $1
ORDER BY chunk_index ASC, chunk_id ASC",
	)
	.bind(doc_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows
		.into_iter()
		.map(|(chunk_id, doc_id, content)| ChunkRecord { chunk_id, doc_id, content })
		.collect())
}

pub async fn load_vectors(db: &Db, doc_ids: &[String]) -> Result<HashMap<String, Vec<f32>>> {
	if doc_ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<(String, Vec<f32>)> = sqlx::query_as(
		"\
SELECT v.chunk_id, v.embedding
FROM sift_chunk_vectors v
JOIN sift_chunks c ON c.chunk_id = v.chunk_id
WHERE c.doc_id = ANY($1)",
	)
	.bind(doc_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows.into_iter().collect())
}
