use std::collections::{HashMap, HashSet};

use sqlx::{PgExecutor, PgPool};

use crate::{
	Error, Result,
	models::{CachedEmbedding, EmbeddingWrite},
};

pub async fn get_by_ids<'e, E>(
	executor: E,
	user_id: i64,
	model_id: &str,
	entity_ids: &[i64],
) -> Result<HashMap<i64, CachedEmbedding>>
where
	E: PgExecutor<'e>,
{
	validate_owner(user_id, model_id)?;

	if entity_ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<CachedEmbedding> = sqlx::query_as(
		"\
SELECT
	user_id,
	model_id,
	entity_id,
	content_hash,
	vector,
	created_at,
	updated_at
FROM assistant_embeddings
WHERE user_id = $1
	AND model_id = $2
	AND entity_id = ANY($3)",
	)
	.bind(user_id)
	.bind(model_id)
	.bind(entity_ids)
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().map(|row| (row.entity_id, row)).collect())
}

/// Deletes every row of `(user_id, model_id)` whose entity is not listed.
///
/// An empty list deletes all of them.
pub async fn delete_not_in<'e, E>(
	executor: E,
	user_id: i64,
	model_id: &str,
	entity_ids: &[i64],
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	validate_owner(user_id, model_id)?;

	let result = if entity_ids.is_empty() {
		sqlx::query(
			"\
DELETE FROM assistant_embeddings
WHERE user_id = $1
	AND model_id = $2",
		)
		.bind(user_id)
		.bind(model_id)
		.execute(executor)
		.await?
	} else {
		sqlx::query(
			"\
DELETE FROM assistant_embeddings
WHERE user_id = $1
	AND model_id = $2
	AND NOT (entity_id = ANY($3))",
		)
		.bind(user_id)
		.bind(model_id)
		.bind(entity_ids)
		.execute(executor)
		.await?
	};

	Ok(result.rows_affected())
}

pub async fn purge<'e, E>(executor: E, user_id: i64, model_id: &str) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	delete_not_in(executor, user_id, model_id, &[]).await
}

/// Writes all entries in one transaction. Existing rows keep their `created_at`.
///
/// Entries must share one `(user_id, model_id)`. A repeated entity keeps its last entry.
pub async fn replace(pool: &PgPool, entries: &[EmbeddingWrite]) -> Result<()> {
	let Some(first) = entries.first() else {
		return Ok(());
	};

	validate_owner(first.user_id, &first.model_id)?;

	for entry in entries {
		validate_entry(entry, first)?;
	}

	let mut seen = HashSet::new();
	let mut unique = Vec::with_capacity(entries.len());

	for entry in entries.iter().rev() {
		if seen.insert(entry.entity_id) {
			unique.push(entry);
		}
	}

	unique.reverse();

	let mut tx = pool.begin().await?;

	for entry in &unique {
		sqlx::query(
			"\
INSERT INTO assistant_embeddings (
	user_id,
	model_id,
	entity_id,
	content_hash,
	vector,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, now(), now())
ON CONFLICT (user_id, model_id, entity_id) DO UPDATE
SET
	content_hash = EXCLUDED.content_hash,
	vector = EXCLUDED.vector,
	updated_at = EXCLUDED.updated_at",
		)
		.bind(entry.user_id)
		.bind(entry.model_id.as_str())
		.bind(entry.entity_id)
		.bind(entry.content_hash.as_str())
		.bind(entry.vector.as_str())
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;

	tracing::debug!(
		user_id = first.user_id,
		model_id = %first.model_id,
		count = unique.len(),
		"Replaced cached embeddings."
	);

	Ok(())
}

fn validate_owner(user_id: i64, model_id: &str) -> Result<()> {
	if user_id <= 0 {
		return Err(Error::InvalidArgument("user_id must be greater than zero.".to_string()));
	}
	if model_id.trim().is_empty() {
		return Err(Error::InvalidArgument("model_id must be non-empty.".to_string()));
	}

	Ok(())
}

fn validate_entry(entry: &EmbeddingWrite, first: &EmbeddingWrite) -> Result<()> {
	if entry.user_id != first.user_id || entry.model_id != first.model_id {
		return Err(Error::InvalidArgument(
			"All entries must share one user_id and model_id.".to_string(),
		));
	}
	if entry.entity_id <= 0 {
		return Err(Error::InvalidArgument("entity_id must be greater than zero.".to_string()));
	}
	if entry.content_hash.is_empty() {
		return Err(Error::InvalidArgument("content_hash must be non-empty.".to_string()));
	}
	if entry.vector.is_empty() {
		return Err(Error::InvalidArgument("vector must be non-empty.".to_string()));
	}

	Ok(())
}
