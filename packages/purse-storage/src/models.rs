use time::OffsetDateTime;

/// One persisted embedding, keyed by `(user_id, model_id, entity_id)`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CachedEmbedding {
	pub user_id: i64,
	pub model_id: String,
	pub entity_id: i64,
	pub content_hash: String,
	/// JSON array of floats.
	pub vector: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingWrite {
	pub user_id: i64,
	pub model_id: String,
	pub entity_id: i64,
	pub content_hash: String,
	pub vector: String,
}
