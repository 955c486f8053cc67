pub mod chat;
pub mod embedding_cache;
pub mod knowledge;
pub mod ledger;
pub mod prompt;
pub mod stream;

mod error;

pub use chat::{ChatMode, ChatRequest, ChatResponse, HistoryMessage, RequestContext};
pub use embedding_cache::{EmbeddingCache, ResolvedEmbeddings};
pub use error::{Error, Result};
pub use ledger::MemoryLedger;
pub use stream::{ChatStreamChunk, StreamProcessor, StreamState};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use purse_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use purse_domain::ledger::{Account, Category, Tag, TransactionRecord};
use purse_providers::{embedding, responses, responses::ByteStream};
use purse_storage::{
	db::Db,
	embeddings,
	models::{CachedEmbedding, EmbeddingWrite},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// Embeds one batch. Vectors come back in input order.
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, purse_providers::Result<Vec<Vec<f64>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		instructions: &'a str,
		input: &'a str,
	) -> BoxFuture<'a, purse_providers::Result<ByteStream>>;
}

/// Persisted embedding cache keyed by `(user_id, model_id, entity_id)`.
pub trait EmbeddingStore
where
	Self: Send + Sync,
{
	fn get_by_ids<'a>(
		&'a self,
		user_id: i64,
		model_id: &'a str,
		entity_ids: &'a [i64],
	) -> BoxFuture<'a, purse_storage::Result<HashMap<i64, CachedEmbedding>>>;

	fn delete_not_in<'a>(
		&'a self,
		user_id: i64,
		model_id: &'a str,
		entity_ids: &'a [i64],
	) -> BoxFuture<'a, purse_storage::Result<u64>>;

	/// Upserts every entry atomically.
	fn replace<'a>(
		&'a self,
		entries: &'a [EmbeddingWrite],
	) -> BoxFuture<'a, purse_storage::Result<()>>;

	fn purge<'a>(
		&'a self,
		user_id: i64,
		model_id: &'a str,
	) -> BoxFuture<'a, purse_storage::Result<u64>>;
}

/// Read access to a user's bookkeeping data.
pub trait Ledger
where
	Self: Send + Sync,
{
	/// Transactions at or before `max_time`, newest first.
	fn transactions_before<'a>(
		&'a self,
		user_id: i64,
		max_time: i64,
		offset: usize,
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<TransactionRecord>>>;

	fn accounts<'a>(&'a self, user_id: i64) -> BoxFuture<'a, Result<Vec<Account>>>;

	fn categories<'a>(
		&'a self,
		user_id: i64,
		category_ids: &'a [i64],
	) -> BoxFuture<'a, Result<Vec<Category>>>;

	fn transaction_tag_ids<'a>(
		&'a self,
		user_id: i64,
		transaction_ids: &'a [i64],
	) -> BoxFuture<'a, Result<HashMap<i64, Vec<i64>>>>;

	fn tags<'a>(&'a self, user_id: i64, tag_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<Tag>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { embedding, generation }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider }
	}
}

pub struct PurseService {
	pub cfg: Config,
	pub store: Arc<dyn EmbeddingStore>,
	pub ledger: Arc<dyn Ledger>,
	pub providers: Providers,
}
impl PurseService {
	pub fn new(cfg: Config, store: Arc<dyn EmbeddingStore>, ledger: Arc<dyn Ledger>) -> Self {
		Self { cfg, store, ledger, providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		store: Arc<dyn EmbeddingStore>,
		ledger: Arc<dyn Ledger>,
		providers: Providers,
	) -> Self {
		Self { cfg, store, ledger, providers }
	}

	pub fn embedding_cache(&self) -> EmbeddingCache<'_> {
		EmbeddingCache {
			cfg: &self.cfg.providers.embedding,
			store: self.store.as_ref(),
			provider: self.providers.embedding.as_ref(),
		}
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, purse_providers::Result<Vec<Vec<f64>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl GenerationProvider for DefaultProviders {
	fn stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		instructions: &'a str,
		input: &'a str,
	) -> BoxFuture<'a, purse_providers::Result<ByteStream>> {
		Box::pin(responses::stream(cfg, instructions, input))
	}
}

impl EmbeddingStore for Db {
	fn get_by_ids<'a>(
		&'a self,
		user_id: i64,
		model_id: &'a str,
		entity_ids: &'a [i64],
	) -> BoxFuture<'a, purse_storage::Result<HashMap<i64, CachedEmbedding>>> {
		Box::pin(embeddings::get_by_ids(&self.pool, user_id, model_id, entity_ids))
	}

	fn delete_not_in<'a>(
		&'a self,
		user_id: i64,
		model_id: &'a str,
		entity_ids: &'a [i64],
	) -> BoxFuture<'a, purse_storage::Result<u64>> {
		Box::pin(embeddings::delete_not_in(&self.pool, user_id, model_id, entity_ids))
	}

	fn replace<'a>(
		&'a self,
		entries: &'a [EmbeddingWrite],
	) -> BoxFuture<'a, purse_storage::Result<()>> {
		Box::pin(embeddings::replace(&self.pool, entries))
	}

	fn purge<'a>(
		&'a self,
		user_id: i64,
		model_id: &'a str,
	) -> BoxFuture<'a, purse_storage::Result<u64>> {
		Box::pin(embeddings::purge(&self.pool, user_id, model_id))
	}
}
