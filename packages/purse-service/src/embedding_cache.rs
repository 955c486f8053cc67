//! Fetch-or-compute embeddings for knowledge items against the persisted cache.

use std::collections::HashSet;

use purse_config::EmbeddingProviderConfig;
use purse_domain::knowledge::KnowledgeItem;
use purse_storage::models::EmbeddingWrite;

use crate::{EmbeddingProvider, EmbeddingStore, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEmbeddings {
	pub query: Vec<f64>,
	/// Every item with a positive id, each carrying its embedding.
	pub items: Vec<KnowledgeItem>,
}

pub struct EmbeddingCache<'a> {
	pub cfg: &'a EmbeddingProviderConfig,
	pub store: &'a dyn EmbeddingStore,
	pub provider: &'a dyn EmbeddingProvider,
}
impl EmbeddingCache<'_> {
	/// Embeds the query and every item, reusing cached vectors whose content hash still matches.
	///
	/// Rows for ids missing from `items` are deleted first. Fresh vectors are written back in one
	/// atomic replace, so a failure leaves the cache as it was after the cleanup.
	pub async fn resolve(
		&self,
		user_id: i64,
		query_text: &str,
		items: Vec<KnowledgeItem>,
	) -> Result<ResolvedEmbeddings> {
		let model_id = self.model_id()?;

		if user_id <= 0 {
			return Err(Error::InvalidRequest {
				message: "user_id must be greater than zero.".to_string(),
			});
		}

		let mut items: Vec<KnowledgeItem> =
			items.into_iter().filter(|item| item.reference_id() > 0).collect();
		let entity_ids = unique_ids(&items);
		let deleted = self.store.delete_not_in(user_id, model_id, &entity_ids).await?;
		let cached = self.store.get_by_ids(user_id, model_id, &entity_ids).await?;
		let mut misses = Vec::new();

		for (idx, item) in items.iter_mut().enumerate() {
			let hit = cached
				.get(&item.reference_id())
				.filter(|row| row.content_hash == item.content_hash)
				.and_then(|row| decode_vector(item.reference_id(), &row.vector));

			match hit {
				Some(vector) => item.embedding = Some(vector),
				None => misses.push(idx),
			}
		}

		tracing::debug!(
			user_id,
			model_id,
			deleted,
			hits = items.len() - misses.len(),
			misses = misses.len(),
			"Reconciled embedding cache."
		);

		let mut inputs = Vec::with_capacity(misses.len() + 1);

		inputs.push(query_text.to_string());
		inputs.extend(misses.iter().map(|idx| items[*idx].text.clone()));

		let mut vectors = self.embed_batched(&inputs).await?.into_iter();
		let Some(query) = vectors.next() else {
			return Err(Error::RemoteApi {
				message: "Embedding provider returned no query vector.".to_string(),
			});
		};
		let mut writes = Vec::with_capacity(misses.len());

		for (idx, vector) in misses.iter().zip(vectors) {
			let item = &mut items[*idx];
			let encoded = serde_json::to_string(&vector).map_err(|err| Error::Persistence {
				message: format!("Failed to encode embedding: {err}."),
			})?;

			writes.push(EmbeddingWrite {
				user_id,
				model_id: model_id.to_string(),
				entity_id: item.reference_id(),
				content_hash: item.content_hash.clone(),
				vector: encoded,
			});

			item.embedding = Some(vector);
		}

		if !writes.is_empty() {
			self.store.replace(&writes).await?;
		}

		Ok(ResolvedEmbeddings { query, items })
	}

	/// Drops every cached row of the user under the configured model.
	pub async fn purge(&self, user_id: i64) -> Result<u64> {
		let model_id = self.model_id()?;

		Ok(self.store.purge(user_id, model_id).await?)
	}

	fn model_id(&self) -> Result<&str> {
		if self.cfg.api_key.trim().is_empty() {
			return Err(Error::Configuration {
				message: "providers.embedding.api_key must be non-empty.".to_string(),
			});
		}

		let model_id = self.cfg.model.trim();

		if model_id.is_empty() {
			return Err(Error::Configuration {
				message: "providers.embedding.model must be non-empty.".to_string(),
			});
		}

		Ok(model_id)
	}

	async fn embed_batched(&self, inputs: &[String]) -> Result<Vec<Vec<f64>>> {
		let batch_size = (self.cfg.batch_size as usize).max(1);
		let mut vectors = Vec::with_capacity(inputs.len());

		for batch in inputs.chunks(batch_size) {
			let embedded = self.provider.embed(self.cfg, batch).await?;

			if embedded.len() != batch.len() {
				return Err(Error::RemoteApi {
					message: format!(
						"Embedding batch returned {} vectors for {} inputs.",
						embedded.len(),
						batch.len()
					),
				});
			}
			if embedded.iter().any(|vector| vector.is_empty()) {
				return Err(Error::RemoteApi {
					message: "Embedding batch returned an empty vector.".to_string(),
				});
			}

			vectors.extend(embedded);
		}

		if vectors.len() != inputs.len() {
			return Err(Error::RemoteApi {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					inputs.len()
				),
			});
		}

		Ok(vectors)
	}
}

fn unique_ids(items: &[KnowledgeItem]) -> Vec<i64> {
	let mut seen = HashSet::new();

	items.iter().map(KnowledgeItem::reference_id).filter(|id| seen.insert(*id)).collect()
}

fn decode_vector(entity_id: i64, raw: &str) -> Option<Vec<f64>> {
	match serde_json::from_str::<Vec<f64>>(raw) {
		Ok(vector) if !vector.is_empty() => Some(vector),
		Ok(_) => {
			tracing::debug!(entity_id, "Cached embedding is empty.");

			None
		},
		Err(err) => {
			tracing::debug!(entity_id, error = %err, "Cached embedding is not a numeric array.");

			None
		},
	}
}
