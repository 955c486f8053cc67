use std::collections::HashMap;

use serde::Deserialize;

use purse_domain::ledger::{Account, Category, Tag, TransactionRecord};

use crate::{BoxFuture, Ledger, Result};

/// A single-user ledger held in memory, typically loaded from a JSON export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryLedger {
	#[serde(default)]
	pub accounts: Vec<Account>,
	#[serde(default)]
	pub categories: Vec<Category>,
	#[serde(default)]
	pub tags: Vec<Tag>,
	#[serde(default)]
	pub transactions: Vec<TransactionRecord>,
	/// Transaction id to tag ids.
	#[serde(default)]
	pub transaction_tags: HashMap<i64, Vec<i64>>,
}
impl MemoryLedger {
	fn page(&self, max_time: i64, offset: usize, limit: usize) -> Vec<TransactionRecord> {
		let mut eligible: Vec<&TransactionRecord> =
			self.transactions.iter().filter(|record| record.time <= max_time).collect();

		eligible.sort_by(|a, b| {
			b.time.cmp(&a.time).then_with(|| b.transaction_id.cmp(&a.transaction_id))
		});

		eligible.into_iter().skip(offset).take(limit).cloned().collect()
	}
}

impl Ledger for MemoryLedger {
	fn transactions_before<'a>(
		&'a self,
		_user_id: i64,
		max_time: i64,
		offset: usize,
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<TransactionRecord>>> {
		let page = self.page(max_time, offset, limit);

		Box::pin(async move { Ok(page) })
	}

	fn accounts<'a>(&'a self, _user_id: i64) -> BoxFuture<'a, Result<Vec<Account>>> {
		Box::pin(async move { Ok(self.accounts.clone()) })
	}

	fn categories<'a>(
		&'a self,
		_user_id: i64,
		category_ids: &'a [i64],
	) -> BoxFuture<'a, Result<Vec<Category>>> {
		Box::pin(async move {
			Ok(self
				.categories
				.iter()
				.filter(|category| category_ids.contains(&category.id))
				.cloned()
				.collect())
		})
	}

	fn transaction_tag_ids<'a>(
		&'a self,
		_user_id: i64,
		transaction_ids: &'a [i64],
	) -> BoxFuture<'a, Result<HashMap<i64, Vec<i64>>>> {
		Box::pin(async move {
			Ok(transaction_ids
				.iter()
				.filter_map(|id| self.transaction_tags.get(id).map(|tags| (*id, tags.clone())))
				.collect())
		})
	}

	fn tags<'a>(&'a self, _user_id: i64, tag_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<Tag>>> {
		Box::pin(async move {
			Ok(self.tags.iter().filter(|tag| tag_ids.contains(&tag.id)).cloned().collect())
		})
	}
}
