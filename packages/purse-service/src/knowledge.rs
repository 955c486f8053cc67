//! Loads the bounded transaction window and turns it into knowledge items.

use std::collections::{HashMap, HashSet};

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use purse_domain::{
	knowledge::{self, KnowledgeItem, KnowledgeLookups},
	ledger::TransactionRecord,
};

use crate::{PurseService, Result};

impl PurseService {
	/// Pages newest-first transactions until the count limit or the coverage start is reached.
	pub async fn load_window(
		&self,
		user_id: i64,
		offset: UtcOffset,
		now: OffsetDateTime,
	) -> Result<Vec<TransactionRecord>> {
		let assistant = &self.cfg.assistant;
		let page_size = assistant.knowledge_page_size.max(1) as usize;
		let max_transactions = assistant.knowledge_max_transactions as usize;
		let coverage_start = coverage_start(now, offset, assistant.history_coverage_years);
		let max_time = now.unix_timestamp();
		let mut records: Vec<TransactionRecord> = Vec::with_capacity(page_size);

		while records.len() < max_transactions {
			let limit = page_size.min(max_transactions - records.len());
			let page =
				self.ledger.transactions_before(user_id, max_time, records.len(), limit).await?;
			let Some(oldest) = page.last().map(|record| record.time) else {
				break;
			};
			let short_page = page.len() < limit;

			records.extend(page);

			if oldest <= coverage_start || short_page {
				break;
			}
		}

		tracing::debug!(user_id, count = records.len(), coverage_start, "Loaded knowledge window.");

		Ok(records)
	}

	/// Resolves the lookups the window needs and builds its knowledge items.
	pub async fn build_knowledge(
		&self,
		user_id: i64,
		records: &[TransactionRecord],
		offset: UtcOffset,
	) -> Result<Vec<KnowledgeItem>> {
		let accounts = self
			.ledger
			.accounts(user_id)
			.await?
			.into_iter()
			.map(|account| (account.id, account))
			.collect::<HashMap<_, _>>();
		let transaction_ids = unique(records.iter().map(TransactionRecord::knowledge_id));
		let category_ids = unique(records.iter().map(|record| record.category_id));
		let categories = self
			.ledger
			.categories(user_id, &category_ids)
			.await?
			.into_iter()
			.map(|category| (category.id, category))
			.collect::<HashMap<_, _>>();
		let transaction_tags = self.ledger.transaction_tag_ids(user_id, &transaction_ids).await?;
		let tag_ids = unique(transaction_tags.values().flatten().copied());
		let tags = if tag_ids.is_empty() {
			HashMap::new()
		} else {
			self.ledger
				.tags(user_id, &tag_ids)
				.await?
				.into_iter()
				.map(|tag| (tag.id, tag))
				.collect::<HashMap<_, _>>()
		};
		let lookups = KnowledgeLookups {
			accounts: &accounts,
			categories: &categories,
			transaction_tags: &transaction_tags,
			tags: &tags,
		};

		Ok(knowledge::build_knowledge_items(records, &lookups, offset))
	}
}

/// Unix time of January 1st, `years` years before the current year in `offset`.
pub fn coverage_start(now: OffsetDateTime, offset: UtcOffset, years: u32) -> i64 {
	let year = now.to_offset(offset).year() - years as i32;

	Date::from_calendar_date(year, Month::January, 1)
		.map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(offset))
		.map(|start| start.unix_timestamp())
		.unwrap_or(i64::MIN)
}

fn unique<I>(ids: I) -> Vec<i64>
where
	I: IntoIterator<Item = i64>,
{
	let mut seen = HashSet::new();

	ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
