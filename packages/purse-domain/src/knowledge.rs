use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::{
	format,
	ledger::{Account, Category, Tag, TransactionRecord, TransactionType},
};

/// Denormalized view of one transaction, shared by the prompt, the snapshot and citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedTransaction {
	#[serde(with = "crate::id_string")]
	pub id: i64,
	pub time: i64,
	pub time_text: String,
	#[serde(rename = "type")]
	pub kind: TransactionType,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub category_name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub source_account_name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub destination_account_name: String,
	pub source_amount: i64,
	#[serde(default, skip_serializing_if = "is_zero")]
	pub destination_amount: i64,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub currency: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub destination_currency: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub comment: String,
	#[serde(default)]
	pub similarity_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeItem {
	pub reference: ReferencedTransaction,
	pub text: String,
	pub content_hash: String,
	pub embedding: Option<Vec<f64>>,
}
impl KnowledgeItem {
	pub fn reference_id(&self) -> i64 {
		self.reference.id
	}
}

/// Read-only lookups used to denormalize ledger records.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeLookups<'a> {
	pub accounts: &'a HashMap<i64, Account>,
	pub categories: &'a HashMap<i64, Category>,
	/// Transaction id to tag ids.
	pub transaction_tags: &'a HashMap<i64, Vec<i64>>,
	pub tags: &'a HashMap<i64, Tag>,
}

/// Builds one knowledge item per economically distinct transaction.
///
/// Transfer-in legs collapse onto their outbound leg. Records whose stored type cannot be
/// classified are skipped, and a repeated id keeps its first occurrence.
pub fn build_knowledge_items(
	records: &[TransactionRecord],
	lookups: &KnowledgeLookups<'_>,
	offset: UtcOffset,
) -> Vec<KnowledgeItem> {
	let mut seen = HashSet::new();
	let mut items = Vec::with_capacity(records.len());

	for record in records {
		let Some(kind) = TransactionType::from_db_type(record.db_type) else {
			tracing::debug!(
				transaction_id = record.transaction_id,
				db_type = record.db_type,
				"Skipping transaction with unknown type."
			);

			continue;
		};
		let leg = record.outbound_leg();

		if !seen.insert(leg.transaction_id) {
			continue;
		}

		let reference = reference_for(&leg, kind, lookups, offset);
		let text = canonical_text(&reference, &tag_names(leg.transaction_id, lookups));
		let content_hash = content_hash(&text);

		items.push(KnowledgeItem { reference, text, content_hash, embedding: None });
	}

	items
}

/// Lowercase hex BLAKE3 digest of the canonical text.
pub fn content_hash(text: &str) -> String {
	blake3::hash(text.as_bytes()).to_hex().to_string()
}

fn reference_for(
	leg: &TransactionRecord,
	kind: TransactionType,
	lookups: &KnowledgeLookups<'_>,
	offset: UtcOffset,
) -> ReferencedTransaction {
	let source = lookups.accounts.get(&leg.account_id);
	let category_name =
		lookups.categories.get(&leg.category_id).map(|c| c.name.clone()).unwrap_or_default();
	let mut reference = ReferencedTransaction {
		id: leg.transaction_id,
		time: leg.time,
		time_text: format::format_long_date_time(leg.time, offset),
		kind,
		category_name,
		source_account_name: source.map(|a| a.name.clone()).unwrap_or_default(),
		destination_account_name: String::new(),
		source_amount: leg.amount,
		destination_amount: 0,
		currency: source.map(|a| a.currency.clone()).unwrap_or_default(),
		destination_currency: String::new(),
		comment: leg.comment.clone(),
		similarity_score: 0.0,
	};

	if kind == TransactionType::Transfer {
		let destination = lookups.accounts.get(&leg.related_account_id);

		reference.destination_account_name =
			destination.map(|a| a.name.clone()).unwrap_or_default();
		reference.destination_amount = leg.related_account_amount;
		reference.destination_currency =
			destination.map(|a| a.currency.clone()).unwrap_or_default();
	}

	reference
}

fn tag_names(transaction_id: i64, lookups: &KnowledgeLookups<'_>) -> Vec<String> {
	let Some(tag_ids) = lookups.transaction_tags.get(&transaction_id) else {
		return Vec::new();
	};
	let mut names: Vec<String> = tag_ids
		.iter()
		.filter_map(|id| lookups.tags.get(id))
		.map(|tag| tag.name.clone())
		.filter(|name| !name.is_empty())
		.collect();

	names.sort();

	names
}

fn canonical_text(reference: &ReferencedTransaction, tags: &[String]) -> String {
	let mut lines = vec![
		format!("transaction_id: {}", reference.id),
		format!("time: {}", reference.time_text),
		format!("type: {}", reference.kind.as_str()),
		format!("source_account: {}", reference.source_account_name),
		format!("source_amount: {}", format::format_amount(reference.source_amount)),
		format!("source_currency: {}", reference.currency),
		format!("category: {}", reference.category_name),
	];

	if reference.kind == TransactionType::Transfer {
		lines.push(format!("destination_account: {}", reference.destination_account_name));
		lines.push(format!(
			"destination_amount: {}",
			format::format_amount(reference.destination_amount)
		));
		lines.push(format!("destination_currency: {}", reference.destination_currency));
	}
	if !tags.is_empty() {
		lines.push(format!("tags: {}", tags.join(", ")));
	}
	if !reference.comment.is_empty() {
		lines.push(format!("comment: {}", reference.comment));
	}

	lines.join("\n")
}

fn is_zero(value: &i64) -> bool {
	*value == 0
}
