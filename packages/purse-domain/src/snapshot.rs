use std::collections::{BTreeMap, HashMap};

use time::{OffsetDateTime, UtcOffset};

use crate::{
	format::{self, format_amount},
	knowledge::KnowledgeItem,
	ledger::TransactionType,
};

pub const NO_DATA: &str = "No available bill data.";

const UNKNOWN_CURRENCY: &str = "UNKNOWN";
const UNCATEGORIZED: &str = "Uncategorized";
const TOP_EXPENSE_CATEGORIES: usize = 5;

#[derive(Debug, Default)]
struct CashFlow {
	income: i64,
	expense: i64,
	transfer_out: i64,
	transfer_in: i64,
}

#[derive(Debug)]
struct CategorySpend {
	category: String,
	currency: String,
	amount: i64,
}

/// Summarizes the whole knowledge window as prompt text.
///
/// "This month" is the calendar month of `now` in `offset`.
pub fn build_financial_snapshot(
	items: &[KnowledgeItem],
	offset: UtcOffset,
	now: OffsetDateTime,
) -> String {
	if items.is_empty() {
		return NO_DATA.to_string();
	}

	let current_month = format::year_month(now.unix_timestamp(), offset);
	let mut overall: BTreeMap<String, CashFlow> = BTreeMap::new();
	let mut this_month: BTreeMap<String, CashFlow> = BTreeMap::new();
	let mut categories: Vec<CategorySpend> = Vec::new();
	let mut category_index: HashMap<(String, String), usize> = HashMap::new();
	let mut oldest: Option<i64> = None;
	let mut latest: Option<i64> = None;

	for item in items {
		let reference = &item.reference;

		oldest = Some(oldest.map_or(reference.time, |t| t.min(reference.time)));
		latest = Some(latest.map_or(reference.time, |t| t.max(reference.time)));

		let currency = if reference.currency.is_empty() {
			UNKNOWN_CURRENCY.to_string()
		} else {
			reference.currency.clone()
		};
		let in_month = current_month.is_some()
			&& format::year_month(reference.time, offset) == current_month;

		overall.entry(currency.clone()).or_default();

		match reference.kind {
			TransactionType::Income => {
				add(&mut overall, &mut this_month, &currency, in_month, |flow| {
					flow.income = flow.income.saturating_add(reference.source_amount)
				});
			},
			TransactionType::Expense => {
				add(&mut overall, &mut this_month, &currency, in_month, |flow| {
					flow.expense = flow.expense.saturating_add(reference.source_amount)
				});

				let category = if reference.category_name.is_empty() {
					UNCATEGORIZED.to_string()
				} else {
					reference.category_name.clone()
				};
				let key = (currency.clone(), category.clone());

				match category_index.get(&key) {
					Some(&idx) => {
						let spend = &mut categories[idx];

						spend.amount = spend.amount.saturating_add(reference.source_amount);
					},
					None => {
						category_index.insert(key, categories.len());
						categories.push(CategorySpend {
							category,
							currency,
							amount: reference.source_amount,
						});
					},
				}
			},
			TransactionType::Transfer => {
				add(&mut overall, &mut this_month, &currency, in_month, |flow| {
					flow.transfer_out = flow.transfer_out.saturating_add(reference.source_amount)
				});

				if !reference.destination_currency.is_empty() {
					add(
						&mut overall,
						&mut this_month,
						&reference.destination_currency,
						in_month,
						|flow| {
							flow.transfer_in = flow.transfer_in.saturating_add(reference.destination_amount)
						},
					);
				}
			},
			TransactionType::Unknown => {
				if in_month {
					this_month.entry(currency).or_default();
				}
			},
		}
	}

	let mut out = format!(
		"Transaction count: {}\nDate range: {} ~ {}\nOverall cash flow by currency:",
		items.len(),
		format::format_long_date_time(oldest.unwrap_or_default(), offset),
		format::format_long_date_time(latest.unwrap_or_default(), offset),
	);

	push_cash_flow_lines(&mut out, &overall);
	out.push_str("\nThis month cash flow by currency:");
	push_cash_flow_lines(&mut out, &this_month);
	out.push_str("\nTop expense categories:");
	push_top_categories(&mut out, categories);

	out
}

fn add<F>(
	overall: &mut BTreeMap<String, CashFlow>,
	this_month: &mut BTreeMap<String, CashFlow>,
	currency: &str,
	in_month: bool,
	apply: F,
) where
	F: Fn(&mut CashFlow),
{
	apply(overall.entry(currency.to_string()).or_default());

	if in_month {
		apply(this_month.entry(currency.to_string()).or_default());
	}
}

fn push_cash_flow_lines(out: &mut String, flows: &BTreeMap<String, CashFlow>) {
	if flows.is_empty() {
		out.push_str("\n- No data");

		return;
	}

	for (currency, flow) in flows {
		out.push_str(&format!(
			"\n- {currency}: income {}, expense {}, net {}, transfer_out {}, transfer_in {}",
			format_amount(flow.income),
			format_amount(flow.expense),
			format_amount(flow.income.saturating_sub(flow.expense)),
			format_amount(flow.transfer_out),
			format_amount(flow.transfer_in),
		));
	}
}

fn push_top_categories(out: &mut String, mut categories: Vec<CategorySpend>) {
	if categories.is_empty() {
		out.push_str("\n- No expense data");

		return;
	}

	categories.sort_by(|a, b| b.amount.cmp(&a.amount));
	categories.truncate(TOP_EXPENSE_CATEGORIES);

	for spend in categories {
		out.push_str(&format!(
			"\n- {} ({}): {}",
			spend.category,
			spend.currency,
			format_amount(spend.amount)
		));
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;
	use crate::knowledge::ReferencedTransaction;

	fn item(
		id: i64,
		kind: TransactionType,
		amount: i64,
		currency: &str,
		time: OffsetDateTime,
	) -> KnowledgeItem {
		KnowledgeItem {
			reference: ReferencedTransaction {
				id,
				time: time.unix_timestamp(),
				time_text: String::new(),
				kind,
				category_name: String::new(),
				source_account_name: String::new(),
				destination_account_name: String::new(),
				source_amount: amount,
				destination_amount: 0,
				currency: currency.to_string(),
				destination_currency: String::new(),
				comment: String::new(),
				similarity_score: 0.0,
			},
			text: String::new(),
			content_hash: format!("hash-{id}"),
			embedding: None,
		}
	}

	#[test]
	fn empty_input_has_fixed_text() {
		assert_eq!(
			build_financial_snapshot(&[], UtcOffset::UTC, OffsetDateTime::UNIX_EPOCH),
			NO_DATA
		);
	}

	#[test]
	fn transfers_split_across_currencies() {
		let now = datetime!(2025-06-20 12:00 UTC);
		let mut food = item(2, TransactionType::Expense, 4_000, "USD", now);
		let mut transfer = item(3, TransactionType::Transfer, 2_000, "USD", now);

		food.reference.category_name = "Food".to_string();
		transfer.reference.destination_amount = 2_000;
		transfer.reference.destination_currency = "EUR".to_string();

		let salary =
			item(1, TransactionType::Income, 10_000, "USD", datetime!(2025-05-02 08:00 UTC));
		let items = vec![salary, food, transfer];
		let snapshot = build_financial_snapshot(&items, UtcOffset::UTC, now);

		assert_eq!(
			snapshot,
			"Transaction count: 3\n\
			 Date range: 2025-05-02 08:00:00 ~ 2025-06-20 12:00:00\n\
			 Overall cash flow by currency:\n\
			 - EUR: income 0.00, expense 0.00, net 0.00, transfer_out 0.00, transfer_in 20.00\n\
			 - USD: income 100.00, expense 40.00, net 60.00, transfer_out 20.00, transfer_in 0.00\n\
			 This month cash flow by currency:\n\
			 - EUR: income 0.00, expense 0.00, net 0.00, transfer_out 0.00, transfer_in 20.00\n\
			 - USD: income 0.00, expense 40.00, net -40.00, transfer_out 20.00, transfer_in 0.00\n\
			 Top expense categories:\n\
			 - Food (USD): 40.00"
		);
	}

	#[test]
	fn missing_names_fall_back_and_categories_are_capped() {
		let now = datetime!(2025-06-20 12:00 UTC);
		let last_year = datetime!(2024-01-01 00:00 UTC);
		let mut items = vec![item(1, TransactionType::Expense, 500, "", last_year)];

		for (idx, name) in ["A", "B", "C", "D", "E", "F"].iter().enumerate() {
			let mut spend = item(idx as i64 + 10, TransactionType::Expense, 100, "CNY", last_year);

			spend.reference.category_name = name.to_string();
			items.push(spend);
		}

		let snapshot = build_financial_snapshot(&items, UtcOffset::UTC, now);

		assert!(snapshot.contains("- UNKNOWN: income 0.00, expense 5.00"));
		assert!(snapshot.contains("This month cash flow by currency:\n- No data\n"));
		assert!(snapshot.ends_with(
			"Top expense categories:\n- Uncategorized (UNKNOWN): 5.00\n- A (CNY): 1.00\n\
			 - B (CNY): 1.00\n- C (CNY): 1.00\n- D (CNY): 1.00"
		));
	}

	#[test]
	fn extreme_amounts_saturate() {
		let now = datetime!(2025-06-20 12:00 UTC);
		let mut items = Vec::new();

		for id in 0..2 {
			let mut spend = item(id, TransactionType::Expense, i64::MAX, "USD", now);

			spend.reference.category_name = "Rent".to_string();
			items.push(spend);
			items.push(item(id + 10, TransactionType::Income, i64::MAX, "USD", now));
		}

		let mut refund = item(20, TransactionType::Income, i64::MIN, "EUR", now);

		refund.reference.category_name = "Refund".to_string();
		items.push(refund);
		items.push(item(21, TransactionType::Expense, i64::MAX, "EUR", now));

		let snapshot = build_financial_snapshot(&items, UtcOffset::UTC, now);

		assert!(snapshot.contains(
			"- USD: income 92233720368547758.07, expense 92233720368547758.07, net 0.00"
		));
		assert!(snapshot.contains(
			"- EUR: income -92233720368547758.08, expense 92233720368547758.07, \
			 net -92233720368547758.08"
		));
		assert!(snapshot.contains("- Rent (USD): 92233720368547758.07"));
	}

	#[test]
	fn balance_adjustments_only_count() {
		let now = datetime!(2025-06-20 12:00 UTC);
		let adjustment =
			item(1, TransactionType::Unknown, 999, "USD", datetime!(2024-03-01 00:00 UTC));
		let items = vec![adjustment];
		let snapshot = build_financial_snapshot(&items, UtcOffset::UTC, now);

		assert!(snapshot.starts_with("Transaction count: 1\n"));
		assert!(snapshot.contains("- USD: income 0.00, expense 0.00, net 0.00"));
		assert!(snapshot.ends_with("Top expense categories:\n- No expense data"));
	}
}
