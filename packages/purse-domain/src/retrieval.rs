use std::cmp::Ordering;

use crate::knowledge::KnowledgeItem;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedItem {
	pub item: KnowledgeItem,
	pub score: f64,
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns `0.0` when the lengths differ, either vector is empty, or either norm is zero.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
	if a.is_empty() || a.len() != b.len() {
		return 0.0;
	}

	let mut dot = 0.0;
	let mut norm_a = 0.0;
	let mut norm_b = 0.0;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scores every item against the query and keeps the `k` best.
///
/// Items without an embedding score zero. Equal scores keep their input order.
pub fn select_top_k(query: &[f64], items: &[KnowledgeItem], k: usize) -> Vec<RetrievedItem> {
	if k == 0 || items.is_empty() {
		return Vec::new();
	}

	let mut scored: Vec<(usize, f64)> = items
		.iter()
		.enumerate()
		.map(|(idx, item)| {
			let score = item
				.embedding
				.as_deref()
				.map(|embedding| cosine_similarity(query, embedding))
				.unwrap_or(0.0);

			(idx, score)
		})
		.collect();

	scored.sort_by(|a, b| cmp_f64_desc(a.1, b.1));
	scored.truncate(k);

	scored
		.into_iter()
		.map(|(idx, score)| RetrievedItem { item: items[idx].clone(), score })
		.collect()
}

fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{knowledge::ReferencedTransaction, ledger::TransactionType};

	fn item(id: i64, embedding: Option<Vec<f64>>) -> KnowledgeItem {
		KnowledgeItem {
			reference: ReferencedTransaction {
				id,
				time: 0,
				time_text: String::new(),
				kind: TransactionType::Expense,
				category_name: String::new(),
				source_account_name: String::new(),
				destination_account_name: String::new(),
				source_amount: 0,
				destination_amount: 0,
				currency: String::new(),
				destination_currency: String::new(),
				comment: String::new(),
				similarity_score: 0.0,
			},
			text: format!("transaction_id: {id}"),
			content_hash: format!("hash-{id}"),
			embedding,
		}
	}

	#[test]
	fn self_similarity_is_one_and_orthogonal_is_zero() {
		let v = [0.3, -1.2, 4.0];

		assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
		assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-12);
	}

	#[test]
	fn degenerate_vectors_score_zero() {
		assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
		assert_eq!(cosine_similarity(&[], &[]), 0.0);
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
	}

	#[test]
	fn top_k_is_sorted_and_bounded() {
		let items = vec![
			item(1, Some(vec![0.0, 1.0])),
			item(2, Some(vec![1.0, 0.0])),
			item(3, Some(vec![1.0, 1.0])),
			item(4, Some(vec![1.0, 0.0, 0.0])),
			item(5, None),
		];
		let top = select_top_k(&[1.0, 0.0], &items, 3);
		let ids: Vec<i64> = top.iter().map(|r| r.item.reference_id()).collect();

		assert_eq!(ids, vec![2, 3, 1]);
		assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
		assert!(select_top_k(&[1.0, 0.0], &items, 0).is_empty());
		assert_eq!(select_top_k(&[1.0, 0.0], &items, 50).len(), items.len());
	}

	#[test]
	fn equal_scores_keep_input_order() {
		let items = vec![
			item(7, Some(vec![2.0, 0.0])),
			item(3, Some(vec![1.0, 0.0])),
			item(5, Some(vec![4.0, 0.0])),
		];
		let ids: Vec<i64> = select_top_k(&[1.0, 0.0], &items, 3)
			.iter()
			.map(|r| r.item.reference_id())
			.collect();

		assert_eq!(ids, vec![7, 3, 5]);
	}
}
