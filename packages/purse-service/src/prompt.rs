//! Prompt sections sent to the generation model.

use purse_domain::{format, knowledge::ReferencedTransaction, retrieval::RetrievedItem};

use crate::chat::{ChatMode, ChatRequest};

pub const NO_MATCHED_TRANSACTIONS: &str = "No matched transactions.";

const SUMMARY_QUERY_PREFIX: &str = "personal finance summary and bookkeeping suggestions focus: ";
const SUMMARY_QUERY_DEFAULT: &str =
	"summarize recent personal finance trends, spending, risks, and bookkeeping suggestions";
const SUMMARY_REQUEST: &str = "Please provide a personal finance summary and practical bookkeeping \
	suggestions based on my bill data.";

/// Text embedded to search the knowledge base.
///
/// Chat mode appends the recent user turns so follow-up questions keep their context.
pub fn embedding_query_text(req: &ChatRequest, mode: ChatMode, max_history: usize) -> String {
	let message = req.message.trim();

	match mode {
		ChatMode::Summary if message.is_empty() => SUMMARY_QUERY_DEFAULT.to_string(),
		ChatMode::Summary => format!("{SUMMARY_QUERY_PREFIX}{message}"),
		ChatMode::Chat => {
			let mut query = message.to_string();

			for entry in recent(&req.history, max_history) {
				let content = entry.content.trim();

				if entry.role.trim() != "user" || content.is_empty() {
					continue;
				}

				query.push('\n');
				query.push_str(content);
			}

			query.trim().to_string()
		},
	}
}

pub fn user_prompt(req: &ChatRequest, mode: ChatMode, max_history: usize) -> String {
	let message = req.message.trim();
	let mut prompt = match mode {
		ChatMode::Summary if message.is_empty() => SUMMARY_REQUEST.to_string(),
		ChatMode::Summary => format!("{SUMMARY_REQUEST}\nAdditional focus: {message}"),
		ChatMode::Chat => format!("Latest user message:\n{message}"),
	};
	let history: Vec<String> = recent(&req.history, max_history)
		.iter()
		.filter_map(|entry| {
			let role = entry.role.trim();
			let content = entry.content.trim();

			(!role.is_empty() && !content.is_empty())
				.then(|| format!("{}: {content}", role.to_uppercase()))
		})
		.collect();

	if !history.is_empty() {
		prompt.push_str("\n\nConversation history:\n");
		prompt.push_str(&history.join("\n"));
	}

	prompt
}

pub fn retrieved_knowledge_text(retrieved: &[RetrievedItem]) -> String {
	if retrieved.is_empty() {
		return NO_MATCHED_TRANSACTIONS.to_string();
	}

	retrieved
		.iter()
		.enumerate()
		.map(|(idx, hit)| {
			format!("[{}] similarity={}\n{}", idx + 1, format::round_score(hit.score), hit.item.text)
		})
		.collect::<Vec<_>>()
		.join("\n\n")
}

pub fn system_prompt(
	current_date_time: &str,
	mode: ChatMode,
	snapshot: &str,
	retrieved_knowledge: &str,
) -> String {
	let prompt = format!(
		"You are a personal finance assistant inside a bookkeeping app.\n\
		 Ground every statement in the user's bill data below. If the data does not answer the \
		 question, say so instead of guessing. Amounts are in the currency shown next to them.\n\
		 \n\
		 Current date and time: {current_date_time}\n\
		 Conversation mode: {mode}\n\
		 \n\
		 Financial snapshot:\n\
		 {snapshot}\n\
		 \n\
		 Retrieved transactions:\n\
		 {retrieved_knowledge}\n",
		mode = mode.as_str(),
	);

	prompt.replace("\r\n", "\n")
}

/// Citations for the first `max` retrieved items with rounded scores.
pub fn references(retrieved: &[RetrievedItem], max: usize) -> Vec<ReferencedTransaction> {
	retrieved
		.iter()
		.take(max)
		.map(|hit| {
			let mut reference = hit.item.reference.clone();

			reference.similarity_score = format::round_score(hit.score);

			reference
		})
		.collect()
}

pub fn no_data_reply(mode: ChatMode) -> &'static str {
	match mode {
		ChatMode::Summary =>
			"There is no bill data available for summary yet. Please add transactions first.",
		ChatMode::Chat => "I do not have enough bill data yet. Please add some transactions first.",
	}
}

fn recent<T>(history: &[T], max: usize) -> &[T] {
	&history[history.len().saturating_sub(max)..]
}

#[cfg(test)]
mod tests {
	use purse_domain::{knowledge::KnowledgeItem, ledger::TransactionType};

	use super::*;
	use crate::chat::HistoryMessage;

	fn turn(role: &str, content: &str) -> HistoryMessage {
		HistoryMessage { role: role.to_string(), content: content.to_string() }
	}

	fn request(message: &str, history: Vec<HistoryMessage>) -> ChatRequest {
		ChatRequest { mode: String::new(), message: message.to_string(), history }
	}

	fn hit(id: i64, score: f64) -> RetrievedItem {
		RetrievedItem {
			item: KnowledgeItem {
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
				embedding: None,
			},
			score,
		}
	}

	#[test]
	fn summary_query_uses_focus_or_default() {
		assert_eq!(
			embedding_query_text(&request("  travel ", vec![]), ChatMode::Summary, 12),
			"personal finance summary and bookkeeping suggestions focus: travel"
		);
		assert_eq!(
			embedding_query_text(&request("", vec![]), ChatMode::Summary, 12),
			SUMMARY_QUERY_DEFAULT
		);
	}

	#[test]
	fn chat_query_appends_recent_user_turns() {
		let history = vec![
			turn("user", "too old"),
			turn("user", "groceries last month"),
			turn("assistant", "You spent 120.00."),
			turn("user", "  "),
			turn("user", "and dining?"),
		];
		let query = embedding_query_text(&request("compare both", history), ChatMode::Chat, 4);

		assert_eq!(query, "compare both\ngroceries last month\nand dining?");
	}

	#[test]
	fn user_prompt_lists_history_with_upper_roles() {
		let history = vec![turn("user", "hi"), turn("", "dropped"), turn("assistant", "hello")];
		let prompt = user_prompt(&request("how much?", history), ChatMode::Chat, 12);

		assert_eq!(
			prompt,
			"Latest user message:\nhow much?\n\nConversation history:\nUSER: hi\nASSISTANT: hello"
		);
	}

	#[test]
	fn summary_prompt_adds_focus() {
		assert_eq!(
			user_prompt(&request("rent", vec![]), ChatMode::Summary, 12),
			format!("{SUMMARY_REQUEST}\nAdditional focus: rent")
		);
		assert_eq!(user_prompt(&request("", vec![]), ChatMode::Summary, 12), SUMMARY_REQUEST);
	}

	#[test]
	fn history_is_truncated_to_most_recent() {
		let history: Vec<HistoryMessage> =
			(0..20).map(|idx| turn("user", &format!("turn {idx}"))).collect();
		let prompt = user_prompt(&request("now", history), ChatMode::Chat, 12);

		assert!(!prompt.contains("turn 7\n"));
		assert!(prompt.contains("USER: turn 8\n"));
		assert!(prompt.ends_with("USER: turn 19"));
	}

	#[test]
	fn knowledge_blocks_are_numbered_with_rounded_scores() {
		let text = retrieved_knowledge_text(&[hit(4, 0.987_654), hit(2, 1.0)]);

		assert_eq!(
			text,
			"[1] similarity=0.9877\ntransaction_id: 4\n\n[2] similarity=1\ntransaction_id: 2"
		);
		assert_eq!(retrieved_knowledge_text(&[]), NO_MATCHED_TRANSACTIONS);
	}

	#[test]
	fn references_are_capped_and_scored() {
		let hits: Vec<RetrievedItem> = (1..=10).map(|id| hit(id, 0.123_456)).collect();
		let refs = references(&hits, 8);

		assert_eq!(refs.len(), 8);
		assert_eq!(refs[0].similarity_score, 0.1235);
		assert_eq!(refs[7].id, 8);
	}

	#[test]
	fn system_prompt_carries_sections() {
		let prompt = system_prompt("2026-01-02 03:04:05", ChatMode::Summary, "snap\r\nshot", "k");

		assert!(prompt.contains("Current date and time: 2026-01-02 03:04:05\n"));
		assert!(prompt.contains("Conversation mode: summary\n"));
		assert!(prompt.contains("Financial snapshot:\nsnap\nshot\n"));
		assert!(prompt.contains("Retrieved transactions:\nk\n"));
		assert!(!prompt.contains('\r'));
	}
}
