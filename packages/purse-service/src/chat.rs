//! Chat orchestration: request validation, retrieval, prompt assembly, and generation.

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use purse_domain::{format, knowledge::ReferencedTransaction, retrieval, snapshot};

use crate::{
	Error, PurseService, Result, prompt,
	stream::{self, ChatStreamChunk},
};

pub const MAX_MESSAGE_CHARS: usize = 2_048;
pub const MAX_HISTORY_ENTRIES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
	Chat,
	Summary,
}
impl ChatMode {
	/// Parses a request mode. An empty or blank mode means chat.
	pub fn parse(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"" | "chat" => Ok(Self::Chat),
			"summary" => Ok(Self::Summary),
			other =>
				Err(Error::InvalidRequest { message: format!("Unsupported chat mode: {other}.") }),
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Chat => "chat",
			Self::Summary => "summary",
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
	#[serde(default)]
	pub mode: String,
	#[serde(default)]
	pub message: String,
	#[serde(default)]
	pub history: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryMessage {
	pub role: String,
	pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
	pub mode: ChatMode,
	pub reply: String,
	pub references: Vec<ReferencedTransaction>,
}

/// Who is asking and from which clock.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
	pub user_id: i64,
	pub offset: UtcOffset,
	pub now: OffsetDateTime,
}
impl RequestContext {
	pub fn new(user_id: i64, offset: UtcOffset) -> Self {
		Self { user_id, offset, now: OffsetDateTime::now_utc() }
	}
}

enum Prepared {
	NoData,
	Ready { instructions: String, input: String, references: Vec<ReferencedTransaction> },
}

impl PurseService {
	/// Answers one request, forwarding chunks to `sink` as they are decoded.
	///
	/// A failed stream emits neither `references` nor `done`; deltas already sent stand.
	pub async fn chat_stream(
		&self,
		ctx: &RequestContext,
		req: &ChatRequest,
		sink: &mut (dyn FnMut(ChatStreamChunk) + Send),
	) -> Result<ChatResponse> {
		let mode = self.validate(ctx, req)?;
		let (instructions, input, references) = match self.prepare(ctx, req, mode).await? {
			Prepared::NoData => {
				let reply = prompt::no_data_reply(mode).to_string();

				tracing::info!(user_id = ctx.user_id, mode = mode.as_str(), "No bill data for assistant.");

				sink(ChatStreamChunk::ReplyDelta { delta: reply.clone() });
				sink(ChatStreamChunk::Done { mode, reply: reply.clone(), thinking: String::new() });

				return Ok(ChatResponse { mode, reply, references: Vec::new() });
			},
			Prepared::Ready { instructions, input, references } => (instructions, input, references),
		};
		let body = self
			.providers
			.generation
			.stream(&self.cfg.providers.llm, &instructions, &input)
			.await
			.map_err(|err| {
				tracing::error!(user_id = ctx.user_id, error = %err, "Failed to open generation stream.");

				Error::from(err)
			})?;
		let state = stream::consume(body, ctx.user_id, sink).await?;

		if !references.is_empty() {
			sink(ChatStreamChunk::References { references: references.clone() });
		}

		sink(ChatStreamChunk::Done {
			mode,
			reply: state.reply.clone(),
			thinking: state.thinking.clone(),
		});

		tracing::info!(
			user_id = ctx.user_id,
			mode = mode.as_str(),
			reply_chars = state.reply.chars().count(),
			references = references.len(),
			terminal = state.terminal,
			"Assistant reply completed."
		);

		Ok(ChatResponse { mode, reply: state.reply, references })
	}

	/// Non-streaming variant of [`Self::chat_stream`].
	pub async fn chat(&self, ctx: &RequestContext, req: &ChatRequest) -> Result<ChatResponse> {
		let mut discard = |_: ChatStreamChunk| {};
		let mut response = self.chat_stream(ctx, req, &mut discard).await?;

		response.reply = response.reply.trim().to_string();

		if response.reply.is_empty() {
			return Err(Error::RemoteApi { message: "Generation returned an empty reply.".to_string() });
		}

		Ok(response)
	}

	fn validate(&self, ctx: &RequestContext, req: &ChatRequest) -> Result<ChatMode> {
		if !self.cfg.assistant.enabled {
			return Err(Error::NotEnabled);
		}
		if ctx.user_id <= 0 {
			return Err(Error::InvalidRequest {
				message: "user_id must be greater than zero.".to_string(),
			});
		}

		let mode = ChatMode::parse(&req.mode)?;
		let message = req.message.trim();

		if mode == ChatMode::Chat && message.is_empty() {
			return Err(Error::InvalidRequest { message: "message must be non-empty.".to_string() });
		}
		if message.chars().count() > MAX_MESSAGE_CHARS {
			return Err(Error::InvalidRequest {
				message: format!("message must be at most {MAX_MESSAGE_CHARS} characters."),
			});
		}
		if req.history.len() > MAX_HISTORY_ENTRIES {
			return Err(Error::InvalidRequest {
				message: format!("history must have at most {MAX_HISTORY_ENTRIES} entries."),
			});
		}

		Ok(mode)
	}

	async fn prepare(
		&self,
		ctx: &RequestContext,
		req: &ChatRequest,
		mode: ChatMode,
	) -> Result<Prepared> {
		let assistant = &self.cfg.assistant;
		let max_history = assistant.max_history_messages as usize;
		let records = self.load_window(ctx.user_id, ctx.offset, ctx.now).await?;

		if records.is_empty() {
			return Ok(Prepared::NoData);
		}

		let items = self.build_knowledge(ctx.user_id, &records, ctx.offset).await?;

		if items.is_empty() {
			return Ok(Prepared::NoData);
		}

		let snapshot = snapshot::build_financial_snapshot(&items, ctx.offset, ctx.now);
		let query_text = prompt::embedding_query_text(req, mode, max_history);
		let resolved = self.embedding_cache().resolve(ctx.user_id, &query_text, items).await?;
		let retrieved =
			retrieval::select_top_k(&resolved.query, &resolved.items, assistant.top_k as usize);

		tracing::debug!(
			user_id = ctx.user_id,
			items = resolved.items.len(),
			retrieved = retrieved.len(),
			"Retrieved knowledge for assistant."
		);

		let current = format::format_long_date_time(ctx.now.unix_timestamp(), ctx.offset);
		let instructions = prompt::system_prompt(
			&current,
			mode,
			&snapshot,
			&prompt::retrieved_knowledge_text(&retrieved),
		);
		let input = prompt::user_prompt(req, mode, max_history);
		let references = prompt::references(&retrieved, assistant.max_references as usize);

		Ok(Prepared::Ready { instructions, input, references })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mode_parsing_normalizes_and_rejects() {
		assert_eq!(ChatMode::parse("").expect("Blank mode must parse."), ChatMode::Chat);
		assert_eq!(ChatMode::parse(" Summary ").expect("Summary must parse."), ChatMode::Summary);
		assert!(matches!(ChatMode::parse("report"), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn request_deserializes_with_defaults() {
		let req: ChatRequest =
			serde_json::from_str(r#"{"message":"hi"}"#).expect("Failed to parse request.");

		assert_eq!(req.mode, "");
		assert_eq!(req.message, "hi");
		assert!(req.history.is_empty());
	}
}
