//! Turns a Responses API event stream into normalized chat chunks.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use purse_domain::knowledge::ReferencedTransaction;
use purse_providers::{
	responses::ResponseEvent,
	sse::{EventFramer, LineBuffer},
};

use crate::{Error, Result, chat::ChatMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamChunk {
	ReplyDelta { delta: String },
	ThinkingDelta { delta: String },
	References { references: Vec<ReferencedTransaction> },
	Done { mode: ChatMode, reply: String, thinking: String },
}

/// Text accumulated from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
	pub reply: String,
	pub thinking: String,
	/// A terminal event (`[DONE]` or `response.completed`) was seen.
	pub terminal: bool,
}

/// Incremental decoder over raw body chunks.
///
/// Deltas reach the sink as soon as the event that carries them is complete.
pub struct StreamProcessor<'a> {
	user_id: i64,
	sink: &'a mut (dyn FnMut(ChatStreamChunk) + Send),
	lines: LineBuffer,
	framer: EventFramer,
	state: StreamState,
}
impl<'a> StreamProcessor<'a> {
	pub fn new(user_id: i64, sink: &'a mut (dyn FnMut(ChatStreamChunk) + Send)) -> Self {
		Self {
			user_id,
			sink,
			lines: LineBuffer::new(),
			framer: EventFramer::new(),
			state: StreamState::default(),
		}
	}

	pub fn is_done(&self) -> bool {
		self.state.terminal
	}

	/// Feeds one body chunk. Input after a terminal event is ignored.
	pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
		if self.state.terminal {
			return Ok(());
		}

		for line in self.lines.push(chunk)? {
			if let Some(data) = self.framer.push_line(&line) {
				self.handle_event(&data)?;

				if self.state.terminal {
					break;
				}
			}
		}

		Ok(())
	}

	/// Flushes any buffered event once the body has ended.
	pub fn finish(mut self) -> Result<StreamState> {
		if !self.state.terminal {
			if let Some(line) = self.lines.finish()
				&& let Some(data) = self.framer.push_line(&line)
			{
				self.handle_event(&data)?;
			}
			if !self.state.terminal
				&& let Some(data) = self.framer.finish()
			{
				self.handle_event(&data)?;
			}
		}

		Ok(self.state)
	}

	fn handle_event(&mut self, data: &str) -> Result<()> {
		let event = match ResponseEvent::decode(data) {
			Ok(event) => event,
			Err(err) => {
				tracing::warn!(user_id = self.user_id, error = %err, "Skipping malformed stream event.");

				return Ok(());
			},
		};

		match event {
			ResponseEvent::Done => self.state.terminal = true,
			ResponseEvent::ReasoningDelta { delta } =>
				if !delta.is_empty() {
					self.state.thinking.push_str(&delta);
					(self.sink)(ChatStreamChunk::ThinkingDelta { delta });
				},
			ResponseEvent::OutputDelta { delta } =>
				if !delta.is_empty() {
					self.state.reply.push_str(&delta);
					(self.sink)(ChatStreamChunk::ReplyDelta { delta });
				},
			ResponseEvent::Completed { response } => {
				if self.state.reply.is_empty() {
					let text = response.map(|response| response.text()).unwrap_or_default();

					if !text.is_empty() {
						self.state.reply.push_str(&text);
						(self.sink)(ChatStreamChunk::ReplyDelta { delta: text });
					}
				}

				self.state.terminal = true;
			},
			ResponseEvent::Error { message } => {
				tracing::error!(user_id = self.user_id, payload = data, "Generation stream returned an error.");

				return Err(Error::RemoteApi {
					message: message.unwrap_or_else(|| "Generation stream failed.".to_string()),
				});
			},
			ResponseEvent::Unknown => {},
		}

		Ok(())
	}
}

/// Reads `body` to its terminal event or its end, forwarding deltas to `sink`.
pub async fn consume<S>(
	mut body: S,
	user_id: i64,
	sink: &mut (dyn FnMut(ChatStreamChunk) + Send),
) -> Result<StreamState>
where
	S: Stream<Item = purse_providers::Result<Vec<u8>>> + Unpin,
{
	let mut processor = StreamProcessor::new(user_id, sink);

	while let Some(chunk) = body.next().await {
		let chunk = chunk.map_err(|err| {
			tracing::error!(user_id, error = %err, "Failed to read generation stream.");

			Error::from(err)
		})?;

		processor.push(&chunk)?;

		if processor.is_done() {
			break;
		}
	}

	processor.finish()
}
