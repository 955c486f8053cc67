//! Streaming client for the OpenAI-compatible Responses API.

use futures::{StreamExt, stream::BoxStream};
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Deserialize;

use crate::{Error, Result};
use purse_config::LlmProviderConfig;

pub const DONE_SENTINEL: &str = "[DONE]";

pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// One decoded stream event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseEvent {
	#[serde(rename = "response.reasoning_summary_text.delta")]
	ReasoningDelta {
		#[serde(default)]
		delta: String,
	},
	#[serde(rename = "response.output_text.delta")]
	OutputDelta {
		#[serde(default)]
		delta: String,
	},
	#[serde(rename = "response.completed")]
	Completed {
		#[serde(default)]
		response: Option<CompletedResponse>,
	},
	#[serde(rename = "error")]
	Error {
		#[serde(default)]
		message: Option<String>,
	},
	/// The literal `[DONE]` payload.
	#[serde(skip)]
	Done,
	#[serde(other)]
	Unknown,
}
impl ResponseEvent {
	pub fn decode(data: &str) -> serde_json::Result<Self> {
		if data == DONE_SENTINEL {
			return Ok(Self::Done);
		}

		serde_json::from_str(data)
	}
}

/// Fields are optional because providers send `null` for parts they did not fill.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletedResponse {
	#[serde(default)]
	pub output_text: Option<String>,
	#[serde(default)]
	pub output: Option<Vec<Option<OutputItem>>>,
}
impl CompletedResponse {
	/// Final text of a completed response: `output_text`, else the text parts of `output`.
	pub fn text(&self) -> String {
		if let Some(text) = self.output_text.as_deref()
			&& !text.is_empty()
		{
			return text.to_string();
		}

		self.output
			.iter()
			.flatten()
			.flatten()
			.filter_map(|item| item.content.as_ref())
			.flatten()
			.flatten()
			.filter(|part| matches!(part.kind.as_deref(), Some("output_text" | "text")))
			.filter_map(|part| part.text.as_deref())
			.collect()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputItem {
	#[serde(default)]
	pub content: Option<Vec<Option<OutputContent>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputContent {
	#[serde(rename = "type", default)]
	pub kind: Option<String>,
	#[serde(default)]
	pub text: Option<String>,
}

/// Starts a streamed generation and returns the raw body stream.
pub async fn stream(
	cfg: &LlmProviderConfig,
	instructions: &str,
	input: &str,
) -> Result<ByteStream> {
	let model = crate::require_model(&cfg.model)?;
	let client = crate::client(cfg.timeout_ms)?;
	let mut headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;

	headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

	let mut body = serde_json::json!({
		"model": model,
		"instructions": instructions,
		"input": input,
		"stream": true,
		"store": false,
	});

	if !cfg.reasoning_summary.is_empty() {
		body["reasoning"] = serde_json::json!({ "summary": cfg.reasoning_summary });
	}

	let res = client
		.post(crate::endpoint_url(&cfg.api_base, &cfg.path))
		.headers(headers)
		.json(&body)
		.send()
		.await?;
	let res = crate::ensure_success(res).await?;

	Ok(res
		.bytes_stream()
		.map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::from))
		.boxed())
}
