use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub assistant: Assistant,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	#[serde(default = "default_api_base")]
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	/// Optional. Name of an environment variable holding the key when `api_key` is empty.
	pub api_key_env: Option<String>,
	#[serde(default = "default_embedding_path")]
	pub path: String,
	/// Also the cache partition: rows written under one model are never read under another.
	pub model: String,
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	#[serde(default = "default_api_base")]
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub api_key_env: Option<String>,
	#[serde(default = "default_responses_path")]
	pub path: String,
	pub model: String,
	/// Reasoning summary level requested from the responses API. Empty disables it.
	#[serde(default = "default_reasoning_summary")]
	pub reasoning_summary: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Assistant {
	pub enabled: bool,
	pub top_k: u32,
	pub max_references: u32,
	pub max_history_messages: u32,
	pub knowledge_page_size: u32,
	pub knowledge_max_transactions: u32,
	pub history_coverage_years: u32,
}
impl Default for Assistant {
	fn default() -> Self {
		Self {
			enabled: true,
			top_k: 18,
			max_references: 8,
			max_history_messages: 12,
			knowledge_page_size: 180,
			knowledge_max_transactions: 1_800,
			history_coverage_years: 2,
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_api_base() -> String {
	DEFAULT_API_BASE.to_string()
}

fn default_embedding_path() -> String {
	"embeddings".to_string()
}

fn default_responses_path() -> String {
	"responses".to_string()
}

fn default_reasoning_summary() -> String {
	"auto".to_string()
}

fn default_batch_size() -> u32 {
	64
}
