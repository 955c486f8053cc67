mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Assistant, Config, DEFAULT_API_BASE, EmbeddingProviderConfig, LlmProviderConfig, Postgres,
	Providers, Service, Storage,
};

use std::{env, fs, path::Path};

use serde_json::{Map, Value};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	resolve_api_keys(&mut cfg, |name| env::var(name).ok())?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let embedding = &cfg.providers.embedding;
	let llm = &cfg.providers.llm;

	for (label, value) in [
		("providers.embedding.api_key", &embedding.api_key),
		("providers.embedding.model", &embedding.model),
		("providers.llm.api_key", &llm.api_key),
		("providers.llm.model", &llm.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if embedding.batch_size == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.batch_size must be greater than zero.".to_string(),
		});
	}

	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", embedding.timeout_ms),
		("providers.llm.timeout_ms", llm.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if !matches!(llm.reasoning_summary.as_str(), "" | "auto" | "concise" | "detailed") {
		return Err(Error::Validation {
			message: "providers.llm.reasoning_summary must be one of auto, concise, detailed, or empty."
				.to_string(),
		});
	}

	for (label, headers) in [
		("providers.embedding.default_headers", &embedding.default_headers),
		("providers.llm.default_headers", &llm.default_headers),
	] {
		validate_headers(label, headers)?;
	}

	let assistant = &cfg.assistant;

	if assistant.top_k == 0 {
		return Err(Error::Validation {
			message: "assistant.top_k must be greater than zero.".to_string(),
		});
	}
	if assistant.max_references > assistant.top_k {
		return Err(Error::Validation {
			message: "assistant.max_references must not exceed assistant.top_k.".to_string(),
		});
	}
	if assistant.knowledge_page_size == 0 {
		return Err(Error::Validation {
			message: "assistant.knowledge_page_size must be greater than zero.".to_string(),
		});
	}
	if assistant.knowledge_max_transactions == 0 {
		return Err(Error::Validation {
			message: "assistant.knowledge_max_transactions must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

/// Fills empty `api_key` fields from their `api_key_env` variable.
pub fn resolve_api_keys<F>(cfg: &mut Config, lookup: F) -> Result<()>
where
	F: Fn(&str) -> Option<String>,
{
	let embedding = &mut cfg.providers.embedding;

	if embedding.api_key.is_empty()
		&& let Some(name) = embedding.api_key_env.as_deref()
	{
		embedding.api_key = lookup(name).map(|key| key.trim().to_string()).ok_or_else(|| {
			Error::MissingEnv {
				key: "providers.embedding.api_key_env".to_string(),
				name: name.to_string(),
			}
		})?;
	}

	let llm = &mut cfg.providers.llm;

	if llm.api_key.is_empty()
		&& let Some(name) = llm.api_key_env.as_deref()
	{
		llm.api_key = lookup(name).map(|key| key.trim().to_string()).ok_or_else(|| {
			Error::MissingEnv { key: "providers.llm.api_key_env".to_string(), name: name.to_string() }
		})?;
	}

	Ok(())
}

fn validate_headers(label: &str, headers: &Map<String, Value>) -> Result<()> {
	for (key, value) in headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("{label}.{key} must be a string."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let embedding = &mut cfg.providers.embedding;

	embedding.api_key = embedding.api_key.trim().to_string();
	embedding.model = embedding.model.trim().to_string();

	if embedding.api_base.trim().is_empty() {
		embedding.api_base = DEFAULT_API_BASE.to_string();
	}
	if embedding.api_key_env.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false) {
		embedding.api_key_env = None;
	}

	let llm = &mut cfg.providers.llm;

	llm.api_key = llm.api_key.trim().to_string();
	llm.model = llm.model.trim().to_string();
	llm.reasoning_summary = llm.reasoning_summary.trim().to_ascii_lowercase();

	if llm.api_base.trim().is_empty() {
		llm.api_base = DEFAULT_API_BASE.to_string();
	}
	if llm.api_key_env.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false) {
		llm.api_key_env = None;
	}
}
