use serde::Deserialize;

use crate::{Error, Result};
use purse_config::EmbeddingProviderConfig;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
	#[serde(default)]
	index: Option<usize>,
	embedding: Vec<f64>,
}

/// Embeds one batch of texts, returning vectors in input order.
pub async fn embed(cfg: &EmbeddingProviderConfig, texts: &[String]) -> Result<Vec<Vec<f64>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let model = crate::require_model(&cfg.model)?;
	let client = crate::client(cfg.timeout_ms)?;
	let body = serde_json::json!({
		"model": model,
		"input": texts,
	});
	let res = client
		.post(crate::endpoint_url(&cfg.api_base, &cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let res = crate::ensure_success(res).await?;
	let parsed: EmbeddingResponse = res.json().await?;

	into_vectors(parsed, texts.len())
}

fn into_vectors(parsed: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f64>>> {
	let mut indexed: Vec<(usize, Vec<f64>)> = parsed
		.data
		.into_iter()
		.enumerate()
		.map(|(fallback, datum)| (datum.index.unwrap_or(fallback), datum.embedding))
		.collect();

	indexed.sort_by_key(|(index, _)| *index);

	if indexed.len() != expected {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding response has {} vectors for {expected} inputs.",
				indexed.len()
			),
		});
	}
	if let Some((index, _)) = indexed.iter().find(|(_, vector)| vector.is_empty()) {
		return Err(Error::InvalidResponse {
			message: format!("Embedding at index {index} is empty."),
		});
	}

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(json: serde_json::Value) -> EmbeddingResponse {
		serde_json::from_value(json).expect("Failed to parse embedding response.")
	}

	#[test]
	fn orders_vectors_by_declared_index() {
		let parsed = parse(serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		}));
		let vectors = into_vectors(parsed, 2).expect("Expected vectors.");

		assert_eq!(vectors, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn rejects_count_mismatch() {
		let parsed = parse(serde_json::json!({
			"data": [{ "index": 0, "embedding": [1.0] }]
		}));
		let err = into_vectors(parsed, 2).expect_err("Expected count mismatch.");

		assert!(err.to_string().contains("1 vectors for 2 inputs"), "Unexpected error: {err}");
	}

	#[test]
	fn rejects_empty_vectors() {
		let parsed = parse(serde_json::json!({
			"data": [{ "index": 0, "embedding": [] }]
		}));

		assert!(matches!(into_vectors(parsed, 1), Err(Error::InvalidResponse { .. })));
	}
}
