pub mod embedding;
pub mod responses;
pub mod sse;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client, Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

const ERROR_BODY_LIMIT: usize = 512;

/// Joins a base URL and a relative path with exactly one `/` between them.
pub fn endpoint_url(api_base: &str, path: &str) -> String {
	format!("{}/{}", api_base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	if api_key.trim().is_empty() {
		return Err(Error::InvalidConfig { message: "API key must be non-empty.".to_string() });
	}

	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {}", api_key.trim()).parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

fn client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}

async fn ensure_success(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let mut body = res.text().await.unwrap_or_default();

	if body.len() > ERROR_BODY_LIMIT {
		let mut cut = ERROR_BODY_LIMIT;

		while !body.is_char_boundary(cut) {
			cut -= 1;
		}

		body.truncate(cut);
	}

	Err(Error::Status { status: status.as_u16(), body })
}

fn require_model(model: &str) -> Result<&str> {
	let model = model.trim();

	if model.is_empty() {
		return Err(Error::InvalidConfig { message: "Model id must be non-empty.".to_string() });
	}

	Ok(model)
}
