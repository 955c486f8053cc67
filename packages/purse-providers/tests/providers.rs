use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		purse_providers::auth_headers(" secret ", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn includes_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("OpenAI-Organization".to_string(), Value::String("org-1".to_string()));

	let headers = purse_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get("openai-organization").expect("Missing header."), "org-1");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("X-Retry".to_string(), Value::from(3));

	let err = purse_providers::auth_headers("secret", &defaults).expect_err("Expected header error.");

	assert!(matches!(err, purse_providers::Error::InvalidConfig { .. }));
}

#[test]
fn rejects_empty_api_key() {
	let err = purse_providers::auth_headers("  ", &Map::new()).expect_err("Expected key error.");

	assert!(matches!(err, purse_providers::Error::InvalidConfig { .. }));
}
