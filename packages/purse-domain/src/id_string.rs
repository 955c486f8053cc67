//! Serializes an `i64` id as a JSON string so clients without 64-bit integers keep precision.

use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

pub fn serialize<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	raw.trim().parse().map_err(D::Error::custom)
}
