pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Assistant is not enabled.")]
	NotEnabled,
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Remote API error: {message}")]
	RemoteApi { message: String },
	#[error("Persistence error: {message}")]
	Persistence { message: String },
	#[error("Ledger error: {message}")]
	Ledger { message: String },
}
impl From<purse_providers::Error> for Error {
	fn from(err: purse_providers::Error) -> Self {
		match err {
			purse_providers::Error::InvalidConfig { message } => Self::Configuration { message },
			other => Self::RemoteApi { message: other.to_string() },
		}
	}
}

impl From<purse_storage::Error> for Error {
	fn from(err: purse_storage::Error) -> Self {
		match err {
			purse_storage::Error::Sqlx(inner) => Self::Persistence { message: inner.to_string() },
			purse_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}
