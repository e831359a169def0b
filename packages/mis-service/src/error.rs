use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Failed to read labels at {path:?}.")]
	ReadLabels { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse labels at {path:?}.")]
	ParseLabels { path: PathBuf, source: serde_json::Error },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<mis_providers::Error> for Error {
	fn from(err: mis_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
