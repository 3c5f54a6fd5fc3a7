use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Will be used each time an error can occur
pub type Result<T> = core::result::Result<T, Error>;

/// Represent an error
#[derive(Debug, Serialize, Deserialize)]
pub enum Error {
    Api(ApiError),
    Model(ModelError),
    Validation(ValidationError),
}

impl From<serde_json::error::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Api(ApiError::InvalidJson(value.to_string()))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Error {}

/// Represent an error that can occur inside a model
#[derive(Debug, Serialize, Deserialize)]
pub enum ModelError {
    InvalidSnowflake(String),
    MissingField(String),
    InvalidPayload(String),
    InvalidTimestamp(String),
    UnknownKind(String),
}

/// Represent an error raised by a manager verb before any request is issued.
///
/// A validation error is always synchronous and never leaves the cache
/// partially mutated.
#[derive(Debug, Serialize, Deserialize)]
pub enum ValidationError {
    /// A required collection was empty
    EmptyCollection(String),
    /// A batch argument exceeded the allowed size
    BatchTooLarge(String),
    /// A numeric argument was outside its allowed range
    OutOfRange(String),
    /// An argument had the wrong shape
    InvalidArgument(String),
}

/// Represent an error that can occur inside the api
#[derive(Debug, Serialize, Deserialize)]
pub enum ApiError {
    RequestError(String),
    RequestStatus(String),
    InvalidJson(String),
    NoResponse(String),
    InvalidResource(String),
    TooManyRetry,
    Deserialize(String),
}
