use std::error::Error as StdError;

use crate::domain::ValidationError;

#[derive(Debug, thiserror::Error)]
/// Errors raised by providers and [`SmsService`](crate::SmsService).
///
/// Contract and validation problems are raised from `send`/`get_status`.
/// Vendor and transport failures are raised only by the vendor-specific
/// extras; `send`/`get_status` report them as failed results instead.
pub enum SmsError {
    /// A message or argument failed validation before any network call.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Options are incomplete.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("provider not found: {name}")]
    ProviderNotFound { name: String },

    #[error("no providers registered")]
    NoProviders,

    /// No `From` on the message and no default sender configured.
    #[error("message has no sender and no default sender is configured")]
    MissingSender,

    #[error("no suitable provider for {phone_number}")]
    NoSuitableProvider { phone_number: String },

    /// The message carries typed data of another provider.
    #[error("provider {provider} does not accept {extension} message data")]
    UnsupportedMessage {
        provider: &'static str,
        extension: &'static str,
    },

    #[error("missing argument: {name}")]
    MissingArgument { name: &'static str },

    #[error("operation cancelled")]
    Cancelled,

    /// A blocking call was made on a thread that already drives a Tokio runtime.
    #[error("blocking call made from inside an async runtime")]
    BlockingInRuntime,

    /// HTTP client failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// Building or delivering the SMTP fallback mail failed.
    #[error("SMTP error: {0}")]
    Smtp(#[source] Box<dyn StdError + Send + Sync>),

    /// Non-successful HTTP status code returned by the server.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// Response body could not be parsed as the expected format.
    #[error("parse error: {0}")]
    Parse(#[source] Box<dyn StdError + Send + Sync>),

    /// The vendor answered with a business-level error.
    #[error("{provider} error {code:?}: {message}")]
    Vendor {
        provider: &'static str,
        code: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Invalid provider or service options.
pub enum ConfigError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("unsupported charset: {label}")]
    UnknownCharset { label: String },
}
