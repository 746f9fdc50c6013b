//! Provider layer: the adapter contract shared by every gateway and the adapters themselves.

mod getsms;
mod smsc;
mod smstraffic;

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::domain::{
    Message, SendingError, SendingResult, StatusResult, ValidationError, is_local_number,
};
use crate::error::{ConfigError, SmsError};
use crate::transport::http::{HttpError, HttpResponse};

pub use crate::transport::http::build_http_client;
pub use getsms::{GetSmsOptions, GetSmsProvider};
pub use smsc::{SmscOptions, SmscProvider};
pub use smstraffic::{SmsTrafficOptions, SmsTrafficProvider};

/// Default timeout of the HTTP clients adapters build for themselves.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

#[async_trait]
/// One SMS gateway.
///
/// Adapters are built once and shared; every method takes `&self`.
///
/// `send` and `get_status` return `Err` only for validation and contract
/// problems or cancellation. Vendor and transport failures come back as a
/// result with `is_success() == false`.
pub trait SmsProvider: Send + Sync {
    /// Unique registration name, e.g. `"SMSC"`.
    fn name(&self) -> &'static str;

    /// Whether the gateway accepts messages without a sender.
    fn allows_null_from(&self) -> bool;

    /// Country or operator prefixes this gateway treats as local.
    fn local_prefixes(&self) -> &[&'static str];

    /// Whether this gateway may deliver to `phone_number`.
    fn can_send(&self, phone_number: &str, allow_foreign: bool) -> bool {
        is_local_number(self.local_prefixes(), phone_number, allow_foreign)
    }

    async fn send(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError>;

    /// Query the delivery state of a sent message.
    ///
    /// Some gateways also need the recipient number.
    async fn get_status(
        &self,
        id: &str,
        phone_number: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StatusResult, SmsError>;

    /// Blocking [`SmsProvider::send`], for callers outside of a Tokio runtime.
    fn send_blocking(&self, message: &Message) -> Result<SendingResult, SmsError> {
        block_on(self.send(message, &CancellationToken::new()))
    }

    /// Blocking [`SmsProvider::get_status`].
    fn get_status_blocking(
        &self,
        id: &str,
        phone_number: Option<&str>,
    ) -> Result<StatusResult, SmsError> {
        block_on(self.get_status(id, phone_number, &CancellationToken::new()))
    }
}

/// Drive `future` to completion on a private current-thread runtime.
///
/// Refuses to run on a thread that already drives a runtime, where blocking
/// would panic or stall the executor.
pub(crate) fn block_on<F, T>(future: F) -> Result<T, SmsError>
where
    F: Future<Output = Result<T, SmsError>>,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(SmsError::BlockingInRuntime);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| SmsError::Transport(Box::new(err)))?;
    runtime.block_on(future)
}

/// Check every recipient before anything goes on the wire.
///
/// Fails on the first recipient the provider cannot deliver to, or when the
/// body is empty.
pub(crate) fn validate_recipients<P>(
    provider: &P,
    recipients: &[&str],
    body: &str,
    allow_foreign: bool,
) -> Result<(), ValidationError>
where
    P: SmsProvider + ?Sized,
{
    if recipients.is_empty() {
        return Err(ValidationError::Empty {
            field: Message::TO_FIELD,
        });
    }
    for recipient in recipients {
        validate_recipient(provider, recipient, allow_foreign)?;
        if body.is_empty() {
            return Err(ValidationError::EmptyBody);
        }
    }
    Ok(())
}

pub(crate) fn validate_recipient<P>(
    provider: &P,
    recipient: &str,
    allow_foreign: bool,
) -> Result<(), ValidationError>
where
    P: SmsProvider + ?Sized,
{
    if provider.can_send(recipient, allow_foreign) {
        Ok(())
    } else {
        Err(ValidationError::NotLocalNumber {
            number: recipient.to_owned(),
        })
    }
}

/// Text carried by a failed result when the exchange itself broke.
///
/// Cancellation is not a vendor failure and is raised instead.
pub(crate) fn exchange_failure(err: HttpError) -> Result<String, SmsError> {
    match err {
        HttpError::Cancelled => Err(SmsError::Cancelled),
        other => Ok(other.to_string()),
    }
}

/// Error raised by vendor extras when the exchange broke.
pub(crate) fn exchange_error(err: HttpError) -> SmsError {
    match err {
        HttpError::Cancelled => SmsError::Cancelled,
        HttpError::Unavailable(source) | HttpError::Other(source) => SmsError::Transport(source),
    }
}

/// Turn the errors of a failed vendor reply into [`SmsError::Vendor`].
pub(crate) fn vendor_error(provider: &'static str, errors: Vec<SendingError>) -> SmsError {
    let (code, message) = errors
        .into_iter()
        .next()
        .map(|error| (error.code, error.message))
        .unwrap_or_else(|| (None, "request failed".to_owned()));
    SmsError::Vendor {
        provider,
        code,
        message,
    }
}

/// Body of a 2xx response, or [`SmsError::HttpStatus`].
pub(crate) fn success_body(response: HttpResponse) -> Result<String, SmsError> {
    if response.is_success() {
        return Ok(response.body);
    }
    let body = if response.body.trim().is_empty() {
        None
    } else {
        Some(response.body)
    };
    Err(SmsError::HttpStatus {
        status: response.status,
        body,
    })
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField { field })
    } else {
        Ok(())
    }
}

pub(crate) fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    require(field, value)?;
    Url::parse(value.trim()).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_owned(),
    })
}
