use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::domain::{Message, ProviderName, SendingResult, StatusResult};
use crate::error::{ConfigError, SmsError};
use crate::provider::{
    DEFAULT_TIMEOUT, SmsProvider, exchange_failure, parse_url, require, validate_recipients,
};
use crate::transport::Reply;
use crate::transport::getsms::{
    decode_send_response, decode_status_response, encode_send_form, encode_status_form,
};
use crate::transport::http::{HttpRequest, HttpTransport, ReqwestTransport, execute_cancellable};

const USER_AGENT: &str = "Opera 10.00";
const STATUS_PATH: &str = "status/";
const LOCAL_PREFIXES: &[&str] = &["998"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// GetSMS account settings. Every field is required.
pub struct GetSmsOptions {
    pub login: String,
    pub password: String,
    /// Send endpoint; status queries go to `<service_url>/status/`.
    pub service_url: String,
}

impl GetSmsOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("login", &self.login)?;
        require("password", &self.password)?;
        parse_url("service_url", &self.service_url)?;
        Ok(())
    }
}

#[derive(Clone)]
/// Adapter for the GetSMS JSON API (Uzbekistan).
///
/// Recipients must carry the `998` prefix unless the message allows
/// foreign numbers. A sender is optional and goes out as `nickname`.
pub struct GetSmsProvider {
    login: String,
    password: String,
    send_url: Url,
    status_url: Url,
    http: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for GetSmsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetSmsProvider")
            .field("login", &self.login)
            .field("send_url", &self.send_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GetSmsProvider {
    /// Validate `options` and build an adapter with its own HTTP client
    /// (60 s timeout, `User-Agent: Opera 10.00`).
    pub fn new(options: GetSmsOptions) -> Result<Self, SmsError> {
        let client = crate::provider::build_http_client(DEFAULT_TIMEOUT, Some(USER_AGENT))?;
        Self::with_client(options, client)
    }

    /// Validate `options` and build an adapter on a shared client.
    pub fn with_client(options: GetSmsOptions, client: reqwest::Client) -> Result<Self, SmsError> {
        Self::from_parts(options, Arc::new(ReqwestTransport::new(client)))
    }

    fn from_parts(options: GetSmsOptions, http: Arc<dyn HttpTransport>) -> Result<Self, SmsError> {
        options.validate()?;
        let send_url = parse_url("service_url", &options.service_url)?;
        let status_url = send_url
            .join(STATUS_PATH)
            .map_err(|_| ConfigError::InvalidUrl {
                field: "service_url",
                value: options.service_url.clone(),
            })?;
        Ok(Self {
            login: options.login,
            password: options.password,
            send_url,
            status_url,
            http,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_transport(
        options: GetSmsOptions,
        http: Arc<dyn HttpTransport>,
    ) -> Result<Self, SmsError> {
        Self::from_parts(options, http)
    }

    fn ensure_plain(&self, message: &Message) -> Result<(), SmsError> {
        match message.extension() {
            Some(extension) => Err(SmsError::UnsupportedMessage {
                provider: self.name(),
                extension: extension.provider_name(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SmsProvider for GetSmsProvider {
    fn name(&self) -> &'static str {
        ProviderName::GetSms.as_str()
    }

    fn allows_null_from(&self) -> bool {
        true
    }

    fn local_prefixes(&self) -> &[&'static str] {
        LOCAL_PREFIXES
    }

    async fn send(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        self.ensure_plain(message)?;
        let recipients = message.recipients();
        validate_recipients(self, &recipients, message.body(), message.allows_foreign())?;

        let params = encode_send_form(
            &self.login,
            &self.password,
            message.sender(),
            &recipients,
            message.body(),
        );
        tracing::debug!(
            provider = self.name(),
            recipients = recipients.len(),
            "sending message"
        );

        let request = HttpRequest::post_form(self.send_url.as_str(), params);
        let response = match execute_cancellable(self.http.as_ref(), request, cancel).await {
            Ok(response) => response,
            Err(err) => {
                let reason = exchange_failure(err)?;
                return Ok(SendingResult::failed_with(self.name(), None, reason));
            }
        };

        if response.is_success() {
            match decode_send_response(&response.body) {
                Ok(Reply::Success(records)) => {
                    return Ok(SendingResult::succeeded(self.name(), records));
                }
                Ok(Reply::Failure(errors)) => {
                    return Ok(SendingResult::failed(self.name(), errors));
                }
                Err(err) => {
                    tracing::debug!(provider = self.name(), error = %err, "unparseable reply");
                }
            }
        }
        Ok(SendingResult::failed_with(self.name(), None, response.body))
    }

    async fn get_status(
        &self,
        id: &str,
        _phone_number: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StatusResult, SmsError> {
        if id.trim().is_empty() {
            return Err(SmsError::MissingArgument { name: "id" });
        }

        let params = encode_status_form(&self.login, &self.password, id);
        let request = HttpRequest::post_form(self.status_url.as_str(), params);
        let response = match execute_cancellable(self.http.as_ref(), request, cancel).await {
            Ok(response) => response,
            Err(err) => {
                let reason = exchange_failure(err)?;
                return Ok(StatusResult::failed_with(self.name(), None, reason));
            }
        };

        if response.is_success() {
            match decode_status_response(&response.body) {
                Ok(Reply::Success(records)) => {
                    return Ok(StatusResult::succeeded(self.name(), records));
                }
                Ok(Reply::Failure(errors)) => return Ok(StatusResult::failed(self.name(), errors)),
                Err(err) => {
                    tracing::debug!(provider = self.name(), error = %err, "unparseable reply");
                }
            }
        }
        Ok(StatusResult::failed_with(self.name(), None, response.body))
    }
}
