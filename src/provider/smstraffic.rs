use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::domain::{
    GroupOperation, Message, MessageExtension, ProviderName, SendingResult, SmsTrafficData,
    SmsTrafficGroup, StatusResult, ValidationError,
};
use crate::error::{ConfigError, SmsError};
use crate::provider::{
    DEFAULT_TIMEOUT, SmsProvider, block_on, exchange_error, exchange_failure, parse_url, require,
    success_body, validate_recipients, vendor_error,
};
use crate::transport::Reply;
use crate::transport::http::{
    HttpError, HttpRequest, HttpResponse, HttpTransport, RequestBody, ReqwestTransport,
    execute_cancellable,
};
use crate::transport::smstraffic::{
    LIST_PATH, MemberOperation, SEND_PATH, SendFields, TransportError, decode_account_response,
    decode_group_list_response, decode_group_operation_response, decode_send_response,
    decode_status_response, encode_account_form, encode_group_form, encode_group_list_form,
    encode_member_form, encode_send_body, encode_status_form, is_group_target,
};

const LOCAL_PREFIXES: &[&str] = &["7", "8"];
/// Recipients are joined with `,` on the wire.
const PHONE_SEPARATOR: char = ',';
const MAX_GROUP_MEMBERS: usize = 5000;

fn default_service_url() -> String {
    "https://api.smstraffic.ru/".to_owned()
}

fn default_duplicate_service_url() -> String {
    "https://api2.smstraffic.ru/".to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// SmsTraffic account settings.
pub struct SmsTrafficOptions {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_service_url")]
    pub service_url: String,
    /// Host tried once when `service_url` cannot be reached. Empty disables failover.
    #[serde(default = "default_duplicate_service_url")]
    pub duplicate_service_url: String,
}

impl Default for SmsTrafficOptions {
    fn default() -> Self {
        Self {
            login: String::new(),
            password: String::new(),
            service_url: default_service_url(),
            duplicate_service_url: default_duplicate_service_url(),
        }
    }
}

impl SmsTrafficOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("login", &self.login)?;
        require("password", &self.password)?;
        parse_url("service_url", &self.service_url)?;
        if !self.duplicate_service_url.trim().is_empty() {
            parse_url("duplicate_service_url", &self.duplicate_service_url)?;
        }
        Ok(())
    }
}

/// Main and duplicate URL of one endpoint.
#[derive(Debug, Clone)]
struct Route {
    primary: Url,
    duplicate: Option<Url>,
}

impl Route {
    fn new(options: &SmsTrafficOptions, path: &str) -> Result<Self, ConfigError> {
        let primary = join("service_url", &options.service_url, path)?;
        let duplicate = if options.duplicate_service_url.trim().is_empty() {
            None
        } else {
            Some(join(
                "duplicate_service_url",
                &options.duplicate_service_url,
                path,
            )?)
        };
        Ok(Self { primary, duplicate })
    }
}

fn join(field: &'static str, base: &str, path: &str) -> Result<Url, ConfigError> {
    parse_url(field, base)?
        .join(path)
        .map_err(|_| ConfigError::InvalidUrl {
            field,
            value: base.to_owned(),
        })
}

#[derive(Clone)]
/// Adapter for the SmsTraffic HTTP API (Russia).
///
/// Requests are form posts answered with XML. When the main host cannot be
/// reached (connect error or timeout) the request is repeated once on the
/// duplicate host. A `To` containing letters is sent to the distribution
/// group of that name.
pub struct SmsTrafficProvider {
    login: String,
    password: String,
    multi: Route,
    list: Route,
    http: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for SmsTrafficProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsTrafficProvider")
            .field("login", &self.login)
            .field("multi", &self.multi)
            .finish_non_exhaustive()
    }
}

impl SmsTrafficProvider {
    /// Validate `options` and build an adapter with its own HTTP client (60 s timeout).
    pub fn new(options: SmsTrafficOptions) -> Result<Self, SmsError> {
        let client = crate::provider::build_http_client(DEFAULT_TIMEOUT, None)?;
        Self::with_client(options, client)
    }

    /// Validate `options` and build an adapter on a shared client.
    pub fn with_client(
        options: SmsTrafficOptions,
        client: reqwest::Client,
    ) -> Result<Self, SmsError> {
        Self::from_parts(options, Arc::new(ReqwestTransport::new(client)))
    }

    fn from_parts(
        options: SmsTrafficOptions,
        http: Arc<dyn HttpTransport>,
    ) -> Result<Self, SmsError> {
        options.validate()?;
        Ok(Self {
            multi: Route::new(&options, SEND_PATH)?,
            list: Route::new(&options, LIST_PATH)?,
            login: options.login,
            password: options.password,
            http,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_transport(
        options: SmsTrafficOptions,
        http: Arc<dyn HttpTransport>,
    ) -> Result<Self, SmsError> {
        Self::from_parts(options, http)
    }

    /// Account balance as reported by the gateway.
    pub async fn get_balance(&self, cancel: &CancellationToken) -> Result<String, SmsError> {
        let params = encode_account_form(&self.login, &self.password);
        self.query(&self.multi, params, decode_account_response, cancel)
            .await
    }

    /// Every distribution group of the account.
    pub async fn get_group_list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SmsTrafficGroup>, SmsError> {
        let params = encode_group_list_form(&self.login, &self.password);
        self.query(&self.list, params, decode_group_list_response, cancel)
            .await
    }

    /// One distribution group, or `None` when the gateway knows no such group.
    pub async fn get_group(
        &self,
        group_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<SmsTrafficGroup>, SmsError> {
        if group_id.trim().is_empty() {
            return Err(SmsError::MissingArgument { name: "group_id" });
        }
        let params = encode_group_form(&self.login, &self.password, group_id);
        let groups = self
            .query(&self.list, params, decode_group_list_response, cancel)
            .await?;
        Ok(groups.into_iter().next())
    }

    pub async fn add_group_member(
        &self,
        group_id: &str,
        member: &str,
        cancel: &CancellationToken,
    ) -> Result<GroupOperation, SmsError> {
        self.add_group_members(group_id, &[member], cancel).await
    }

    /// Add up to 5000 numbers to a distribution group.
    pub async fn add_group_members(
        &self,
        group_id: &str,
        members: &[&str],
        cancel: &CancellationToken,
    ) -> Result<GroupOperation, SmsError> {
        self.change_members(MemberOperation::Add, group_id, members, cancel)
            .await
    }

    pub async fn remove_group_member(
        &self,
        group_id: &str,
        member: &str,
        cancel: &CancellationToken,
    ) -> Result<GroupOperation, SmsError> {
        self.remove_group_members(group_id, &[member], cancel).await
    }

    /// Remove up to 5000 numbers from a distribution group.
    pub async fn remove_group_members(
        &self,
        group_id: &str,
        members: &[&str],
        cancel: &CancellationToken,
    ) -> Result<GroupOperation, SmsError> {
        self.change_members(MemberOperation::Remove, group_id, members, cancel)
            .await
    }

    /// Blocking [`SmsTrafficProvider::get_balance`].
    pub fn get_balance_blocking(&self) -> Result<String, SmsError> {
        block_on(self.get_balance(&CancellationToken::new()))
    }

    pub fn get_group_list_blocking(&self) -> Result<Vec<SmsTrafficGroup>, SmsError> {
        block_on(self.get_group_list(&CancellationToken::new()))
    }

    pub fn get_group_blocking(&self, group_id: &str) -> Result<Option<SmsTrafficGroup>, SmsError> {
        block_on(self.get_group(group_id, &CancellationToken::new()))
    }

    pub fn add_group_member_blocking(
        &self,
        group_id: &str,
        member: &str,
    ) -> Result<GroupOperation, SmsError> {
        block_on(self.add_group_member(group_id, member, &CancellationToken::new()))
    }

    pub fn add_group_members_blocking(
        &self,
        group_id: &str,
        members: &[&str],
    ) -> Result<GroupOperation, SmsError> {
        block_on(self.add_group_members(group_id, members, &CancellationToken::new()))
    }

    pub fn remove_group_member_blocking(
        &self,
        group_id: &str,
        member: &str,
    ) -> Result<GroupOperation, SmsError> {
        block_on(self.remove_group_member(group_id, member, &CancellationToken::new()))
    }

    pub fn remove_group_members_blocking(
        &self,
        group_id: &str,
        members: &[&str],
    ) -> Result<GroupOperation, SmsError> {
        block_on(self.remove_group_members(group_id, members, &CancellationToken::new()))
    }

    async fn change_members(
        &self,
        operation: MemberOperation,
        group_id: &str,
        members: &[&str],
        cancel: &CancellationToken,
    ) -> Result<GroupOperation, SmsError> {
        if group_id.trim().is_empty() {
            return Err(SmsError::MissingArgument { name: "group_id" });
        }
        if members.is_empty() {
            return Err(ValidationError::Empty { field: "members" }.into());
        }
        if members.len() > MAX_GROUP_MEMBERS {
            return Err(ValidationError::TooManyMembers {
                max: MAX_GROUP_MEMBERS,
                actual: members.len(),
            }
            .into());
        }

        let params = encode_member_form(&self.login, &self.password, operation, group_id, members);
        self.query(&self.list, params, decode_group_operation_response, cancel)
            .await
    }

    async fn query<T>(
        &self,
        route: &Route,
        params: Vec<(String, String)>,
        decode: fn(&str) -> Result<Reply<T>, TransportError>,
        cancel: &CancellationToken,
    ) -> Result<T, SmsError> {
        let response = self
            .post(route, RequestBody::Form(params), cancel)
            .await
            .map_err(exchange_error)?;
        let body = success_body(response)?;
        match decode(&body).map_err(|err| SmsError::Parse(Box::new(err)))? {
            Reply::Success(value) => Ok(value),
            Reply::Failure(errors) => Err(vendor_error(self.name(), errors)),
        }
    }

    /// Post to the main host, then once to the duplicate host if the main one is unreachable.
    async fn post(
        &self,
        route: &Route,
        body: RequestBody,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::post(route.primary.as_str(), body.clone());
        match execute_cancellable(self.http.as_ref(), request, cancel).await {
            Err(HttpError::Unavailable(err)) => {
                let Some(duplicate) = &route.duplicate else {
                    return Err(HttpError::Unavailable(err));
                };
                tracing::warn!(
                    provider = self.name(),
                    host = %route.primary,
                    duplicate = %duplicate,
                    error = %err,
                    "main host unavailable, retrying on duplicate host"
                );
                let request = HttpRequest::post(duplicate.as_str(), body);
                execute_cancellable(self.http.as_ref(), request, cancel).await
            }
            other => other,
        }
    }

    /// Typed options for `message`: its own extension or its projected `ProviderData`.
    fn message_data(&self, message: &Message) -> Result<Option<SmsTrafficData>, SmsError> {
        let data = match message.extension() {
            Some(MessageExtension::SmsTraffic(data)) => Some(data.clone()),
            Some(other) => {
                return Err(SmsError::UnsupportedMessage {
                    provider: self.name(),
                    extension: other.provider_name(),
                });
            }
            None => SmsTrafficData::from_provider_data(message.provider_data())?,
        };
        let individual = data
            .as_ref()
            .and_then(|it| it.individual_messages)
            .unwrap_or(false);
        if individual && !message.body().is_empty() {
            return Err(ValidationError::IndividualMessagesWithBody.into());
        }
        Ok(data)
    }
}

#[async_trait]
impl SmsProvider for SmsTrafficProvider {
    fn name(&self) -> &'static str {
        ProviderName::SmsTraffic.as_str()
    }

    fn allows_null_from(&self) -> bool {
        false
    }

    fn local_prefixes(&self) -> &[&'static str] {
        LOCAL_PREFIXES
    }

    async fn send(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        let data = self.message_data(message)?;
        let individual = data
            .as_ref()
            .and_then(|it| it.individual_messages)
            .unwrap_or(false);

        let to = if individual {
            // Lines of `phone<delimiter>text` are passed through untouched.
            message.to().to_owned()
        } else if is_group_target(message.to()) {
            message.to().trim().to_owned()
        } else {
            validate_recipients(
                self,
                &message.recipients(),
                message.body(),
                message.allows_foreign(),
            )?;
            message.recipients_joined(PHONE_SEPARATOR)
        };

        let body = encode_send_body(
            &self.login,
            &self.password,
            SendFields {
                to: &to,
                message: message.body(),
                originator: message.sender(),
                data: data.as_ref(),
            },
        );
        tracing::debug!(provider = self.name(), individual, "sending message");

        let response = match self.post(&self.multi, body, cancel).await {
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
        let response = match self.post(&self.multi, RequestBody::Form(params), cancel).await {
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
