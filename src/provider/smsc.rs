use std::sync::Arc;

use async_trait::async_trait;
use encoding_rs::Encoding;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::domain::{
    Attachment, Message, MessageExtension, ProviderName, SendingResult, SmsCost, SmscData,
    StatusResult, ValidationError, clean_phone_number,
};
use crate::error::{ConfigError, SmsError};
use crate::provider::{
    DEFAULT_TIMEOUT, SmsProvider, block_on, require, validate_recipient, validate_recipients, vendor_error,
};
use crate::transport::Reply;
use crate::transport::charset::encoding_for_label;
use crate::transport::http::{HttpError, HttpTransport, ReqwestTransport, execute_cancellable};
use crate::transport::mail::{
    MailTransport, SmtpMailTransport, build_mail, encode_mail_body, send_cancellable,
};
use crate::transport::smsc::{
    Command, EMPTY_REPLY, Endpoint, build_request, decode_balance_reply, decode_cost_reply,
    decode_send_reply, decode_status_reply, encode_send_args, encode_status_args, mirror_host,
};

const LOCAL_PREFIXES: &[&str] = &["7", "8"];
/// Hosts tried per command: the main one, then `www2.` to `www5.`.
const MAX_ATTEMPTS: u32 = 5;
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 11..=15;
/// `cost` argument of a real send: reply with id, parts, cost and balance.
const COST_SEND: u8 = 3;
/// `cost` argument of a price quote: nothing is sent.
const COST_QUOTE: u8 = 1;
const HLR_QUERY: &str = "hlr=1";

fn default_true() -> bool {
    true
}

fn default_charset() -> String {
    "utf-8".to_owned()
}

fn default_host() -> String {
    "smsc.ru".to_owned()
}

fn default_smtp_from() -> String {
    "api@smsc.ru".to_owned()
}

fn default_smtp_server() -> String {
    "send.smsc.ru".to_owned()
}

fn default_smtp_port() -> u16 {
    25
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// SMSC account and connection settings.
pub struct SmscOptions {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    /// POST the commands instead of passing them in the query string.
    #[serde(default = "default_true")]
    pub post: bool,
    #[serde(default)]
    pub https: bool,
    /// Charset label sent to the gateway and used to encode the request.
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Log a summary of every reply at `info` level.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Credentials are only sent when the login is set.
    #[serde(default)]
    pub smtp_login: String,
    #[serde(default)]
    pub smtp_password: String,
}

impl Default for SmscOptions {
    fn default() -> Self {
        Self {
            login: String::new(),
            password: String::new(),
            post: true,
            https: false,
            charset: default_charset(),
            debug: false,
            host: default_host(),
            smtp_from: default_smtp_from(),
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            smtp_login: String::new(),
            smtp_password: String::new(),
        }
    }
}

impl SmscOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("login", &self.login)?;
        require("password", &self.password)?;
        require("host", &self.host)?;
        self.encoding()?;
        Ok(())
    }

    fn encoding(&self) -> Result<&'static Encoding, ConfigError> {
        encoding_for_label(&self.charset).ok_or_else(|| ConfigError::UnknownCharset {
            label: self.charset.clone(),
        })
    }
}

#[derive(Clone)]
/// Adapter for the SMSC HTTP API (Russia).
///
/// Commands are positional form fields answered with comma separated text.
/// A command that gets no usable reply is repeated on the `www2.` to `www5.`
/// mirrors of the host.
pub struct SmscProvider {
    login: String,
    password: String,
    post: bool,
    https: bool,
    charset: String,
    encoding: &'static Encoding,
    debug: bool,
    host: String,
    smtp_from: String,
    http: Arc<dyn HttpTransport>,
    mail: Arc<dyn MailTransport>,
}

impl std::fmt::Debug for SmscProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmscProvider")
            .field("login", &self.login)
            .field("host", &self.host)
            .field("charset", &self.charset)
            .finish_non_exhaustive()
    }
}

impl SmscProvider {
    /// Validate `options` and build an adapter with its own HTTP client (60 s timeout).
    pub fn new(options: SmscOptions) -> Result<Self, SmsError> {
        let client = crate::provider::build_http_client(DEFAULT_TIMEOUT, None)?;
        Self::with_client(options, client)
    }

    /// Validate `options` and build an adapter on a shared client.
    pub fn with_client(options: SmscOptions, client: reqwest::Client) -> Result<Self, SmsError> {
        let credentials = (!options.smtp_login.trim().is_empty())
            .then(|| (options.smtp_login.clone(), options.smtp_password.clone()));
        let mail = SmtpMailTransport::new(&options.smtp_server, options.smtp_port, credentials);
        Self::from_parts(
            options,
            Arc::new(ReqwestTransport::new(client)),
            Arc::new(mail),
        )
    }

    fn from_parts(
        options: SmscOptions,
        http: Arc<dyn HttpTransport>,
        mail: Arc<dyn MailTransport>,
    ) -> Result<Self, SmsError> {
        options.validate()?;
        let encoding = options.encoding()?;
        Ok(Self {
            login: options.login,
            password: options.password,
            post: options.post,
            https: options.https,
            charset: options.charset,
            encoding,
            debug: options.debug,
            host: options.host.trim().to_owned(),
            smtp_from: options.smtp_from,
            http,
            mail,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_transports(
        options: SmscOptions,
        http: Arc<dyn HttpTransport>,
        mail: Arc<dyn MailTransport>,
    ) -> Result<Self, SmsError> {
        Self::from_parts(options, http, mail)
    }

    /// Send `message` with files attached (MMS, e-mail formats).
    pub async fn send_with_attachments(
        &self,
        message: &Message,
        files: &[Attachment],
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        self.dispatch(message, files, cancel).await
    }

    /// Account balance in the account currency.
    pub async fn get_balance(&self, cancel: &CancellationToken) -> Result<String, SmsError> {
        let body = self.command(Command::Balance, &[], &[], cancel).await?;
        match decode_balance_reply(&body) {
            Reply::Success(balance) => {
                if self.debug {
                    tracing::info!(provider = self.name(), %balance, "balance");
                }
                Ok(balance)
            }
            Reply::Failure(errors) => Err(self.raise(errors)),
        }
    }

    /// Price of sending `message` without sending it.
    pub async fn get_sms_cost(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SmsCost, SmsError> {
        let data = self.message_data(message)?;
        let phones = self.validated_phones(message)?;
        let args = encode_send_args(
            &phones,
            message.body(),
            message.sender(),
            &data,
            COST_QUOTE,
        );
        let body = self.command(Command::Send, &args, &[], cancel).await?;
        match decode_cost_reply(&body) {
            Reply::Success(cost) => {
                if self.debug {
                    tracing::info!(
                        provider = self.name(),
                        cost = %cost.cost,
                        parts = cost.parts,
                        "cost quoted"
                    );
                }
                Ok(cost)
            }
            Reply::Failure(errors) => Err(self.raise(errors)),
        }
    }

    /// Ask the operator network whether the numbers are reachable (HLR request).
    ///
    /// `phone_number` may list several numbers separated by `;`.
    pub async fn check_phone_number(
        &self,
        phone_number: &str,
        sender: &str,
        allow_foreign: bool,
        cancel: &CancellationToken,
    ) -> Result<(), SmsError> {
        if phone_number.trim().is_empty() {
            return Err(SmsError::MissingArgument {
                name: "phone_number",
            });
        }
        if sender.trim().is_empty() {
            return Err(SmsError::MissingArgument { name: "sender" });
        }
        let numbers = phone_number
            .split(Message::DEFAULT_SEPARATOR)
            .map(str::trim)
            .filter(|it| !it.is_empty())
            .collect::<Vec<_>>();
        for number in &numbers {
            check_format(number)?;
            validate_recipient(self, number, allow_foreign)?;
        }

        let data = SmscData {
            query: Some(HLR_QUERY.to_owned()),
            ..SmscData::default()
        };
        let args = encode_send_args(&numbers.join(","), "", Some(sender), &data, COST_SEND);
        let body = self.command(Command::Send, &args, &[], cancel).await?;
        match decode_send_reply(&body) {
            Reply::Success(_) => Ok(()),
            Reply::Failure(errors) => Err(self.raise(errors)),
        }
    }

    /// Send `message` as mail through the SMSC SMTP gateway instead of HTTP.
    pub async fn send_via_mail(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<(), SmsError> {
        let data = self.message_data(message)?;
        let phones = self.validated_phones(message)?;
        let body = encode_mail_body(
            &self.login,
            &self.password,
            &phones,
            message.body(),
            message.sender(),
            &data,
        );
        let mail = build_mail(&self.smtp_from, &body, &self.charset, self.encoding)
            .map_err(|err| SmsError::Smtp(Box::new(err)))?;

        tracing::debug!(provider = self.name(), "sending message by mail");
        match send_cancellable(self.mail.as_ref(), mail, cancel).await {
            None => Err(SmsError::Cancelled),
            Some(sent) => sent.map_err(SmsError::Smtp),
        }
    }

    /// Blocking [`SmscProvider::send_with_attachments`].
    pub fn send_with_attachments_blocking(
        &self,
        message: &Message,
        files: &[Attachment],
    ) -> Result<SendingResult, SmsError> {
        block_on(self.send_with_attachments(message, files, &CancellationToken::new()))
    }

    pub fn get_balance_blocking(&self) -> Result<String, SmsError> {
        block_on(self.get_balance(&CancellationToken::new()))
    }

    pub fn get_sms_cost_blocking(&self, message: &Message) -> Result<SmsCost, SmsError> {
        block_on(self.get_sms_cost(message, &CancellationToken::new()))
    }

    pub fn check_phone_number_blocking(
        &self,
        phone_number: &str,
        sender: &str,
        allow_foreign: bool,
    ) -> Result<(), SmsError> {
        block_on(self.check_phone_number(
            phone_number,
            sender,
            allow_foreign,
            &CancellationToken::new(),
        ))
    }

    pub fn send_via_mail_blocking(&self, message: &Message) -> Result<(), SmsError> {
        block_on(self.send_via_mail(message, &CancellationToken::new()))
    }

    async fn dispatch(
        &self,
        message: &Message,
        files: &[Attachment],
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        let data = self.message_data(message)?;
        let phones = self.validated_phones(message)?;
        let args = encode_send_args(&phones, message.body(), message.sender(), &data, COST_SEND);
        tracing::debug!(
            provider = self.name(),
            attachments = files.len(),
            "sending message"
        );

        let body = self.command(Command::Send, &args, files, cancel).await?;
        match decode_send_reply(&body) {
            Reply::Success(record) => {
                if self.debug {
                    tracing::info!(
                        provider = self.name(),
                        id = record.message_id.as_deref().unwrap_or_default(),
                        parts = record.parts.unwrap_or_default(),
                        cost = record.cost.as_deref().unwrap_or_default(),
                        "message sent"
                    );
                }
                Ok(SendingResult::succeeded(self.name(), vec![record]))
            }
            Reply::Failure(errors) => {
                if self.debug {
                    tracing::info!(provider = self.name(), ?errors, "message rejected");
                }
                Ok(SendingResult::failed(self.name(), errors))
            }
        }
    }

    /// Run one command, walking the mirrors until a host answers with a non-empty body.
    ///
    /// When every host fails the synthetic reply `,` is returned so decoding
    /// yields a failure carrying it.
    async fn command(
        &self,
        command: Command,
        args: &[(String, String)],
        files: &[Attachment],
        cancel: &CancellationToken,
    ) -> Result<String, SmsError> {
        let endpoint = self.endpoint();
        for attempt in 1..=MAX_ATTEMPTS {
            let host = mirror_host(&self.host, attempt);
            let request = build_request(endpoint, &host, command, args, files);
            match execute_cancellable(self.http.as_ref(), request, cancel).await {
                Ok(response) if response.is_success() && !response.body.is_empty() => {
                    return Ok(response.body);
                }
                Ok(response) => {
                    tracing::warn!(
                        provider = self.name(),
                        %host,
                        status = response.status,
                        "no usable reply"
                    );
                }
                Err(HttpError::Cancelled) => return Err(SmsError::Cancelled),
                Err(err) => {
                    tracing::warn!(provider = self.name(), %host, error = %err, "request failed");
                }
            }
        }

        tracing::warn!(
            provider = self.name(),
            attempts = MAX_ATTEMPTS,
            "every mirror failed"
        );
        if self.debug {
            tracing::info!(provider = self.name(), host = %self.host, "could not read reply");
        }
        Ok(EMPTY_REPLY.to_owned())
    }

    fn endpoint(&self) -> Endpoint<'_> {
        Endpoint {
            login: &self.login,
            password: &self.password,
            https: self.https,
            post: self.post,
            charset: &self.charset,
            encoding: self.encoding,
            host: &self.host,
        }
    }

    fn message_data(&self, message: &Message) -> Result<SmscData, SmsError> {
        match message.extension() {
            Some(MessageExtension::Smsc(data)) => Ok(data.clone()),
            Some(other) => Err(SmsError::UnsupportedMessage {
                provider: self.name(),
                extension: other.provider_name(),
            }),
            None => Ok(SmscData::from_provider_data(message.provider_data())?.unwrap_or_default()),
        }
    }

    /// Check format, locality and body, then join the recipients for the `phones` field.
    fn validated_phones(&self, message: &Message) -> Result<String, SmsError> {
        let recipients = message.recipients();
        for recipient in &recipients {
            check_format(recipient)?;
        }
        validate_recipients(self, &recipients, message.body(), message.allows_foreign())?;
        Ok(recipients.join(","))
    }

    fn raise(&self, errors: Vec<crate::domain::SendingError>) -> SmsError {
        if self.debug {
            tracing::info!(provider = self.name(), ?errors, "request rejected");
        }
        vendor_error(self.name(), errors)
    }
}

/// SMSC numbers carry 11 to 15 digits once formatting is stripped.
fn check_format(phone_number: &str) -> Result<(), ValidationError> {
    let cleaned = clean_phone_number(phone_number);
    if PHONE_DIGITS.contains(&cleaned.len()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhoneNumber {
            input: phone_number.to_owned(),
        })
    }
}

#[async_trait]
impl SmsProvider for SmscProvider {
    fn name(&self) -> &'static str {
        ProviderName::Smsc.as_str()
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
        self.dispatch(message, &[], cancel).await
    }

    /// Requires the recipient number. Several ids may be passed joined with `,`.
    async fn get_status(
        &self,
        id: &str,
        phone_number: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StatusResult, SmsError> {
        if id.trim().is_empty() {
            return Err(SmsError::MissingArgument { name: "id" });
        }
        let phone_number = phone_number
            .filter(|it| !it.trim().is_empty())
            .ok_or(SmsError::MissingArgument {
                name: "phone_number",
            })?;

        let args = encode_status_args(id, phone_number);
        let body = self.command(Command::Status, &args, &[], cancel).await?;
        match decode_status_reply(&body, id, phone_number) {
            Reply::Success(records) => {
                if self.debug {
                    for record in &records {
                        tracing::info!(
                            provider = self.name(),
                            id = record.message_id.as_deref().unwrap_or_default(),
                            status = record.status.as_deref().unwrap_or_default(),
                            "status"
                        );
                    }
                }
                Ok(StatusResult::succeeded(self.name(), records))
            }
            Reply::Failure(errors) => Ok(StatusResult::failed(self.name(), errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderData, SendingError, SmsTrafficData, SmscFormat};
    use crate::transport::http::fake::{FakeTransport, assert_param};
    use crate::transport::http::{HttpRequest, Method, RequestBody};
    use crate::transport::mail::fake::FakeMailTransport;

    fn options() -> SmscOptions {
        SmscOptions {
            login: "user".to_owned(),
            password: "secret".to_owned(),
            ..SmscOptions::default()
        }
    }

    fn make_provider(transport: FakeTransport) -> SmscProvider {
        SmscProvider::with_transports(
            options(),
            Arc::new(transport),
            Arc::new(FakeMailTransport::default()),
        )
        .unwrap()
    }

    fn form_of(request: &HttpRequest) -> Vec<(String, String)> {
        let RequestBody::Raw { bytes, .. } = &request.body else {
            panic!("expected a url-encoded body, got {:?}", request.body);
        };
        url::form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn message(to: &str) -> Message {
        Message::new("hi", Some("Shop".to_owned()), to).unwrap()
    }

    #[test]
    fn options_reject_unknown_charset() {
        let parsed: SmscOptions =
            serde_json::from_str(r#"{"login": "user", "password": "secret"}"#).unwrap();
        assert_eq!(parsed, options());
        assert!(parsed.post);
        assert_eq!(parsed.smtp_port, 25);

        let err = SmscOptions {
            charset: "klingon".to_owned(),
            ..options()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownCharset {
                label: "klingon".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn send_posts_positional_fields() {
        let transport = FakeTransport::new().reply(200, "15,2,3.40,100.50");
        let provider = make_provider(transport.clone());

        let result = provider
            .send(&message("+7 (925) 123-45-67"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.records()[0].message_id.as_deref(), Some("15"));
        assert_eq!(result.records()[0].parts, Some(2));

        let request = transport.last_request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "http://smsc.ru/sys/send.php");
        let form = form_of(&request);
        assert_param(&form, "login", "user");
        assert_param(&form, "psw", "secret");
        assert_param(&form, "cost", "3");
        assert_param(&form, "phones", "+7 (925) 123-45-67");
        assert_param(&form, "mes", "hi");
        assert_param(&form, "sender", "Shop");
    }

    #[tokio::test]
    async fn empty_replies_walk_the_mirrors() {
        let transport = FakeTransport::new()
            .reply(200, "")
            .unavailable()
            .reply(500, "oops")
            .reply(200, "15,1,1.70,98.80");
        let provider = make_provider(transport.clone());

        let result = provider
            .send(&message("79251234567"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(
            transport.urls(),
            [
                "http://smsc.ru/sys/send.php",
                "http://www2.smsc.ru/sys/send.php",
                "http://www3.smsc.ru/sys/send.php",
                "http://www4.smsc.ru/sys/send.php"
            ]
        );
    }

    #[tokio::test]
    async fn exhausted_mirrors_give_a_synthetic_failure() {
        let transport = FakeTransport::new();
        let provider = make_provider(transport.clone());

        let result = provider
            .send(&message("79251234567"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.is_success());
        assert_eq!(result.errors(), &[SendingError::new(None, ",")]);
        assert_eq!(transport.requests().len(), 5);
        assert_eq!(transport.urls()[4], "http://www5.smsc.ru/sys/send.php");
    }

    #[tokio::test]
    async fn vendor_error_code_is_described() {
        let transport = FakeTransport::new().reply(200, "0,-3");
        let provider = make_provider(transport);

        let result = provider
            .send(&message("79251234567"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            result.errors(),
            &[SendingError::with_code(
                "-3",
                "Insufficient funds on the client account."
            )]
        );
    }

    #[tokio::test]
    async fn short_numbers_fail_format_check() {
        let transport = FakeTransport::new();
        let provider = make_provider(transport.clone());

        let err = provider
            .send(&message("7925123"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SmsError::Validation(ValidationError::InvalidPhoneNumber { .. })
        ));

        let err = provider
            .send(&message("998901234567"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SmsError::Validation(ValidationError::NotLocalNumber { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn provider_data_and_extensions_shape_the_request() {
        let transport = FakeTransport::new()
            .reply(200, "15,1")
            .reply(200, "16,1");
        let provider = make_provider(transport.clone());
        let cancel = CancellationToken::new();

        let projected = message("79251234567")
            .with_provider_data(ProviderData::new(SmscData::TRANSLIT, 1).unwrap())
            .with_provider_data(ProviderData::new(SmscData::FORMAT, 1).unwrap())
            .with_provider_data(ProviderData::new("Colour", "red").unwrap());
        provider.send(&projected, &cancel).await.unwrap();
        let form = form_of(&transport.last_request());
        assert_param(&form, "translit", "1");
        assert_param(&form, "flash", "1");
        assert!(form.iter().all(|(k, _)| k != "Colour"));

        let typed = message("79251234567").with_extension(SmscData {
            id: Some(42),
            format: Some(SmscFormat::Viber),
            ..SmscData::default()
        });
        provider.send(&typed, &cancel).await.unwrap();
        let form = form_of(&transport.last_request());
        assert_param(&form, "id", "42");
        assert_param(&form, "viber", "1");

        let foreign = message("79251234567").with_extension(SmsTrafficData::default());
        let err = provider.send(&foreign, &cancel).await.unwrap_err();
        assert!(matches!(err, SmsError::UnsupportedMessage { provider: "SMSC", .. }));
    }

    #[tokio::test]
    async fn get_requests_put_fields_in_the_query() {
        let transport = FakeTransport::new().reply(200, "15,1");
        let options = SmscOptions {
            post: false,
            https: true,
            ..options()
        };
        let provider = SmscProvider::with_transports(
            options,
            Arc::new(transport.clone()),
            Arc::new(FakeMailTransport::default()),
        )
        .unwrap();

        provider
            .send(&message("79251234567"), &CancellationToken::new())
            .await
            .unwrap();
        let request = transport.last_request();
        assert_eq!(request.method, Method::Get);
        assert!(request.url.starts_with("https://smsc.ru/sys/send.php?login=user&psw=secret"));
        assert!(request.url.contains("phones=79251234567"));
    }

    #[tokio::test]
    async fn status_needs_a_phone_number() {
        let transport = FakeTransport::new();
        let provider = make_provider(transport.clone());

        let err = provider
            .get_status("15", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SmsError::MissingArgument {
                name: "phone_number"
            }
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn single_and_multi_id_status() {
        let transport = FakeTransport::new()
            .reply(200, "1,1709289005,0")
            .reply(
                200,
                "1,1709289005,0,15,79251234567\n20,1709289010,1,16,79251234568",
            );
        let provider = make_provider(transport.clone());
        let cancel = CancellationToken::new();

        let result = provider
            .get_status("15", Some("79251234567"), &cancel)
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.records().len(), 1);
        assert_eq!(result.records()[0].status.as_deref(), Some("1"));
        let form = form_of(&transport.last_request());
        assert_param(&form, "id", "15");
        assert_param(&form, "phone", "79251234567");
        assert_param(&form, "all", "0");

        let result = provider
            .get_status("15,16", Some("79251234567,79251234568"), &cancel)
            .await
            .unwrap();
        assert_eq!(result.records().len(), 2);
        assert_eq!(result.records()[1].message_id.as_deref(), Some("16"));
        assert_eq!(result.records()[1].error_code.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn balance_cost_and_hlr_extras() {
        let transport = FakeTransport::new()
            .reply(200, "250.75")
            .reply(200, "3.40,2")
            .reply(200, "0,-7");
        let provider = make_provider(transport.clone());
        let cancel = CancellationToken::new();

        assert_eq!(provider.get_balance(&cancel).await.unwrap(), "250.75");
        assert_eq!(
            transport.last_request().url,
            "http://smsc.ru/sys/balance.php"
        );

        let cost = provider
            .get_sms_cost(&message("79251234567"), &cancel)
            .await
            .unwrap();
        assert_eq!(cost.parts, 2);
        assert_param(&form_of(&transport.last_request()), "cost", "1");

        let err = provider
            .check_phone_number("79251234567", "Shop", false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SmsError::Vendor { provider: "SMSC", code: Some(ref code), .. } if code == "-7"
        ));
        let form = form_of(&transport.last_request());
        assert_param(&form, "hlr", "1");
        assert_param(&form, "mes", "");

        let err = provider
            .check_phone_number("79251234567", " ", false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SmsError::MissingArgument { name: "sender" }));
    }

    #[tokio::test]
    async fn attachments_go_out_as_multipart() {
        let transport = FakeTransport::new().reply(200, "15,1");
        let provider = make_provider(transport.clone());
        let file = Attachment::new("photo.jpg", vec![0xFF, 0xD8]).unwrap();

        provider
            .send_with_attachments(&message("79251234567"), &[file], &CancellationToken::new())
            .await
            .unwrap();
        let RequestBody::Multipart { fields, files } = transport.last_request().body else {
            panic!("expected multipart");
        };
        assert_param(&fields, "phones", "79251234567");
        assert_eq!(files[0].file_name(), "photo.jpg");
    }

    #[tokio::test]
    async fn mail_fallback_formats_the_body() {
        let mail = FakeMailTransport::default();
        let provider = SmscProvider::with_transports(
            options(),
            Arc::new(FakeTransport::new()),
            Arc::new(mail.clone()),
        )
        .unwrap();

        provider
            .send_via_mail(&message("79251234567"), &CancellationToken::new())
            .await
            .unwrap();
        let sent = mail.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("To: send@send.smsc.ru"));
        assert!(sent[0].contains("user:secret:0::0,0,Shop:79251234567:hi"));
    }

    #[test]
    fn blocking_calls_cover_send_status_and_extras() {
        let transport = FakeTransport::new()
            .reply(200, "15,1")
            .reply(200, "1,1709289005,0")
            .reply(200, "250.75")
            .reply(200, "3.40,2")
            .reply(200, "16,1")
            .reply(200, "17,1");
        let mail = FakeMailTransport::default();
        let provider = SmscProvider::with_transports(
            options(),
            Arc::new(transport.clone()),
            Arc::new(mail.clone()),
        )
        .unwrap();
        let sms = message("79251234567");

        let sent = provider.send_blocking(&sms).unwrap();
        assert_eq!(sent.records()[0].message_id.as_deref(), Some("15"));
        let status = provider
            .get_status_blocking("15", Some("79251234567"))
            .unwrap();
        assert_eq!(status.records()[0].status.as_deref(), Some("1"));
        assert_eq!(provider.get_balance_blocking().unwrap(), "250.75");
        assert_eq!(provider.get_sms_cost_blocking(&sms).unwrap().parts, 2);

        provider
            .check_phone_number_blocking("79251234567", "Shop", false)
            .unwrap();
        assert_param(&form_of(&transport.last_request()), "hlr", "1");

        let file = Attachment::new("photo.jpg", vec![0xFF, 0xD8]).unwrap();
        let sent = provider
            .send_with_attachments_blocking(&sms, &[file])
            .unwrap();
        assert_eq!(sent.records()[0].message_id.as_deref(), Some("17"));
        assert!(matches!(
            transport.last_request().body,
            RequestBody::Multipart { .. }
        ));
        assert_eq!(transport.requests().len(), 6);

        provider.send_via_mail_blocking(&sms).unwrap();
        assert_eq!(mail.sent().len(), 1);
    }

    #[test]
    fn with_client_still_validates_options() {
        let client = crate::provider::build_http_client(DEFAULT_TIMEOUT, None).unwrap();
        let err = SmscProvider::with_client(SmscOptions::default(), client).unwrap_err();
        assert!(matches!(
            err,
            SmsError::Config(ConfigError::MissingField { field: "login" })
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_the_mirror_walk() {
        let transport = FakeTransport::new();
        let provider = make_provider(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = provider
            .send(&message("79251234567"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SmsError::Cancelled));
        assert!(transport.requests().is_empty());
    }
}
