//! SMTP fallback for SMSC: the message travels as a specially formatted mail.

use encoding_rs::Encoding;
use lettre::message::header::ContentType;
use lettre::message::{Body, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tokio_util::sync::CancellationToken;

use crate::domain::SmscData;
use crate::transport::http::{BoxError, BoxFuture};

/// Gateway mailbox that turns incoming mail into SMS.
pub(crate) const SMSC_MAIL_TO: &str = "send@send.smsc.ru";

#[derive(Debug, thiserror::Error)]
pub(crate) enum MailError {
    #[error("invalid mailbox {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("invalid content type: {0}")]
    ContentType(String),

    #[error("failed to build mail: {0}")]
    Build(#[from] lettre::error::Error),
}

/// Positional mail body: `login:password:id:time:translit,format,sender:phones:message`.
pub(crate) fn encode_mail_body(
    login: &str,
    password: &str,
    phones: &str,
    message: &str,
    sender: Option<&str>,
    data: &SmscData,
) -> String {
    format!(
        "{login}:{password}:{id}:{time}:{translit},{format},{sender}:{phones}:{message}",
        id = data.id.unwrap_or(0),
        time = data.time.as_deref().unwrap_or_default(),
        translit = data.translit.unwrap_or(0),
        format = data.format.map_or(0, |it| it.index()),
        sender = sender.unwrap_or_default(),
    )
}

/// Build the plain-text mail, with the body transcoded to `encoding`.
pub(crate) fn build_mail(
    from: &str,
    body: &str,
    charset: &str,
    encoding: &'static Encoding,
) -> Result<lettre::Message, MailError> {
    let from = parse_mailbox(from)?;
    let to = parse_mailbox(SMSC_MAIL_TO)?;
    let content_type = ContentType::parse(&format!("text/plain; charset={charset}"))
        .map_err(|err| MailError::ContentType(err.to_string()))?;
    let (bytes, _, _) = encoding.encode(body);

    let mail = lettre::Message::builder()
        .from(from)
        .to(to)
        .header(content_type)
        .body(Body::new(bytes.into_owned()))?;
    Ok(mail)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_owned(),
        source,
    })
}

pub(crate) trait MailTransport: Send + Sync {
    fn send(&self, mail: lettre::Message) -> BoxFuture<'_, Result<(), BoxError>>;
}

/// Send `mail`, giving up as soon as `cancel` fires.
pub(crate) async fn send_cancellable(
    transport: &dyn MailTransport,
    mail: lettre::Message,
    cancel: &CancellationToken,
) -> Option<Result<(), BoxError>> {
    if cancel.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        sent = transport.send(mail) => Some(sent),
    }
}

/// Plain SMTP relay, no TLS, optional credentials.
#[derive(Clone)]
pub(crate) struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(server: &str, port: u16, credentials: Option<(String, String)>) -> Self {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server).port(port);
        if let Some((login, password)) = credentials {
            builder = builder.credentials(Credentials::new(login, password));
        }
        Self {
            transport: builder.build(),
        }
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, mail: lettre::Message) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(async move {
            self.transport
                .send(mail)
                .await
                .map(|_| ())
                .map_err(|err| Box::new(err) as BoxError)
        })
    }
}
