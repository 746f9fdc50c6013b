use encoding_rs::Encoding;

use crate::domain::{
    Attachment, DeliveryRecord, SendingError, SmsCost, SmscData, SmscStatusCode, StatusRecord,
    parse_vendor_datetime, smsc_error_message,
};
use crate::transport::Reply;
use crate::transport::charset::encode_form_with;
use crate::transport::http::{HttpRequest, RequestBody};

/// Body used when every mirror failed to answer.
pub(crate) const EMPTY_REPLY: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Send,
    Status,
    Balance,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Status => "status",
            Self::Balance => "balance",
        }
    }
}

/// Connection settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Endpoint<'a> {
    pub login: &'a str,
    pub password: &'a str,
    pub https: bool,
    pub post: bool,
    pub charset: &'a str,
    pub encoding: &'static Encoding,
    pub host: &'a str,
}

/// Host for the 1-based `attempt`: the configured host first, then `www2.`, `www3.`, ...
pub(crate) fn mirror_host(host: &str, attempt: u32) -> String {
    if attempt <= 1 {
        host.to_owned()
    } else {
        format!("www{attempt}.{host}")
    }
}

pub(crate) fn command_url(https: bool, host: &str, command: Command) -> String {
    let scheme = if https { "https" } else { "http" };
    format!("{scheme}://{host}/sys/{}.php", command.as_str())
}

/// Build the request for one attempt against `host`.
///
/// Attachments force a multipart POST; otherwise `post` picks POST or GET.
pub(crate) fn build_request(
    endpoint: Endpoint<'_>,
    host: &str,
    command: Command,
    args: &[(String, String)],
    files: &[Attachment],
) -> HttpRequest {
    let mut params = vec![
        ("login".to_owned(), endpoint.login.to_owned()),
        ("psw".to_owned(), endpoint.password.to_owned()),
        ("fmt".to_owned(), "1".to_owned()),
        ("charset".to_owned(), endpoint.charset.to_owned()),
    ];
    params.extend_from_slice(args);

    let url = command_url(endpoint.https, host, command);
    if !files.is_empty() {
        return HttpRequest::post(
            url,
            RequestBody::Multipart {
                fields: params,
                files: files.to_vec(),
            },
        );
    }

    // Percent-encoding output is plain ASCII.
    let encoded = encode_form_with(&params, endpoint.encoding);
    if endpoint.post {
        HttpRequest::post(
            url,
            RequestBody::Raw {
                content_type: "application/x-www-form-urlencoded".to_owned(),
                bytes: encoded,
            },
        )
    } else {
        let query = String::from_utf8_lossy(&encoded);
        HttpRequest::get(format!("{url}?{query}"))
    }
}

/// Positional arguments of a `send` command.
///
/// `cost` is `3` for a real send (reply carries id, parts, cost and balance)
/// and `1` for a price quote.
pub(crate) fn encode_send_args(
    phones: &str,
    message: &str,
    sender: Option<&str>,
    data: &SmscData,
    cost: u8,
) -> Vec<(String, String)> {
    let mut args = vec![
        ("cost".to_owned(), cost.to_string()),
        ("phones".to_owned(), phones.to_owned()),
        ("mes".to_owned(), message.to_owned()),
        ("id".to_owned(), data.id.unwrap_or(0).to_string()),
        ("translit".to_owned(), data.translit.unwrap_or(0).to_string()),
    ];
    if let Some(format) = data.format {
        let (key, value) = format.query_param();
        args.push((key.to_owned(), value.to_owned()));
    }
    if let Some(sender) = sender.filter(|it| !it.is_empty()) {
        args.push(("sender".to_owned(), sender.to_owned()));
    }
    if let Some(time) = data.time.as_deref().filter(|it| !it.is_empty()) {
        args.push(("time".to_owned(), time.to_owned()));
    }
    if let Some(query) = data.query.as_deref().filter(|it| !it.is_empty()) {
        args.extend(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        );
    }
    args
}

pub(crate) fn encode_status_args(id: &str, phone: &str) -> Vec<(String, String)> {
    vec![
        ("phone".to_owned(), phone.to_owned()),
        ("id".to_owned(), id.to_owned()),
        ("all".to_owned(), "0".to_owned()),
    ]
}

/// Several comma-separated ids produce one reply line per message.
pub(crate) fn is_multi_id(id: &str) -> bool {
    id.contains(',')
}

fn fields(body: &str) -> Vec<&str> {
    body.trim().split(',').map(str::trim).collect()
}

fn vendor_error(code: &str) -> SendingError {
    SendingError::with_code(code, smsc_error_message(code))
}

fn raw_failure<T>(body: &str) -> Reply<T> {
    Reply::Failure(vec![SendingError::new(None, body)])
}

/// Decode `id,cnt,cost,balance` or `id,-error`.
pub(crate) fn decode_send_reply(body: &str) -> Reply<DeliveryRecord> {
    let fields = fields(body);
    let Some(count) = fields.get(1).and_then(|it| it.parse::<i64>().ok()) else {
        return raw_failure(body);
    };
    if count <= 0 {
        return Reply::Failure(vec![vendor_error(fields[1])]);
    }
    Reply::Success(DeliveryRecord {
        message_id: Some(fields[0].to_owned()).filter(|it| !it.is_empty()),
        parts: u32::try_from(count).ok(),
        cost: fields.get(2).map(|it| (*it).to_owned()),
        ..DeliveryRecord::default()
    })
}

/// Decode `cost,cnt` or `0,-error`.
pub(crate) fn decode_cost_reply(body: &str) -> Reply<SmsCost> {
    let fields = fields(body);
    let Some(count) = fields.get(1).and_then(|it| it.parse::<i64>().ok()) else {
        return raw_failure(body);
    };
    if count <= 0 {
        return Reply::Failure(vec![vendor_error(fields[1])]);
    }
    Reply::Success(SmsCost {
        cost: fields[0].to_owned(),
        parts: u32::try_from(count).unwrap_or(u32::MAX),
    })
}

/// Decode `balance` or `0,-error`.
pub(crate) fn decode_balance_reply(body: &str) -> Reply<String> {
    let fields = fields(body);
    match fields.as_slice() {
        [balance] if !balance.is_empty() => Reply::Success((*balance).to_owned()),
        [_, code, ..] if code.starts_with('-') => Reply::Failure(vec![vendor_error(code)]),
        _ => raw_failure(body),
    }
}

/// Decode a status reply.
///
/// A single id answers `status,time,err`; several ids answer one
/// `status,time,err,id,phone` line each. Either may be `0,-error`.
pub(crate) fn decode_status_reply(body: &str, id: &str, phone: &str) -> Reply<Vec<StatusRecord>> {
    if !is_multi_id(id) {
        let fields = fields(body);
        return match fields.as_slice() {
            [_, code, ..] if code.starts_with('-') => Reply::Failure(vec![vendor_error(code)]),
            [status, time, rest @ ..] => match status_record(status, time, rest.first().copied()) {
                Some(record) => Reply::Success(vec![StatusRecord {
                    message_id: Some(id.to_owned()),
                    recipient: Some(phone.to_owned()),
                    ..record
                }]),
                None => raw_failure(body),
            },
            _ => raw_failure(body),
        };
    }

    let lines = body
        .split('\n')
        .map(str::trim)
        .filter(|it| !it.is_empty())
        .collect::<Vec<_>>();
    if let [line] = lines.as_slice() {
        if let [_, code] = fields(line).as_slice() {
            if code.starts_with('-') {
                return Reply::Failure(vec![vendor_error(code)]);
            }
        }
    }

    let mut records = Vec::with_capacity(lines.len());
    for line in lines {
        let fields = fields(line);
        let [status, time, err, message_id, recipient, ..] = fields.as_slice() else {
            return raw_failure(body);
        };
        let Some(record) = status_record(status, time, Some(*err)) else {
            return raw_failure(body);
        };
        records.push(StatusRecord {
            message_id: Some((*message_id).to_owned()),
            recipient: Some((*recipient).to_owned()),
            ..record
        });
    }
    if records.is_empty() {
        return raw_failure(body);
    }
    Reply::Success(records)
}

fn status_record(status: &str, time: &str, err: Option<&str>) -> Option<StatusRecord> {
    let code = SmscStatusCode::new(status.parse().ok()?);
    Some(StatusRecord {
        status: Some(status.to_owned()),
        description: Some(code.description()),
        error_code: err
            .filter(|it| !it.is_empty() && *it != "0")
            .map(str::to_owned),
        last_changed: parse_vendor_datetime(time),
        ..StatusRecord::default()
    })
}
