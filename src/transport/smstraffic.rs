use serde::Deserialize;

use crate::domain::{
    DeliveryRecord, GroupOperation, SendingError, SmsTrafficData, SmsTrafficGroup, StatusRecord,
    parse_vendor_datetime, unknown_code_message,
};
use crate::transport::Reply;
use crate::transport::charset::{WINDOWS_1251_FORM_CONTENT_TYPE, encode_windows_1251_form};
use crate::transport::http::RequestBody;

pub(crate) const SEND_PATH: &str = "multi.php";
pub(crate) const LIST_PATH: &str = "list.php";

const SUCCESS_RESULT: &str = "OK";
const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub(crate) enum TransportError {
    #[error("invalid XML response: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("response is missing <{field}>")]
    MissingField { field: &'static str },
}

/// Fields of a send request that are not credentials.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SendFields<'a> {
    /// Recipients joined with `,`, or a group name.
    pub to: &'a str,
    pub message: &'a str,
    pub originator: Option<&'a str>,
    pub data: Option<&'a SmsTrafficData>,
}

/// Whether `to` names a distribution group rather than phone numbers.
pub(crate) fn is_group_target(to: &str) -> bool {
    to.chars().any(char::is_alphabetic)
}

pub(crate) fn encode_send_form(
    login: &str,
    password: &str,
    fields: SendFields<'_>,
) -> Vec<(String, String)> {
    let defaults = SmsTrafficData::default();
    let data = fields.data.unwrap_or(&defaults);
    // Individual-message lines embed their text, so letters there do not mean a group.
    let individual = data.individual_messages.unwrap_or(false);
    let to_group = !individual && is_group_target(fields.to);

    let mut params = credentials(login, password);
    if !to_group {
        push(&mut params, "phones", Some(fields.to.to_owned()));
    }
    if !fields.message.is_empty() {
        push(&mut params, "message", Some(fields.message.to_owned()));
    }
    push(&mut params, "rus", Some(data.rus.to_string()));
    push(&mut params, "originator", fields.originator.map(str::to_owned));
    push(&mut params, "flash", data.flash.map(flag));
    push(
        &mut params,
        "start_date",
        data.start_date
            .map(|date| date.format(START_DATE_FORMAT).to_string()),
    );
    push(&mut params, "max_parts", data.max_parts.map(|it| it.to_string()));
    push(&mut params, "gap", data.gap.map(|it| it.to_string()));
    let group = data
        .group
        .clone()
        .or_else(|| to_group.then(|| fields.to.to_owned()));
    push(&mut params, "group", group);
    push(&mut params, "timeout", data.timeout.map(|it| it.to_string()));
    push(
        &mut params,
        "individual_messages",
        data.individual_messages.map(flag),
    );
    push(&mut params, "delimiter", data.delimiter.clone());
    push(&mut params, "want_sms_ids", data.want_sms_ids.map(flag));
    push(&mut params, "with_push_id", data.with_push_id.map(flag));
    push(
        &mut params,
        "ignore_phone_format",
        data.ignore_phone_format.map(flag),
    );
    push(&mut params, "two_byte_concat", data.two_byte_concat.map(flag));
    params
}

/// Encode a send request body: the plain form for UTF-8, windows-1251 bytes otherwise.
pub(crate) fn encode_send_body(
    login: &str,
    password: &str,
    fields: SendFields<'_>,
) -> RequestBody {
    let utf8 = fields.data.is_none_or(SmsTrafficData::is_utf8);
    let params = encode_send_form(login, password, fields);
    if utf8 {
        RequestBody::Form(params)
    } else {
        RequestBody::Raw {
            content_type: WINDOWS_1251_FORM_CONTENT_TYPE.to_owned(),
            bytes: encode_windows_1251_form(&params),
        }
    }
}

pub(crate) fn encode_status_form(login: &str, password: &str, sms_id: &str) -> Vec<(String, String)> {
    let mut params = operation(login, password, "status");
    params.push(("sms_id".to_owned(), sms_id.to_owned()));
    params
}

pub(crate) fn encode_account_form(login: &str, password: &str) -> Vec<(String, String)> {
    operation(login, password, "account")
}

pub(crate) fn encode_group_list_form(login: &str, password: &str) -> Vec<(String, String)> {
    operation(login, password, "status_all")
}

pub(crate) fn encode_group_form(login: &str, password: &str, group_id: &str) -> Vec<(String, String)> {
    let mut params = operation(login, password, "status");
    params.push(("group_id".to_owned(), group_id.to_owned()));
    params
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberOperation {
    Add,
    Remove,
}

impl MemberOperation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add_member",
            Self::Remove => "remove_member",
        }
    }
}

pub(crate) fn encode_member_form(
    login: &str,
    password: &str,
    operation_kind: MemberOperation,
    group_id: &str,
    members: &[&str],
) -> Vec<(String, String)> {
    let mut params = operation(login, password, operation_kind.as_str());
    params.push(("group_id".to_owned(), group_id.to_owned()));
    params.push(("member".to_owned(), members.join(",")));
    params
}

fn credentials(login: &str, password: &str) -> Vec<(String, String)> {
    vec![
        ("login".to_owned(), login.to_owned()),
        ("password".to_owned(), password.to_owned()),
    ]
}

fn operation(login: &str, password: &str, name: &str) -> Vec<(String, String)> {
    let mut params = credentials(login, password);
    params.push(("operation".to_owned(), name.to_owned()));
    params
}

fn push(params: &mut Vec<(String, String)>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        params.push((key.to_owned(), value));
    }
}

fn flag(value: bool) -> String {
    let flag = if value { "1" } else { "0" };
    flag.to_owned()
}

#[derive(Debug, Deserialize)]
struct ReplyXml {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    message_infos: Option<MessageInfosXml>,
}

impl ReplyXml {
    fn is_ok(&self) -> bool {
        self.result.as_deref().map(str::trim) == Some(SUCCESS_RESULT)
    }

    fn into_error(self) -> SendingError {
        let code = non_empty(self.code);
        let message = non_empty(self.description)
            .unwrap_or_else(|| unknown_code_message(code.as_deref().unwrap_or_default()));
        SendingError::new(code, message)
    }
}

#[derive(Debug, Default, Deserialize)]
struct MessageInfosXml {
    #[serde(default)]
    message_info: Vec<MessageInfoXml>,
}

#[derive(Debug, Deserialize)]
struct MessageInfoXml {
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    sms_id: Option<String>,
    #[serde(default)]
    push_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusReplyXml {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    submition_date: Option<String>,
    #[serde(default)]
    send_date: Option<String>,
    #[serde(default)]
    last_status_change_date: Option<String>,
    #[serde(default)]
    sms_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountReplyXml {
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupListReplyXml {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    groups: Option<GroupsXml>,
}

#[derive(Debug, Default, Deserialize)]
struct GroupsXml {
    #[serde(default)]
    group: Vec<GroupXml>,
}

#[derive(Debug, Deserialize)]
struct GroupXml {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    congratulate: Option<String>,
}

impl From<GroupXml> for SmsTrafficGroup {
    fn from(value: GroupXml) -> Self {
        Self {
            id: non_empty(value.id),
            name: non_empty(value.name),
            created: non_empty(value.created),
            congratulate: non_empty(value.congratulate),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|it| it.trim().to_owned())
        .filter(|it| !it.is_empty())
}

/// A reply is an error when it carries a `result` other than `OK`.
fn error_reply(
    result: Option<&str>,
    code: Option<String>,
    description: Option<String>,
) -> Option<SendingError> {
    let result = result.map(str::trim)?;
    if result == SUCCESS_RESULT {
        return None;
    }
    Some(
        ReplyXml {
            result: Some(result.to_owned()),
            code,
            description,
            message_infos: None,
        }
        .into_error(),
    )
}

pub(crate) fn decode_send_response(body: &str) -> Result<Reply<Vec<DeliveryRecord>>, TransportError> {
    let reply: ReplyXml = quick_xml::de::from_str(body)?;
    if !reply.is_ok() {
        return Ok(Reply::Failure(vec![reply.into_error()]));
    }

    let records = reply
        .message_infos
        .unwrap_or_default()
        .message_info
        .into_iter()
        .map(|info| DeliveryRecord {
            recipient: non_empty(info.phone),
            message_id: non_empty(info.sms_id),
            request_id: non_empty(info.push_id),
            ..DeliveryRecord::default()
        })
        .collect();
    Ok(Reply::Success(records))
}

pub(crate) fn decode_status_response(body: &str) -> Result<Reply<Vec<StatusRecord>>, TransportError> {
    let reply: StatusReplyXml = quick_xml::de::from_str(body)?;
    if let Some(error) = non_empty(reply.error) {
        return Ok(Reply::Failure(vec![SendingError::new(None, error)]));
    }

    let status = non_empty(reply.status);
    let last_changed = reply
        .last_status_change_date
        .as_deref()
        .and_then(parse_vendor_datetime);
    let delivered = status
        .as_deref()
        .is_some_and(|it| it.eq_ignore_ascii_case("delivered"));
    let record = StatusRecord {
        status,
        message_id: non_empty(reply.sms_id),
        date_received: reply.submition_date.as_deref().and_then(parse_vendor_datetime),
        date_sent: reply.send_date.as_deref().and_then(parse_vendor_datetime),
        date_delivered: if delivered { last_changed } else { None },
        last_changed,
        ..StatusRecord::default()
    };
    Ok(Reply::Success(vec![record]))
}

pub(crate) fn decode_account_response(body: &str) -> Result<Reply<String>, TransportError> {
    let reply: AccountReplyXml = quick_xml::de::from_str(body)?;
    if let Some(error) = error_reply(reply.result.as_deref(), reply.code, reply.description) {
        return Ok(Reply::Failure(vec![error]));
    }
    let account = non_empty(reply.account).ok_or(TransportError::MissingField { field: "account" })?;
    Ok(Reply::Success(account))
}

pub(crate) fn decode_group_list_response(
    body: &str,
) -> Result<Reply<Vec<SmsTrafficGroup>>, TransportError> {
    let reply: GroupListReplyXml = quick_xml::de::from_str(body)?;
    if let Some(error) = error_reply(reply.result.as_deref(), reply.code, reply.description) {
        return Ok(Reply::Failure(vec![error]));
    }
    let groups = reply
        .groups
        .unwrap_or_default()
        .group
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Reply::Success(groups))
}

pub(crate) fn decode_group_operation_response(
    body: &str,
) -> Result<Reply<GroupOperation>, TransportError> {
    let reply: ReplyXml = quick_xml::de::from_str(body)?;
    if !reply.is_ok() {
        return Ok(Reply::Failure(vec![reply.into_error()]));
    }
    Ok(Reply::Success(GroupOperation {
        code: non_empty(reply.code),
        description: non_empty(reply.description),
    }))
}
