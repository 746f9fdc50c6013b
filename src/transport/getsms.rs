use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::domain::{
    DeliveryRecord, SendingError, StatusRecord, parse_vendor_datetime, unknown_code_message,
};
use crate::transport::Reply;
use crate::transport::text::TransportText;

/// Field whose presence marks an error payload.
const ERROR_FIELD: &str = "error";

#[derive(Debug, thiserror::Error)]
pub(crate) enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is neither an object nor an array of objects")]
    UnexpectedShape,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorJson {
    #[serde(default)]
    error: Option<TransportText>,
    #[serde(default)]
    code: Option<TransportText>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl From<ErrorJson> for SendingError {
    fn from(value: ErrorJson) -> Self {
        let error = value.error;
        let code = value
            .code
            .or_else(|| error.clone().filter(TransportText::is_numeric))
            .map(TransportText::into_string);
        let message = value
            .message
            .or(value.text)
            .or_else(|| {
                error
                    .filter(|it| !it.is_numeric())
                    .map(TransportText::into_string)
            })
            .unwrap_or_else(|| unknown_code_message(code.as_deref().unwrap_or_default()));
        SendingError::new(code, message)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SendJson {
    #[serde(default)]
    recipient: Option<TransportText>,
    #[serde(default)]
    date_received: Option<TransportText>,
    #[serde(default)]
    message_id: Option<TransportText>,
    #[serde(default)]
    request_id: Option<TransportText>,
}

impl From<SendJson> for DeliveryRecord {
    fn from(value: SendJson) -> Self {
        Self {
            recipient: value.recipient.map(TransportText::into_string),
            message_id: value.message_id.map(TransportText::into_string),
            request_id: value.request_id.map(TransportText::into_string),
            accepted_at: value.date_received.as_ref().and_then(to_datetime),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StatusJson {
    #[serde(default)]
    status: Option<TransportText>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    recipient: Option<TransportText>,
    #[serde(default)]
    date_received: Option<TransportText>,
    #[serde(default)]
    date_sent: Option<TransportText>,
    #[serde(default)]
    date_delivered: Option<TransportText>,
    #[serde(default)]
    message_id: Option<TransportText>,
    #[serde(default)]
    request_id: Option<TransportText>,
}

impl From<StatusJson> for StatusRecord {
    fn from(value: StatusJson) -> Self {
        Self {
            status: value.status.map(TransportText::into_string),
            description: value.description,
            recipient: value.recipient.map(TransportText::into_string),
            message_id: value.message_id.map(TransportText::into_string),
            request_id: value.request_id.map(TransportText::into_string),
            date_received: value.date_received.as_ref().and_then(to_datetime),
            date_sent: value.date_sent.as_ref().and_then(to_datetime),
            date_delivered: value.date_delivered.as_ref().and_then(to_datetime),
            ..Self::default()
        }
    }
}

fn to_datetime(value: &TransportText) -> Option<chrono::NaiveDateTime> {
    parse_vendor_datetime(value.as_str())
}

pub(crate) fn encode_send_form(
    login: &str,
    password: &str,
    nickname: Option<&str>,
    recipients: &[&str],
    text: &str,
) -> Vec<(String, String)> {
    let data = recipients
        .iter()
        .map(|phone| json!({ "phone": phone, "text": text }))
        .collect::<Vec<_>>();

    let mut params = credentials(login, password);
    if let Some(nickname) = nickname.filter(|it| !it.is_empty()) {
        params.push(("nickname".to_owned(), nickname.to_owned()));
    }
    params.push(("data".to_owned(), Value::Array(data).to_string()));
    params
}

pub(crate) fn encode_status_form(login: &str, password: &str, request_id: &str) -> Vec<(String, String)> {
    let data = json!([{ "request_id": request_id }]);
    let mut params = credentials(login, password);
    params.push(("data".to_owned(), data.to_string()));
    params
}

fn credentials(login: &str, password: &str) -> Vec<(String, String)> {
    vec![
        ("login".to_owned(), login.to_owned()),
        ("password".to_owned(), password.to_owned()),
    ]
}

pub(crate) fn decode_send_response(
    body: &str,
) -> Result<Reply<Vec<DeliveryRecord>>, TransportError> {
    decode_reply::<SendJson, DeliveryRecord>(body)
}

pub(crate) fn decode_status_response(
    body: &str,
) -> Result<Reply<Vec<StatusRecord>>, TransportError> {
    decode_reply::<StatusJson, StatusRecord>(body)
}

/// Sniff the payload kind by the `error` field, then decode into the matching shape.
fn decode_reply<J, T>(body: &str) -> Result<Reply<Vec<T>>, TransportError>
where
    J: DeserializeOwned + Into<T>,
{
    let root: Value = serde_json::from_str(body)?;
    match root {
        Value::Object(ref object) => {
            if object.contains_key(ERROR_FIELD) {
                let error: ErrorJson = serde_json::from_value(root)?;
                return Ok(Reply::Failure(vec![error.into()]));
            }
            let record: J = serde_json::from_value(root)?;
            Ok(Reply::Success(vec![record.into()]))
        }
        Value::Array(ref items) => {
            let first = items
                .iter()
                .find_map(Value::as_object)
                .ok_or(TransportError::UnexpectedShape)?;
            if first.contains_key(ERROR_FIELD) {
                let errors: Vec<ErrorJson> = serde_json::from_value(root)?;
                return Ok(Reply::Failure(
                    errors.into_iter().map(Into::into).collect(),
                ));
            }
            let records: Vec<J> = serde_json::from_value(root)?;
            Ok(Reply::Success(
                records.into_iter().map(Into::into).collect(),
            ))
        }
        _ => Err(TransportError::UnexpectedShape),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn send_form_carries_json_data_field() {
        let params = encode_send_form(
            "user",
            "secret",
            Some("Shop"),
            &["998901234567", "998901234568"],
            "hi \"there\"",
        );
        assert_eq!(params[0], ("login".to_owned(), "user".to_owned()));
        assert_eq!(params[1], ("password".to_owned(), "secret".to_owned()));
        assert_eq!(params[2], ("nickname".to_owned(), "Shop".to_owned()));
        let data: Value = serde_json::from_str(&params[3].1).unwrap();
        assert_eq!(
            data,
            json!([
                {"phone": "998901234567", "text": "hi \"there\""},
                {"phone": "998901234568", "text": "hi \"there\""}
            ])
        );
    }

    #[test]
    fn send_form_skips_empty_nickname() {
        let params = encode_send_form("user", "secret", Some(""), &["998901234567"], "hi");
        assert!(params.iter().all(|(k, _)| k != "nickname"));
    }

    #[test]
    fn status_form_wraps_request_id() {
        let params = encode_status_form("user", "secret", "42");
        assert_eq!(params[2].1, r#"[{"request_id":"42"}]"#);
    }

    #[test]
    fn success_array_decodes_every_record() {
        let body = r#"[
            {"recipient": 998901234567, "text": "hi", "user_id": 7,
             "date_received": 1709289005, "message_id": 1001, "request_id": 55,
             "client_ip": "127.0.0.1"},
            {"recipient": 998901234568, "message_id": 1002, "request_id": 55,
             "date_received": "2024-03-01 10:30:05"}
        ]"#;
        let Reply::Success(records) = decode_send_response(body).unwrap() else {
            panic!("expected success");
        };
        let expected_date = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 5)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].recipient.as_deref(), Some("998901234567"));
        assert_eq!(records[0].message_id.as_deref(), Some("1001"));
        assert_eq!(records[0].request_id.as_deref(), Some("55"));
        assert_eq!(records[0].accepted_at, Some(expected_date));
        assert_eq!(records[1].accepted_at, Some(expected_date));
    }

    #[test]
    fn error_object_is_sniffed_before_decoding() {
        let body = r#"{"error": 1, "code": "104", "message": "Invalid login or password"}"#;
        let reply = decode_send_response(body).unwrap();
        assert_eq!(
            reply,
            Reply::Failure(vec![SendingError::with_code(
                "104",
                "Invalid login or password"
            )])
        );
    }

    #[test]
    fn error_array_with_text_error() {
        let body = r#"[{"error": "Not enough money"}]"#;
        let reply = decode_send_response(body).unwrap();
        assert_eq!(
            reply,
            Reply::Failure(vec![SendingError::new(None, "Not enough money")])
        );
    }

    #[test]
    fn status_object_decodes_single_record() {
        let body = r#"{"status": "2", "description": "Delivered", "recipient": "998901234567",
            "date_sent": "20240301103005", "date_delivered": "0000-00-00 00:00:00",
            "message_id": "1001", "request_id": "55"}"#;
        let Reply::Success(records) = decode_status_response(body).unwrap() else {
            panic!("expected success");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status.as_deref(), Some("2"));
        assert_eq!(records[0].description.as_deref(), Some("Delivered"));
        assert!(records[0].date_sent.is_some());
        assert_eq!(records[0].date_delivered, None);
    }

    #[test]
    fn unexpected_shapes_are_errors() {
        assert!(matches!(
            decode_send_response("not json"),
            Err(TransportError::Json(_))
        ));
        assert!(matches!(
            decode_send_response("[1, 2]"),
            Err(TransportError::UnexpectedShape)
        ));
        assert!(matches!(
            decode_status_response("\"ok\""),
            Err(TransportError::UnexpectedShape)
        ));
    }
}
