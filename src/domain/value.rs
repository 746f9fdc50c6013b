use std::fmt;

use chrono::{DateTime, NaiveDateTime};

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Providers shipped with this crate.
///
/// Each variant maps to the unique name its adapter registers under.
pub enum ProviderName {
    /// Uzbek gateway, <https://getsms.uz>.
    GetSms,
    /// Russian gateway, <https://www.smstraffic.ru>.
    SmsTraffic,
    /// Russian gateway, <https://smsc.ru>.
    Smsc,
}

impl ProviderName {
    /// Registration name of the provider.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetSms => "GetSMS",
            Self::SmsTraffic => "SmsTraffic",
            Self::Smsc => "SMSC",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remove the formatting characters `(`, `)`, space, `-` and `+` from a phone number.
pub fn clean_phone_number(phone_number: &str) -> String {
    phone_number
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ' ' | '-' | '+'))
        .collect()
}

/// Whether `phone_number` starts with one of `local_prefixes` once cleaned.
///
/// Always `true` when `allow_foreign` is set.
pub fn is_local_number(local_prefixes: &[&str], phone_number: &str, allow_foreign: bool) -> bool {
    if allow_foreign {
        return true;
    }
    let cleaned = clean_phone_number(phone_number);
    local_prefixes
        .iter()
        .any(|prefix| cleaned.starts_with(prefix))
}

/// Parse a date-time the way the gateways print them.
///
/// Accepts unix seconds, `yyyy-MM-dd HH:mm:ss`, `yyyyMMddHHmmss`,
/// `dd.MM.yyyy HH:mm:ss` and RFC 3339. Anything else yields `None`.
pub fn parse_vendor_datetime(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y%m%d%H%M%S",
        "%d.%m.%Y %H:%M:%S",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.len() < 14 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = raw.parse().ok()?;
        if secs <= 0 {
            return None;
        }
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Content attached to an SMSC send (e.g. MMS media).
///
/// Invariant: the file name is non-empty after trimming.
pub struct Attachment {
    file_name: String,
    content: Vec<u8>,
}

impl Attachment {
    /// Field name reported when the file name is empty.
    pub const FIELD: &'static str = "file_name";

    /// Create an attachment from its file name and raw bytes.
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Result<Self, ValidationError> {
        let file_name = file_name.into();
        let trimmed = file_name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self {
            file_name: trimmed.to_owned(),
            content,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Message status code reported by SMSC.
///
/// This value is preserved as-is even when the code is unknown to this crate.
pub struct SmscStatusCode(i32);

impl SmscStatusCode {
    pub fn new(code: i32) -> Self {
        Self(code)
    }

    /// Map this code to a known status, if one exists.
    pub fn known(self) -> Option<KnownSmscStatus> {
        KnownSmscStatus::from_code(self.0)
    }

    /// Human-readable description, falling back to the generic unknown-code text.
    pub fn description(self) -> String {
        match self.known() {
            Some(known) => known.description().to_owned(),
            None => unknown_code_message(&self.0.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
/// Known SMSC message statuses.
pub enum KnownSmscStatus {
    NotFound,
    Stopped,
    WaitingToBeSent,
    TransferredToOperator,
    Delivered,
    Read,
    Expired,
    LinkClicked,
    UnableToDeliver,
    InvalidNumber,
    Prohibited,
    InsufficientFunds,
    UnavailableNumber,
}

impl KnownSmscStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -3 => Self::NotFound,
            -2 => Self::Stopped,
            -1 => Self::WaitingToBeSent,
            0 => Self::TransferredToOperator,
            1 => Self::Delivered,
            2 => Self::Read,
            3 => Self::Expired,
            4 => Self::LinkClicked,
            20 => Self::UnableToDeliver,
            22 => Self::InvalidNumber,
            23 => Self::Prohibited,
            24 => Self::InsufficientFunds,
            25 => Self::UnavailableNumber,
            _ => return None,
        })
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NotFound => "Message not found.",
            Self::Stopped => "Message sending stopped.",
            Self::WaitingToBeSent => "Waiting to be sent.",
            Self::TransferredToOperator => "Transferred to the operator.",
            Self::Delivered => "Delivered.",
            Self::Read => "Read.",
            Self::Expired => "Expired.",
            Self::LinkClicked => "Link clicked.",
            Self::UnableToDeliver => "Unable to deliver.",
            Self::InvalidNumber => "Invalid number.",
            Self::Prohibited => "Prohibited.",
            Self::InsufficientFunds => "Insufficient funds.",
            Self::UnavailableNumber => "Unavailable number.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
/// Known SMSC request error codes (sent on the wire as negative numbers).
pub enum KnownSmscError {
    InvalidParameters,
    InvalidCredentials,
    InsufficientFunds,
    IpBlocked,
    InvalidDateFormat,
    MessageProhibited,
    InvalidPhoneFormat,
    CannotDeliver,
    DuplicateRequest,
}

impl KnownSmscError {
    /// Convert a wire code such as `"-7"` into a known variant.
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim() {
            "-1" => Self::InvalidParameters,
            "-2" => Self::InvalidCredentials,
            "-3" => Self::InsufficientFunds,
            "-4" => Self::IpBlocked,
            "-5" => Self::InvalidDateFormat,
            "-6" => Self::MessageProhibited,
            "-7" => Self::InvalidPhoneFormat,
            "-8" => Self::CannotDeliver,
            "-9" => Self::DuplicateRequest,
            _ => return None,
        })
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::InvalidParameters => "Error in parameters.",
            Self::InvalidCredentials => "Invalid login or password.",
            Self::InsufficientFunds => "Insufficient funds on the client account.",
            Self::IpBlocked => "IP address temporarily blocked due to frequent errors in requests.",
            Self::InvalidDateFormat => "Invalid date format.",
            Self::MessageProhibited => "Message is prohibited (by text or by sender name).",
            Self::InvalidPhoneFormat => "Invalid phone number format.",
            Self::CannotDeliver => "Message cannot be delivered to the specified number.",
            Self::DuplicateRequest => {
                "More than one identical send request, or more than five identical cost requests, within a minute."
            }
        }
    }}

/// Description for an SMSC error code, or the generic unknown-code text.
pub fn smsc_error_message(code: &str) -> String {
    match KnownSmscError::from_code(code) {
        Some(known) => known.description().to_owned(),
        None => unknown_code_message(code),
    }
}

/// Generic text for a vendor code missing from the lookup tables.
pub fn unknown_code_message(code: &str) -> String {
    format!("Unknown error. Contact support. Error code: {code}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_are_stable() {
        assert_eq!(ProviderName::GetSms.as_str(), "GetSMS");
        assert_eq!(ProviderName::SmsTraffic.to_string(), "SmsTraffic");
        assert_eq!(ProviderName::Smsc.as_str(), "SMSC");
    }

    #[test]
    fn clean_phone_number_strips_formatting() {
        assert_eq!(clean_phone_number("+7 (925) 123-45-67"), "79251234567");
        assert_eq!(clean_phone_number("998901234567"), "998901234567");
    }

    #[test]
    fn local_number_matches_prefixes_after_cleaning() {
        let prefixes = ["7", "8"];
        assert!(is_local_number(&prefixes, "+7 (925) 123-45-67", false));
        assert!(is_local_number(&prefixes, "89251234567", false));
        assert!(!is_local_number(&prefixes, "+998901234567", false));
        assert!(is_local_number(&prefixes, "+998901234567", true));
        assert!(is_local_number(&["998"], "+998 90 123-45-67", false));
    }

    #[test]
    fn vendor_datetime_formats() {
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 5)
            .unwrap();
        assert_eq!(parse_vendor_datetime("2024-03-01 10:30:05"), Some(expected));
        assert_eq!(parse_vendor_datetime("20240301103005"), Some(expected));
        assert_eq!(parse_vendor_datetime("01.03.2024 10:30:05"), Some(expected));
        assert_eq!(parse_vendor_datetime("1709289005"), Some(expected));
        assert_eq!(parse_vendor_datetime("0000-00-00 00:00:00"), None);
        assert_eq!(parse_vendor_datetime("0"), None);
        assert_eq!(parse_vendor_datetime("soon"), None);
    }

    #[test]
    fn attachment_requires_file_name() {
        let attachment = Attachment::new(" photo.jpg ", vec![1, 2, 3]).unwrap();
        assert_eq!(attachment.file_name(), "photo.jpg");
        assert_eq!(attachment.content(), &[1, 2, 3]);
        assert!(Attachment::new("  ", Vec::new()).is_err());
    }

    #[test]
    fn smsc_status_code_known_mapping() {
        let code = SmscStatusCode::new(1);
        assert_eq!(code.known(), Some(KnownSmscStatus::Delivered));
        assert_eq!(code.description(), "Delivered.");

        let unknown = SmscStatusCode::new(999);
        assert_eq!(unknown.known(), None);
        assert_eq!(
            unknown.description(),
            "Unknown error. Contact support. Error code: 999."
        );
    }

    #[test]
    fn smsc_error_messages_fall_back_to_generic_text() {
        assert_eq!(smsc_error_message("-2"), "Invalid login or password.");
        assert_eq!(
            smsc_error_message("-42"),
            "Unknown error. Contact support. Error code: -42."
        );
        assert_eq!(
            KnownSmscError::from_code(" -7 "),
            Some(KnownSmscError::InvalidPhoneFormat)
        );
    }
}
