//! Typed vendor options and the `ProviderData` name → field projection.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::domain::message::ProviderData;
use crate::domain::validation::ValidationError;

/// Typed vendor data carried by a [`Message`](crate::domain::Message).
#[derive(Debug, Clone, PartialEq)]
pub enum MessageExtension {
    SmsTraffic(SmsTrafficData),
    Smsc(SmscData),
}

impl MessageExtension {
    /// Name of the provider the extension belongs to.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::SmsTraffic(_) => crate::domain::ProviderName::SmsTraffic.as_str(),
            Self::Smsc(_) => crate::domain::ProviderName::Smsc.as_str(),
        }
    }
}

impl From<SmsTrafficData> for MessageExtension {
    fn from(value: SmsTrafficData) -> Self {
        Self::SmsTraffic(value)
    }
}

impl From<SmscData> for MessageExtension {
    fn from(value: SmscData) -> Self {
        Self::Smsc(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// SmsTraffic send options.
pub struct SmsTrafficData {
    /// Message encoding code, `5` is UTF-8. Any other value switches to windows-1251.
    pub rus: i64,
    pub flash: Option<bool>,
    pub start_date: Option<NaiveDateTime>,
    pub max_parts: Option<i64>,
    /// Interval between messages, in seconds.
    pub gap: Option<f64>,
    /// Distribution group name.
    pub group: Option<String>,
    /// SMS lifetime, in seconds.
    pub timeout: Option<i64>,
    pub individual_messages: Option<bool>,
    pub delimiter: Option<String>,
    pub want_sms_ids: Option<bool>,
    pub with_push_id: Option<bool>,
    pub ignore_phone_format: Option<bool>,
    pub two_byte_concat: Option<bool>,
}

impl SmsTrafficData {
    pub const UTF8_CODE: i64 = 5;

    pub const RUS: &'static str = "Rus";
    pub const FLASH: &'static str = "Flash";
    pub const START_DATE: &'static str = "StartDate";
    pub const MAX_PARTS: &'static str = "MaxParts";
    pub const GAP: &'static str = "Gap";
    pub const GROUP: &'static str = "Group";
    pub const TIMEOUT: &'static str = "Timeout";
    pub const INDIVIDUAL_MESSAGES: &'static str = "IndividualMessages";
    pub const DELIMITER: &'static str = "Delimiter";
    pub const WANT_SMS_IDS: &'static str = "WantSmsIds";
    pub const WITH_PUSH_ID: &'static str = "WithPushId";
    pub const IGNORE_PHONE_FORMAT: &'static str = "IgnorePhoneFormat";
    pub const TWO_BYTE_CONCAT: &'static str = "TwoByteConcat";

    /// Build options from `ProviderData` entries; `None` when there are no entries.
    pub fn from_provider_data(entries: &[ProviderData]) -> Result<Option<Self>, ValidationError> {
        project(&SMSTRAFFIC_SETTERS, entries)
    }

    pub fn is_utf8(&self) -> bool {
        self.rus == Self::UTF8_CODE
    }
}

impl Default for SmsTrafficData {
    fn default() -> Self {
        Self {
            rus: Self::UTF8_CODE,
            flash: None,
            start_date: None,
            max_parts: None,
            gap: None,
            group: None,
            timeout: None,
            individual_messages: None,
            delimiter: None,
            want_sms_ids: None,
            with_push_id: None,
            ignore_phone_format: None,
            two_byte_concat: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// SMSC message format (`format` argument of the send command).
pub enum SmscFormat {
    Flash,
    Push,
    Hlr,
    Bin,
    BinHex,
    Ping,
    Mms,
    Mail,
    Call,
    Viber,
    Soc,
}

impl SmscFormat {
    /// Map the numeric format (`1..=11`) to a variant.
    pub fn from_index(index: i64) -> Option<Self> {
        Some(match index {
            1 => Self::Flash,
            2 => Self::Push,
            3 => Self::Hlr,
            4 => Self::Bin,
            5 => Self::BinHex,
            6 => Self::Ping,
            7 => Self::Mms,
            8 => Self::Mail,
            9 => Self::Call,
            10 => Self::Viber,
            11 => Self::Soc,
            _ => return None,
        })
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Flash => 1,
            Self::Push => 2,
            Self::Hlr => 3,
            Self::Bin => 4,
            Self::BinHex => 5,
            Self::Ping => 6,
            Self::Mms => 7,
            Self::Mail => 8,
            Self::Call => 9,
            Self::Viber => 10,
            Self::Soc => 11,
        }
    }

    /// Query parameter that selects this format.
    pub fn query_param(self) -> (&'static str, &'static str) {
        match self {
            Self::Flash => ("flash", "1"),
            Self::Push => ("push", "1"),
            Self::Hlr => ("hlr", "1"),
            Self::Bin => ("bin", "1"),
            Self::BinHex => ("bin", "2"),
            Self::Ping => ("ping", "1"),
            Self::Mms => ("mms", "1"),
            Self::Mail => ("mail", "1"),
            Self::Call => ("call", "1"),
            Self::Viber => ("viber", "1"),
            Self::Soc => ("soc", "1"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// SMSC send options.
pub struct SmscData {
    /// `0` keeps the text, `1` transliterates, `2` uses "mpaHc/nuT" style.
    pub translit: Option<u8>,
    /// Scheduled send time in any format SMSC accepts (`DDMMYYhhmm`, `+m`, unix time).
    pub time: Option<String>,
    /// Caller-assigned message id.
    pub id: Option<i64>,
    pub format: Option<SmscFormat>,
    /// Extra `key=value&...` parameters appended verbatim.
    pub query: Option<String>,
}

impl SmscData {
    pub const TRANSLIT: &'static str = "Translit";
    pub const TIME: &'static str = "Time";
    pub const ID: &'static str = "Id";
    pub const FORMAT: &'static str = "Format";
    pub const QUERY: &'static str = "Query";

    /// Build options from `ProviderData` entries; `None` when there are no entries.
    pub fn from_provider_data(entries: &[ProviderData]) -> Result<Option<Self>, ValidationError> {
        project(&SMSC_SETTERS, entries)
    }
}

type Setter<T> = fn(&mut T, &Value) -> Result<(), &'static str>;

static SMSTRAFFIC_SETTERS: LazyLock<HashMap<&'static str, Setter<SmsTrafficData>>> =
    LazyLock::new(|| {
        let entries: [(&'static str, Setter<SmsTrafficData>); 13] = [
            (SmsTrafficData::RUS, |data, value| {
                data.rus = as_i64(value)?;
                Ok(())
            }),
            (SmsTrafficData::FLASH, |data, value| {
                data.flash = Some(as_bool(value)?);
                Ok(())
            }),
            (SmsTrafficData::START_DATE, |data, value| {
                data.start_date = Some(as_datetime(value)?);
                Ok(())
            }),
            (SmsTrafficData::MAX_PARTS, |data, value| {
                data.max_parts = Some(as_i64(value)?);
                Ok(())
            }),
            (SmsTrafficData::GAP, |data, value| {
                data.gap = Some(as_f64(value)?);
                Ok(())
            }),
            (SmsTrafficData::GROUP, |data, value| {
                data.group = Some(as_string(value)?);
                Ok(())
            }),
            (SmsTrafficData::TIMEOUT, |data, value| {
                data.timeout = Some(as_i64(value)?);
                Ok(())
            }),
            (SmsTrafficData::INDIVIDUAL_MESSAGES, |data, value| {
                data.individual_messages = Some(as_bool(value)?);
                Ok(())
            }),
            (SmsTrafficData::DELIMITER, |data, value| {
                data.delimiter = Some(as_string(value)?);
                Ok(())
            }),
            (SmsTrafficData::WANT_SMS_IDS, |data, value| {
                data.want_sms_ids = Some(as_bool(value)?);
                Ok(())
            }),
            (SmsTrafficData::WITH_PUSH_ID, |data, value| {
                data.with_push_id = Some(as_bool(value)?);
                Ok(())
            }),
            (SmsTrafficData::IGNORE_PHONE_FORMAT, |data, value| {
                data.ignore_phone_format = Some(as_bool(value)?);
                Ok(())
            }),
            (SmsTrafficData::TWO_BYTE_CONCAT, |data, value| {
                data.two_byte_concat = Some(as_bool(value)?);
                Ok(())
            }),
        ];
        entries.into_iter().collect()
    });

static SMSC_SETTERS: LazyLock<HashMap<&'static str, Setter<SmscData>>> = LazyLock::new(|| {
    let entries: [(&'static str, Setter<SmscData>); 5] = [
        (SmscData::TRANSLIT, |data, value| {
            let translit = as_i64(value)?;
            data.translit = Some(u8::try_from(translit).map_err(|_| "an integer in 0..=2")?);
            Ok(())
        }),
        (SmscData::TIME, |data, value| {
            data.time = Some(as_string(value)?);
            Ok(())
        }),
        (SmscData::ID, |data, value| {
            data.id = Some(as_i64(value)?);
            Ok(())
        }),
        (SmscData::FORMAT, |data, value| {
            let index = as_i64(value)?;
            data.format = Some(SmscFormat::from_index(index).ok_or("an integer in 1..=11")?);
            Ok(())
        }),
        (SmscData::QUERY, |data, value| {
            data.query = Some(as_string(value)?);
            Ok(())
        }),
    ];
    entries.into_iter().collect()
});

fn project<T: Default>(
    setters: &HashMap<&'static str, Setter<T>>,
    entries: &[ProviderData],
) -> Result<Option<T>, ValidationError> {
    if entries.is_empty() {
        return Ok(None);
    }

    let mut data = T::default();
    for entry in entries {
        // Unknown names belong to other providers.
        let Some(setter) = setters.get(entry.name()) else {
            continue;
        };
        setter(&mut data, entry.value()).map_err(|expected| {
            ValidationError::InvalidProviderData {
                name: entry.name().to_owned(),
                expected,
            }
        })?;
    }
    Ok(Some(data))
}

fn as_bool(value: &Value) -> Result<bool, &'static str> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err("a boolean"),
        },
        _ => Err("a boolean"),
    }
}

fn as_i64(value: &Value) -> Result<i64, &'static str> {
    match value {
        Value::Number(number) => number.as_i64().ok_or("an integer"),
        Value::String(text) => text.trim().parse().map_err(|_| "an integer"),
        _ => Err("an integer"),
    }
}

fn as_f64(value: &Value) -> Result<f64, &'static str> {
    match value {
        Value::Number(number) => number.as_f64().ok_or("a number"),
        Value::String(text) => text.trim().parse().map_err(|_| "a number"),
        _ => Err("a number"),
    }
}

fn as_string(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(text) => Ok(text.clone()),
        _ => Err("a string"),
    }
}

fn as_datetime(value: &Value) -> Result<NaiveDateTime, &'static str> {
    const EXPECTED: &str = "a date-time (yyyy-MM-dd HH:mm:ss)";
    match value {
        Value::String(text) => {
            crate::domain::parse_vendor_datetime(text).ok_or(EXPECTED)
        }
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc())
            .ok_or(EXPECTED),
        _ => Err(EXPECTED),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn data(name: &str, value: Value) -> ProviderData {
        ProviderData::new(name, value).unwrap()
    }

    #[test]
    fn smstraffic_projection_maps_known_names() {
        let entries = vec![
            data(SmsTrafficData::RUS, json!(1)),
            data(SmsTrafficData::FLASH, json!(true)),
            data(SmsTrafficData::START_DATE, json!("2024-03-01 10:30:00")),
            data(SmsTrafficData::MAX_PARTS, json!(3)),
            data(SmsTrafficData::GAP, json!(0.5)),
            data(SmsTrafficData::GROUP, json!("clients")),
            data(SmsTrafficData::TIMEOUT, json!(600)),
            data(SmsTrafficData::WANT_SMS_IDS, json!(1)),
            data(SmsTrafficData::TWO_BYTE_CONCAT, json!(false)),
        ];

        let projected = SmsTrafficData::from_provider_data(&entries)
            .unwrap()
            .unwrap();
        assert_eq!(projected.rus, 1);
        assert!(!projected.is_utf8());
        assert_eq!(projected.flash, Some(true));
        assert_eq!(
            projected.start_date,
            Some(
                NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(10, 30, 0)
                    .unwrap()
            )
        );
        assert_eq!(projected.max_parts, Some(3));
        assert_eq!(projected.gap, Some(0.5));
        assert_eq!(projected.group.as_deref(), Some("clients"));
        assert_eq!(projected.timeout, Some(600));
        assert_eq!(projected.want_sms_ids, Some(true));
        assert_eq!(projected.two_byte_concat, Some(false));
        assert_eq!(projected.with_push_id, None);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let entries = vec![
            data("NoSuchOption", json!("x")),
            data(SmscData::TRANSLIT, json!(1)),
        ];
        let projected = SmsTrafficData::from_provider_data(&entries)
            .unwrap()
            .unwrap();
        assert_eq!(projected, SmsTrafficData::default());
    }

    #[test]
    fn no_entries_project_to_none() {
        assert_eq!(SmsTrafficData::from_provider_data(&[]).unwrap(), None);
        assert_eq!(SmscData::from_provider_data(&[]).unwrap(), None);
    }

    #[test]
    fn names_are_case_sensitive() {
        let entries = vec![data("flash", json!(true))];
        let projected = SmsTrafficData::from_provider_data(&entries)
            .unwrap()
            .unwrap();
        assert_eq!(projected.flash, None);
    }

    #[test]
    fn mismatched_value_type_is_rejected() {
        let entries = vec![data(SmsTrafficData::FLASH, json!("yes"))];
        let err = SmsTrafficData::from_provider_data(&entries).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidProviderData {
                name: "Flash".to_owned(),
                expected: "a boolean",
            }
        );
    }

    #[test]
    fn smsc_projection_maps_known_names() {
        let entries = vec![
            data(SmscData::TRANSLIT, json!(1)),
            data(SmscData::TIME, json!("0")),
            data(SmscData::ID, json!("42")),
            data(SmscData::FORMAT, json!(1)),
            data(SmscData::QUERY, json!("tinyurl=1")),
        ];
        let projected = SmscData::from_provider_data(&entries).unwrap().unwrap();
        assert_eq!(
            projected,
            SmscData {
                translit: Some(1),
                time: Some("0".to_owned()),
                id: Some(42),
                format: Some(SmscFormat::Flash),
                query: Some("tinyurl=1".to_owned()),
            }
        );

        let bad_format = vec![data(SmscData::FORMAT, json!(12))];
        assert!(SmscData::from_provider_data(&bad_format).is_err());
    }

    #[test]
    fn smsc_format_query_params() {
        assert_eq!(SmscFormat::BinHex.query_param(), ("bin", "2"));
        assert_eq!(SmscFormat::from_index(10), Some(SmscFormat::Viber));
        assert_eq!(SmscFormat::Viber.index(), 10);
    }
}
