//! Domain layer: provider-agnostic messages and results (no I/O).

mod account;
mod extension;
mod message;
mod response;
mod validation;
mod value;

pub use account::{GroupOperation, SmsCost, SmsTrafficGroup};
pub use extension::{MessageExtension, SmsTrafficData, SmscData, SmscFormat};
pub use message::{Message, ProviderData};
pub use response::{DeliveryRecord, SendingError, SendingResult, StatusRecord, StatusResult};
pub use validation::ValidationError;
pub use value::{
    Attachment, KnownSmscError, KnownSmscStatus, ProviderName, SmscStatusCode,
    clean_phone_number, is_local_number, parse_vendor_datetime, smsc_error_message,
    unknown_code_message,
};

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extension_reports_owning_provider() {
        let extension: MessageExtension = SmscData::default().into();
        assert_eq!(extension.provider_name(), ProviderName::Smsc.as_str());

        let extension: MessageExtension = SmsTrafficData::default().into();
        assert_eq!(extension.provider_name(), "SmsTraffic");
    }

    #[test]
    fn message_keeps_provider_data_for_projection() {
        let message = Message::new("hi", None, "79251234567")
            .unwrap()
            .with_provider_data(ProviderData::new(SmsTrafficData::FLASH, true).unwrap())
            .with_provider_data(ProviderData::new(SmscData::TRANSLIT, 2).unwrap());

        let traffic = SmsTrafficData::from_provider_data(message.provider_data())
            .unwrap()
            .unwrap();
        assert_eq!(traffic.flash, Some(true));

        let smsc = SmscData::from_provider_data(message.provider_data())
            .unwrap()
            .unwrap();
        assert_eq!(smsc.translit, Some(2));
    }

    #[test]
    fn failed_result_carries_provider_and_errors() {
        let result = SendingResult::failed_with("SMSC", Some("-2".to_owned()), "denied");
        assert!(!result.is_success());
        assert_eq!(result.provider_name(), "SMSC");
        assert_eq!(
            result.errors(),
            &[SendingError::with_code("-2", "denied")]
        );
        assert!(result.records().is_empty());

        let status = StatusResult::succeeded(
            "GetSMS",
            vec![StatusRecord {
                status: Some(json!(2).to_string()),
                ..StatusRecord::default()
            }],
        );
        assert!(status.is_success());
        assert_eq!(status.records()[0].status.as_deref(), Some("2"));
    }
}
