use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::{Message, SendingResult};
use crate::error::SmsError;
use crate::provider::SmsProvider;
use crate::service::{ProviderTarget, SmsService};

impl SmsService {
    /// First registered provider that can deliver to `phone_number`.
    ///
    /// Falls back to the default provider when `return_default` is set;
    /// otherwise `Ok(None)` means no provider matched.
    pub fn provider_for_phone_number(
        &self,
        phone_number: &str,
        return_default: bool,
        allow_foreign: bool,
    ) -> Result<Option<Arc<dyn SmsProvider>>, SmsError> {
        if phone_number.trim().is_empty() {
            return Err(SmsError::MissingArgument {
                name: "phone_number",
            });
        }

        let found = self
            .providers()
            .find(|provider| provider.can_send(phone_number, allow_foreign))
            .cloned();
        let selected = match found {
            Some(provider) => Some(provider),
            None if return_default => Some(Arc::clone(self.default_provider())),
            None => None,
        };
        tracing::debug!(
            phone_number,
            provider = selected.as_ref().map(|it| it.name()),
            "provider selected"
        );
        Ok(selected)
    }

    /// Send through the provider selected for the message's first recipient.
    pub async fn send_using_suitable_provider(
        &self,
        message: &Message,
        use_default: bool,
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        let recipients = message.recipients();
        let first = recipients.first().copied().unwrap_or_default();
        let provider = self
            .provider_for_phone_number(first, use_default, message.allows_foreign())?
            .ok_or_else(|| SmsError::NoSuitableProvider {
                phone_number: first.to_owned(),
            })?;
        self.send_with(ProviderTarget::Instance(provider), message, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{GetSmsOptions, GetSmsProvider, SmscOptions, SmscProvider};
    use crate::service::SmsServiceOptions;
    use crate::service::testing::RecordingProvider;

    fn service() -> (SmsService, Arc<RecordingProvider>, Arc<RecordingProvider>) {
        let getsms = RecordingProvider::new("GetSMS", &["998"], true);
        let smsc = RecordingProvider::new("SMSC", &["7", "8"], false);
        let providers: [Arc<dyn SmsProvider>; 2] = [getsms.clone(), smsc.clone()];
        let service = SmsService::new(
            providers,
            SmsServiceOptions::new("SMSC").with_default_from("Sender"),
        )
        .unwrap();
        (service, getsms, smsc)
    }

    #[test]
    fn numbers_pick_the_provider_by_prefix() {
        let (service, _, _) = service();

        let uzbek = service
            .provider_for_phone_number("+998 90 123 45 67", false, false)
            .unwrap()
            .unwrap();
        assert_eq!(uzbek.name(), "GetSMS");

        let russian = service
            .provider_for_phone_number("+7 (925) 123-45-67", false, false)
            .unwrap()
            .unwrap();
        assert_eq!(russian.name(), "SMSC");
    }

    #[test]
    fn unmatched_numbers_fall_back_only_when_asked() {
        let (service, _, _) = service();

        let none = service
            .provider_for_phone_number("+1 415 555 0100", false, false)
            .unwrap();
        assert!(none.is_none());

        let fallback = service
            .provider_for_phone_number("+1 415 555 0100", true, false)
            .unwrap()
            .unwrap();
        assert_eq!(fallback.name(), "SMSC");

        // Foreign numbers are accepted by the first registered provider.
        let foreign = service
            .provider_for_phone_number("+1 415 555 0100", false, true)
            .unwrap()
            .unwrap();
        assert_eq!(foreign.name(), "GetSMS");

        assert!(matches!(
            service.provider_for_phone_number(" ", true, false),
            Err(SmsError::MissingArgument { .. })
        ));
    }

    #[test]
    fn real_adapters_are_selected_by_prefix() {
        let getsms = GetSmsProvider::new(GetSmsOptions {
            login: "user".to_owned(),
            password: "secret".to_owned(),
            service_url: "https://api.getsms.uz/".to_owned(),
        })
        .unwrap();
        let smsc = SmscProvider::new(SmscOptions {
            login: "user".to_owned(),
            password: "secret".to_owned(),
            ..SmscOptions::default()
        })
        .unwrap();
        let providers: [Arc<dyn SmsProvider>; 2] = [Arc::new(getsms), Arc::new(smsc)];
        let service = SmsService::new(providers, SmsServiceOptions::new("GetSMS")).unwrap();

        let selected = service
            .provider_for_phone_number("998901234567", false, false)
            .unwrap()
            .unwrap();
        assert_eq!(selected.name(), "GetSMS");
        let selected = service
            .provider_for_phone_number("89251234567", false, false)
            .unwrap()
            .unwrap();
        assert_eq!(selected.name(), "SMSC");
    }

    #[tokio::test]
    async fn suitable_provider_send_applies_the_default_sender() {
        let (service, getsms, smsc) = service();
        let message = Message::to_many("hi", None, ["79251234567", "998901234567"]).unwrap();

        let result = service
            .send_using_suitable_provider(&message, false, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.provider_name(), "SMSC");
        assert_eq!(smsc.sent()[0].sender(), Some("Sender"));
        assert!(getsms.sent().is_empty());
    }

    #[tokio::test]
    async fn no_suitable_provider_is_an_error() {
        let (service, getsms, smsc) = service();
        let message = Message::new("hi", None, "14155550100").unwrap();
        let cancel = CancellationToken::new();

        let err = service
            .send_using_suitable_provider(&message, false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SmsError::NoSuitableProvider { ref phone_number } if phone_number == "14155550100"
        ));

        service
            .send_using_suitable_provider(&message, true, &cancel)
            .await
            .unwrap();
        assert_eq!(smsc.sent().len(), 1);
        assert!(getsms.sent().is_empty());
    }
}
