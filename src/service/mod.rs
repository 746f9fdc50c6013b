//! Routing layer: one entry point over every registered provider.

mod selection;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::domain::{Message, ProviderName, SendingResult, StatusResult};
use crate::error::{ConfigError, SmsError};
use crate::provider::{SmsProvider, block_on, require};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Service-wide defaults.
pub struct SmsServiceOptions {
    /// Name of the provider used when the caller does not pick one.
    #[serde(default)]
    pub default_provider: String,
    /// Sender applied to messages without one when the provider needs a sender.
    #[serde(default)]
    pub default_from: Option<String>,
}

impl SmsServiceOptions {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            default_provider: default_provider.into(),
            default_from: None,
        }
    }

    pub fn with_default_from(mut self, from: impl Into<String>) -> Self {
        self.default_from = Some(from.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require("default_provider", &self.default_provider)
    }

    fn default_from(&self) -> Option<&str> {
        self.default_from
            .as_deref()
            .filter(|it| !it.trim().is_empty())
    }
}

/// Which provider should handle a call.
#[derive(Clone)]
pub enum ProviderTarget<'a> {
    /// The configured default provider.
    Default,
    /// Exact, case-sensitive registration name.
    Name(&'a str),
    Known(ProviderName),
    /// A provider instance, used as given even when not registered.
    Instance(Arc<dyn SmsProvider>),
}

impl fmt::Debug for ProviderTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Known(name) => f.debug_tuple("Known").field(name).finish(),
            Self::Instance(provider) => f.debug_tuple("Instance").field(&provider.name()).finish(),
        }
    }
}

impl<'a> From<&'a str> for ProviderTarget<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<ProviderName> for ProviderTarget<'_> {
    fn from(name: ProviderName) -> Self {
        Self::Known(name)
    }
}

impl From<Arc<dyn SmsProvider>> for ProviderTarget<'_> {
    fn from(provider: Arc<dyn SmsProvider>) -> Self {
        Self::Instance(provider)
    }
}

/// Routes sends and status queries to registered providers.
///
/// Providers keep their registration order. Registering two providers with
/// the same name keeps the later one at the position of the first.
#[derive(Clone)]
pub struct SmsService {
    providers: IndexMap<String, Arc<dyn SmsProvider>>,
    default_provider: Arc<dyn SmsProvider>,
    options: SmsServiceOptions,
}

impl fmt::Debug for SmsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsService")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}

impl SmsService {
    pub fn new<I>(providers: I, options: SmsServiceOptions) -> Result<Self, SmsError>
    where
        I: IntoIterator<Item = Arc<dyn SmsProvider>>,
    {
        let mut registry = IndexMap::new();
        for provider in providers {
            registry.insert(provider.name().to_owned(), provider);
        }
        if registry.is_empty() {
            return Err(SmsError::NoProviders);
        }
        options.validate()?;

        let default_provider = registry
            .get(options.default_provider.as_str())
            .cloned()
            .ok_or_else(|| SmsError::ProviderNotFound {
                name: options.default_provider.clone(),
            })?;
        Ok(Self {
            providers: registry,
            default_provider,
            options,
        })
    }

    /// Registered providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn SmsProvider>> {
        self.providers.values()
    }

    pub fn default_provider(&self) -> &Arc<dyn SmsProvider> {
        &self.default_provider
    }

    pub fn options(&self) -> &SmsServiceOptions {
        &self.options
    }

    /// Registered provider by exact name.
    pub fn provider(&self, name: &str) -> Result<&Arc<dyn SmsProvider>, SmsError> {
        self.providers
            .get(name)
            .ok_or_else(|| SmsError::ProviderNotFound {
                name: name.to_owned(),
            })
    }

    fn resolve(&self, target: ProviderTarget<'_>) -> Result<Arc<dyn SmsProvider>, SmsError> {
        match target {
            ProviderTarget::Default => Ok(Arc::clone(&self.default_provider)),
            ProviderTarget::Name(name) => self.provider(name).cloned(),
            ProviderTarget::Known(name) => self.provider(name.as_str()).cloned(),
            ProviderTarget::Instance(provider) => Ok(provider),
        }
    }

    /// Send through the default provider.
    pub async fn send(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        self.send_with(ProviderTarget::Default, message, cancel)
            .await
    }

    /// Send through `target`.
    ///
    /// A message without a sender gets the configured `default_from` when the
    /// provider needs one; without that default the call fails with
    /// [`SmsError::MissingSender`].
    pub async fn send_with<'a>(
        &self,
        target: impl Into<ProviderTarget<'a>>,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        let provider = self.resolve(target.into())?;
        self.dispatch(provider.as_ref(), message, cancel).await
    }

    async fn dispatch(
        &self,
        provider: &dyn SmsProvider,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SendingResult, SmsError> {
        let has_sender = message.sender().is_some_and(|it| !it.trim().is_empty());
        let completed;
        let message = if has_sender || provider.allows_null_from() {
            message
        } else {
            let from = self.options.default_from().ok_or(SmsError::MissingSender)?;
            completed = message.with_sender(from);
            &completed
        };

        tracing::debug!(
            provider = provider.name(),
            to = message.to(),
            "dispatching message"
        );
        provider.send(message, cancel).await
    }

    /// Query the default provider.
    pub async fn get_status(
        &self,
        id: &str,
        phone_number: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StatusResult, SmsError> {
        self.get_status_with(ProviderTarget::Default, id, phone_number, cancel)
            .await
    }

    pub async fn get_status_with<'a>(
        &self,
        target: impl Into<ProviderTarget<'a>>,
        id: &str,
        phone_number: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StatusResult, SmsError> {
        let provider = self.resolve(target.into())?;
        tracing::debug!(provider = provider.name(), id, "querying status");
        provider.get_status(id, phone_number, cancel).await
    }

    /// Blocking [`SmsService::send`].
    ///
    /// Fails with [`SmsError::BlockingInRuntime`] when called from inside a Tokio runtime.
    pub fn send_blocking(&self, message: &Message) -> Result<SendingResult, SmsError> {
        block_on(self.send(message, &CancellationToken::new()))
    }

    pub fn send_with_blocking<'a>(
        &self,
        target: impl Into<ProviderTarget<'a>>,
        message: &Message,
    ) -> Result<SendingResult, SmsError> {
        block_on(self.send_with(target, message, &CancellationToken::new()))
    }

    pub fn get_status_blocking(
        &self,
        id: &str,
        phone_number: Option<&str>,
    ) -> Result<StatusResult, SmsError> {
        block_on(self.get_status(id, phone_number, &CancellationToken::new()))
    }

    pub fn get_status_with_blocking<'a>(
        &self,
        target: impl Into<ProviderTarget<'a>>,
        id: &str,
        phone_number: Option<&str>,
    ) -> Result<StatusResult, SmsError> {
        block_on(self.get_status_with(target, id, phone_number, &CancellationToken::new()))
    }
}
