//! Provider-agnostic SMS sending over the GetSMS, SmsTraffic and SMSC gateways.
//!
//! The crate is layered: a domain layer of plain message and result types, a
//! private transport layer for each vendor's wire format, one adapter per
//! gateway behind the [`SmsProvider`] trait, and an [`SmsService`] routing
//! calls between the registered adapters.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use smsgate::{
//!     Message, SmsProvider, SmsService, SmsServiceOptions, SmscOptions, SmscProvider,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), smsgate::SmsError> {
//!     let smsc = SmscProvider::new(SmscOptions {
//!         login: "login".to_owned(),
//!         password: "password".to_owned(),
//!         ..SmscOptions::default()
//!     })?;
//!     let providers: [Arc<dyn SmsProvider>; 1] = [Arc::new(smsc)];
//!     let service = SmsService::new(
//!         providers,
//!         SmsServiceOptions::new("SMSC").with_default_from("Shop"),
//!     )?;
//!
//!     let message = Message::new("hello", None, "+79251234567")?;
//!     let result = service.send(&message, &CancellationToken::new()).await?;
//!     println!("sent: {}", result.is_success());
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod provider;
pub mod service;
mod transport;

pub use domain::{
    Attachment, DeliveryRecord, Message, MessageExtension, ProviderData, ProviderName,
    SendingError, SendingResult, SmsCost, SmsTrafficData, SmsTrafficGroup, SmscData, SmscFormat,
    StatusRecord, StatusResult, ValidationError,
};
pub use error::{ConfigError, SmsError};
pub use provider::{
    GetSmsOptions, GetSmsProvider, SmsProvider, SmsTrafficOptions, SmsTrafficProvider,
    SmscOptions, SmscProvider,
};
pub use service::{ProviderTarget, SmsService, SmsServiceOptions};
