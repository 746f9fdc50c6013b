use std::io;
use std::sync::Arc;

use smsgate::{
    GetSmsOptions, GetSmsProvider, Message, SmsProvider, SmsService, SmsServiceOptions,
    SmsTrafficOptions, SmsTrafficProvider, SmscOptions, SmscProvider,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn required(name: &str) -> Result<String, io::Error> {
    std::env::var(name).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{name} environment variable is required"),
        )
    })
}

/// Register every gateway whose login is present in the environment.
fn providers() -> Result<Vec<Arc<dyn SmsProvider>>, Box<dyn std::error::Error>> {
    let mut providers: Vec<Arc<dyn SmsProvider>> = Vec::new();
    if let Ok(login) = std::env::var("GETSMS_LOGIN") {
        providers.push(Arc::new(GetSmsProvider::new(GetSmsOptions {
            login,
            password: required("GETSMS_PASSWORD")?,
            service_url: std::env::var("GETSMS_URL")
                .unwrap_or_else(|_| "https://api.getsms.uz/".to_owned()),
        })?));
    }
    if let Ok(login) = std::env::var("SMSTRAFFIC_LOGIN") {
        providers.push(Arc::new(SmsTrafficProvider::new(SmsTrafficOptions {
            login,
            password: required("SMSTRAFFIC_PASSWORD")?,
            ..SmsTrafficOptions::default()
        })?));
    }
    if let Ok(login) = std::env::var("SMSC_LOGIN") {
        providers.push(Arc::new(SmscProvider::new(SmscOptions {
            login,
            password: required("SMSC_PASSWORD")?,
            ..SmscOptions::default()
        })?));
    }
    Ok(providers)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smsgate=debug")),
        )
        .init();

    let phone = required("SMS_PHONE")?;
    let text = std::env::var("SMS_MESSAGE").unwrap_or_else(|_| "Hello from smsgate.".to_owned());

    let providers = providers()?;
    let default_provider = providers
        .first()
        .map(|it| it.name())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "set GETSMS_LOGIN, SMSTRAFFIC_LOGIN or SMSC_LOGIN",
            )
        })?;
    let mut options = SmsServiceOptions::new(default_provider);
    options.default_from = std::env::var("SMS_FROM").ok();
    let service = SmsService::new(providers, options)?;

    let message = Message::new(text, None, phone)?;
    let result = service
        .send_using_suitable_provider(&message, true, &CancellationToken::new())
        .await?;
    println!(
        "provider: {}, success: {}, records: {:?}, errors: {:?}",
        result.provider_name(),
        result.is_success(),
        result.records(),
        result.errors()
    );

    Ok(())
}
