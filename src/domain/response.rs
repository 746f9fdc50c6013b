use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One error reported by a provider.
pub struct SendingError {
    /// Vendor code, when the vendor reported one.
    pub code: Option<String>,
    pub message: String,
}

impl SendingError {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Some(code.into()), message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Per-recipient outcome of a send.
pub struct DeliveryRecord {
    pub recipient: Option<String>,
    pub message_id: Option<String>,
    pub request_id: Option<String>,
    pub accepted_at: Option<NaiveDateTime>,
    /// Number of SMS parts billed.
    pub parts: Option<u32>,
    pub cost: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Delivery state of one message.
pub struct StatusRecord {
    /// Vendor status code or keyword.
    pub status: Option<String>,
    pub description: Option<String>,
    pub recipient: Option<String>,
    pub message_id: Option<String>,
    pub request_id: Option<String>,
    pub error_code: Option<String>,
    pub date_received: Option<NaiveDateTime>,
    pub date_sent: Option<NaiveDateTime>,
    pub date_delivered: Option<NaiveDateTime>,
    pub last_changed: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of a send, produced by the adapter that handled it.
pub struct SendingResult {
    success: bool,
    provider_name: String,
    errors: Vec<SendingError>,
    records: Vec<DeliveryRecord>,
}

impl SendingResult {
    pub(crate) fn succeeded(provider_name: &str, records: Vec<DeliveryRecord>) -> Self {
        Self {
            success: true,
            provider_name: provider_name.to_owned(),
            errors: Vec::new(),
            records,
        }
    }

    pub(crate) fn failed(provider_name: &str, errors: Vec<SendingError>) -> Self {
        Self {
            success: false,
            provider_name: provider_name.to_owned(),
            errors,
            records: Vec::new(),
        }
    }

    pub(crate) fn failed_with(
        provider_name: &str,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::failed(provider_name, vec![SendingError::new(code, message)])
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn errors(&self) -> &[SendingError] {
        &self.errors
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of a status query, produced by the adapter that handled it.
pub struct StatusResult {
    success: bool,
    provider_name: String,
    errors: Vec<SendingError>,
    records: Vec<StatusRecord>,
}

impl StatusResult {
    pub(crate) fn succeeded(provider_name: &str, records: Vec<StatusRecord>) -> Self {
        Self {
            success: true,
            provider_name: provider_name.to_owned(),
            errors: Vec::new(),
            records,
        }
    }

    pub(crate) fn failed(provider_name: &str, errors: Vec<SendingError>) -> Self {
        Self {
            success: false,
            provider_name: provider_name.to_owned(),
            errors,
            records: Vec::new(),
        }
    }

    pub(crate) fn failed_with(
        provider_name: &str,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::failed(provider_name, vec![SendingError::new(code, message)])
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn errors(&self) -> &[SendingError] {
        &self.errors
    }

    pub fn records(&self) -> &[StatusRecord] {
        &self.records
    }
}
