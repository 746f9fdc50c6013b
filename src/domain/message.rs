use serde_json::Value;

use crate::domain::extension::MessageExtension;
use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq)]
/// Named vendor-specific option attached to a [`Message`].
///
/// Adapters look entries up by name and ignore names they do not know.
pub struct ProviderData {
    name: String,
    value: Value,
}

impl ProviderData {
    pub const FIELD: &'static str = "name";

    /// Create an entry. The name must be non-empty after trimming.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self {
            name,
            value: value.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Provider-agnostic SMS message.
///
/// Recipients are stored as one string joined by the message separator
/// ([`Message::DEFAULT_SEPARATOR`] unless overridden). The value is immutable;
/// [`Message::with_sender`] returns a copy with the sender set.
pub struct Message {
    body: String,
    from: Option<String>,
    to: String,
    separator: char,
    allow_foreign: bool,
    provider_data: Vec<ProviderData>,
    extension: Option<MessageExtension>,
}

impl Message {
    pub const DEFAULT_SEPARATOR: char = ';';
    pub const TO_FIELD: &'static str = "to";

    /// Create a message for one recipient or an already joined recipient list.
    ///
    /// `to` must be non-empty after trimming; the body is checked by adapters.
    pub fn new(
        body: impl Into<String>,
        from: Option<String>,
        to: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let to = to.into();
        if to.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: Self::TO_FIELD,
            });
        }
        Ok(Self {
            body: body.into(),
            from,
            to,
            separator: Self::DEFAULT_SEPARATOR,
            allow_foreign: false,
            provider_data: Vec::new(),
            extension: None,
        })
    }

    /// Create a message for several recipients joined with the default separator.
    pub fn to_many<I, S>(
        body: impl Into<String>,
        from: Option<String>,
        recipients: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::to_many_with_separator(body, from, recipients, Self::DEFAULT_SEPARATOR)
    }

    /// Create a message for several recipients joined with `separator`.
    pub fn to_many_with_separator<I, S>(
        body: impl Into<String>,
        from: Option<String>,
        recipients: I,
        separator: char,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let to = join_recipients(recipients, separator);
        let mut message = Self::new(body, from, to)?;
        message.separator = separator;
        Ok(message)
    }

    /// Allow (or forbid) delivery to numbers outside the provider's local prefixes.
    pub fn allow_foreign(mut self, allow: bool) -> Self {
        self.allow_foreign = allow;
        self
    }

    /// Append a vendor-specific option. Existing entries are kept.
    pub fn with_provider_data(mut self, data: ProviderData) -> Self {
        self.provider_data.push(data);
        self
    }

    /// Attach typed vendor data. Only the matching adapter accepts the message.
    pub fn with_extension(mut self, extension: impl Into<MessageExtension>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Copy of this message with `from` set as sender.
    pub fn with_sender(&self, from: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            ..self.clone()
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Sender id or number (`From`).
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Recipients as the joined string.
    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn allows_foreign(&self) -> bool {
        self.allow_foreign
    }

    pub fn provider_data(&self) -> &[ProviderData] {
        &self.provider_data
    }

    pub fn extension(&self) -> Option<&MessageExtension> {
        self.extension.as_ref()
    }

    /// Trimmed, non-empty recipients split on the message separator.
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .split(self.separator)
            .map(str::trim)
            .filter(|it| !it.is_empty())
            .collect()
    }

    /// Recipients re-joined with another separator.
    pub fn recipients_joined(&self, separator: char) -> String {
        join_recipients(self.recipients(), separator)
    }
}

fn join_recipients<I, S>(recipients: I, separator: char) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for (idx, recipient) in recipients.into_iter().enumerate() {
        if idx > 0 {
            joined.push(separator);
        }
        joined.push_str(recipient.as_ref());
    }
    joined
}
