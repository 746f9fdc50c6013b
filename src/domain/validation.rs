use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    NotLocalNumber { number: String },
    EmptyBody,
    InvalidPhoneNumber { input: String },
    TooManyMembers { max: usize, actual: usize },
    InvalidProviderData { name: String, expected: &'static str },
    IndividualMessagesWithBody,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::NotLocalNumber { number } => {
                write!(f, "{number} is not a local phone number")
            }
            Self::EmptyBody => f.write_str("message body must not be empty"),
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
            Self::TooManyMembers { max, actual } => {
                write!(f, "too many group members: {actual} (max {max})")
            }
            Self::InvalidProviderData { name, expected } => {
                write!(f, "provider data {name} must be {expected}")
            }
            Self::IndividualMessagesWithBody => f.write_str(
                "message body must be empty when individual messages are enabled",
            ),
        }
    }
}

impl std::error::Error for ValidationError {}
