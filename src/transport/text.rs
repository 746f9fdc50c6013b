use serde::Deserialize;
use serde::de::Error as DeError;

/// Scalar returned by a JSON API as either a string or a number.
///
/// For numbers, the raw JSON token is preserved (`998901234567` stays
/// `"998901234567"`, `10.00` stays `"10.00"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransportText(String);

impl TransportText {
    pub fn into_string(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_numeric(&self) -> bool {
        let digits = self.0.strip_prefix('-').unwrap_or(&self.0);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }
}

impl<'de> Deserialize<'de> for TransportText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw: Box<serde_json::value::RawValue> = Deserialize::deserialize(deserializer)?;
        let token = raw.get();

        match token.as_bytes().first().copied() {
            Some(b'"') => {
                let parsed = serde_json::from_str::<String>(token).map_err(D::Error::custom)?;
                Ok(Self(parsed))
            }
            Some(b'-' | b'0'..=b'9') => Ok(Self(token.to_owned())),
            Some(b't' | b'f') => Ok(Self(token.to_owned())),
            _ => Err(D::Error::custom(
                "expected JSON string, number or boolean",
            )),
        }
    }
}
