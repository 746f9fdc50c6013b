//! Values returned by the vendor-specific account and group operations.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// SmsTraffic distribution group.
pub struct SmsTrafficGroup {
    pub id: Option<String>,
    pub name: Option<String>,
    pub created: Option<String>,
    pub congratulate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Acknowledgement of an SmsTraffic group membership change.
pub struct GroupOperation {
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Price of a send as quoted by SMSC.
pub struct SmsCost {
    pub cost: String,
    /// Number of SMS parts the message is split into.
    pub parts: u32,
}
