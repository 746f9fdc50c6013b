//! Transport layer: HTTP plumbing and per-vendor wire formats.

pub(crate) mod charset;
pub(crate) mod getsms;
pub(crate) mod http;
pub(crate) mod mail;
pub(crate) mod smsc;
pub(crate) mod smstraffic;
mod text;

use crate::domain::SendingError;

/// Decoded vendor reply: the payload or the errors the vendor reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply<T> {
    Success(T),
    Failure(Vec<SendingError>),
}
