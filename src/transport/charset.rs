//! Legacy code-page handling for request and response bodies.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};

pub(crate) const WINDOWS_1251_FORM_CONTENT_TYPE: &str =
    "application/x-www-form-urlencoded; charset=windows-1251";

/// Look up an encoding by its WHATWG label (`utf-8`, `windows-1251`, `koi8-r`, ...).
pub(crate) fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Form-encode `params` with every value transcoded to windows-1251 first.
///
/// Characters missing from the code page become HTML numeric references, as
/// browsers do for legacy forms.
pub(crate) fn encode_windows_1251_form(params: &[(String, String)]) -> Vec<u8> {
    encode_form_with(params, WINDOWS_1251)
}

pub(crate) fn encode_form_with(params: &[(String, String)], encoding: &'static Encoding) -> Vec<u8> {
    let mut body = String::new();
    for (key, value) in params {
        if !body.is_empty() {
            body.push('&');
        }
        body.extend(url::form_urlencoded::byte_serialize(key.as_bytes()));
        body.push('=');
        let (bytes, _, _) = encoding.encode(value);
        body.extend(url::form_urlencoded::byte_serialize(&bytes));
    }
    body.into_bytes()
}

/// Decode a response body using the charset from `Content-Type`, then the XML
/// declaration, then UTF-8.
pub(crate) fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_param)
        .and_then(encoding_for_label)
        .or_else(|| xml_declared_encoding(bytes))
        .unwrap_or(UTF_8);

    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    decoded.into_owned()
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

fn xml_declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = bytes.get(..bytes.len().min(128))?;
    let head = std::str::from_utf8(head).ok().or_else(|| {
        // Cut at the end of the declaration when the rest is not UTF-8.
        let end = head.iter().position(|b| *b == b'>')?;
        std::str::from_utf8(&head[..=end]).ok()
    })?;
    let declaration = head.strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];
    let (_, rest) = declaration.split_once("encoding=")?;
    let quote = rest.chars().next()?;
    let rest = &rest[quote.len_utf8()..];
    let label = &rest[..rest.find(quote)?];
    encoding_for_label(label)
}
