use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::codepage::{self, Codepage};
use crate::error::{Error, Result};

/// Deserialize a whole XML feed, honouring a single-byte `encoding` declaration.
pub(crate) fn parse_document<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let text = codepage::xml_declared(bytes)
        .unwrap_or(Codepage::Utf8)
        .decode(bytes);
    quick_xml::de::from_str(&text).map_err(|e| Error::document(e.to_string()))
}

/// Canonical form of a published decimal: spaces dropped, comma separator turned into a dot.
pub(crate) fn normalize_decimal(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{A0}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    normalize_decimal(raw).parse().ok()
}

/// ISO 4217 numeric codes are published without leading zeros in some feeds (`36` for `036`).
pub(crate) fn pad_num_code(raw: &str) -> String {
    format!("{:0>3}", raw.trim())
}

/// Value of an optional element, with blank text treated as absent.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
