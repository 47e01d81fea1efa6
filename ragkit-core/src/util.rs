//! Naming and URL helpers

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Error, Result};

/// Everything except unreserved URL characters gets percent-encoded
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Sanitize a display name into a canonical document name.
///
/// Lower-cases, trims, strips URL scheme prefixes, and replaces whitespace
/// and path separators with `_`. Rejects names that end up empty.
pub fn sanitize_name(name: &str) -> Result<String> {
    let mut name = name.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = name.strip_prefix(scheme) {
            name = rest.to_string();
            break;
        }
    }
    let name: String = name
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();

    if name.is_empty() {
        return Err(Error::validation("document name is empty after sanitizing"));
    }
    Ok(name)
}

/// Canonical source identifier: `<source_type>:<sanitized name>`
pub fn source_name(source_type: &str, name: &str) -> Result<String> {
    if source_type.trim().is_empty() {
        return Err(Error::validation("source type must not be empty"));
    }
    Ok(format!("{}:{}", source_type, sanitize_name(name)?))
}

/// URL under which the admin service serves the original document bytes
pub fn document_reference_url(base_url: &str, file_name: &str) -> String {
    format!(
        "{}/document_reference/{}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(file_name, PATH_SEGMENT)
    )
}
