//! URL encoding utilities for constructing OData paths.
//!
//! TM1 addresses entities by key, `/Cubes('Sales')`, so every object name
//! ends up inside a single-quoted key segment. Names are percent-encoded for
//! the characters that would otherwise break the path, and names containing a
//! single quote are rejected outright since the server does not accept them in
//! key segments.
//!
//! # Example
//!
//! ```
//! use tm1_client::endpoints::url_encoding::{encode_key, escape_spaces};
//!
//! assert_eq!(encode_key("Planning Sample").unwrap(), "Planning%20Sample");
//! assert!(encode_key("it's").is_err());
//! assert_eq!(escape_spaces("/Cubes('a b')"), "/Cubes('a%20b')");
//! ```

use percent_encoding::{AsciiSet, CONTROLS, percent_encode};

use crate::error::{ClientError, Result};

/// Characters that must be percent-encoded inside an OData key segment.
///
/// Curly braces stay encoded so control objects (`}Clients`) survive every
/// proxy in front of the server; square brackets and commas are left alone
/// because MDX-style member names use them and the server accepts them raw.
pub const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')      // Space
    .add(b'"')      // Double quote
    .add(b'<')      // Less than
    .add(b'>')      // Greater than
    .add(b'`')      // Backtick
    .add(b'{')      // Left curly brace
    .add(b'}')      // Right curly brace
    .add(b'|')      // Pipe
    .add(b'\\')     // Backslash
    .add(b'^')      // Caret
    .add(b'%')      // Percent (prevents double-encoding)
    .add(b'/')      // Forward slash (prevents path traversal)
    .add(b'?')      // Question mark
    .add(b'#')      // Hash
    .add(b'&')      // Ampersand
    .add(b'+'); // Plus

/// Percent-encode a string for use as a URL path segment.
///
/// ```
/// use tm1_client::endpoints::url_encoding::encode_path_segment;
///
/// assert_eq!(encode_path_segment("a/b"), "a%2Fb");
/// assert_eq!(encode_path_segment("}Clients"), "%7DClients");
/// ```
pub fn encode_path_segment(segment: &str) -> String {
    percent_encode(segment.as_bytes(), PATH_SEGMENT_ENCODE_SET).to_string()
}

/// Encode an entity name for a `('key')` segment.
///
/// Fails with [`ClientError::InvalidArgument`] when the name contains a single quote.
pub fn encode_key(name: &str) -> Result<String> {
    if name.contains('\'') {
        return Err(ClientError::InvalidArgument(format!(
            "object name must not contain a single quote: {name}"
        )));
    }
    Ok(encode_path_segment(name))
}

/// Build `{collection}('{key}')` with the key encoded.
pub fn keyed(collection: &str, name: &str) -> Result<String> {
    Ok(format!("{collection}('{}')", encode_key(name)?))
}

/// Replace every space with `%20`.
///
/// Applied to the fully composed URL right before dispatch, so literal spaces
/// in `$filter` expressions and database names never reach the wire.
pub fn escape_spaces(url: &str) -> String {
    url.replace(' ', "%20")
}

/// Quote a string literal for an OData `$filter` expression.
pub fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
