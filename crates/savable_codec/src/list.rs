//! Textual encoding of list values.
//!
//! Lists are rendered as `[a, b, c]`: bracketed, comma-space separated,
//! without escaping. Elements containing `", "` therefore do not survive a
//! round trip, and a list holding a single empty string reads back as the
//! empty list.

use crate::error::{CodecError, CodecResult};

const SEPARATOR: &str = ", ";

/// Renders a list as `[a, b, c]`.
pub fn encode_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(SEPARATOR);
        }
        out.push_str(item.as_ref());
    }
    out.push(']');
    out
}

/// Parses `[a, b, c]` back into its elements.
///
/// # Errors
///
/// Returns [`CodecError::MalformedList`] if the text is not bracketed.
pub fn decode_list(text: &str) -> CodecResult<Vec<String>> {
    let inner = text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| CodecError::malformed_list(text))?;

    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(SEPARATOR).map(str::to_string).collect())
}
