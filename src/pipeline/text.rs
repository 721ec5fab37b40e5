//! Plain-text decoding.

/// Decode bytes as UTF-8 the way a browser text reader does: a leading BOM
/// is dropped and invalid sequences become U+FFFD. Content is otherwise
/// returned verbatim.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
