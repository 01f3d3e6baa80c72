//! MIME type handling

use std::path::Path;

/// Get MIME type for a file path
pub fn guess_mime_type(path: impl AsRef<Path>) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}
