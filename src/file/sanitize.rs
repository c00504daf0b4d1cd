//! Identifier and filename sanitizers.
//!
//! Identifiers are the only caller-supplied strings ever joined onto the
//! storage directory, so they are checked against an allowlist. Display
//! names are never used to build paths; they are only cleaned up for
//! presentation.

use crate::{FiledropError, Result};

/// Maximum accepted length of a file identifier.
///
/// Generated identifiers are nanosecond timestamps (at most 20 digits).
pub const MAX_IDENTIFIER_LENGTH: usize = 32;

/// Validate that a file identifier is safe to resolve to a storage path.
///
/// Rejects traversal sequences and path separators outright, then requires
/// the identifier to consist of ASCII digits only. Encoded separators and
/// other bypass variants therefore never reach the filesystem.
pub fn validate_identifier(id: &str) -> Result<()> {
    let traversal = id.contains("..") || id.contains('/') || id.contains('\\');
    let allowed = !id.is_empty()
        && id.len() <= MAX_IDENTIFIER_LENGTH
        && id.bytes().all(|b| b.is_ascii_digit());

    if traversal || !allowed {
        return Err(FiledropError::InvalidIdentifier(id.to_string()));
    }

    Ok(())
}

/// Sanitize a user-supplied filename for use as a display name.
///
/// Keeps only the final path segment (either separator style), then strips
/// every `..`. The result may be empty.
pub fn sanitize_filename(raw: &str) -> String {
    let trimmed = raw.trim_end_matches(|c| c == '/' || c == '\\');
    let base = trimmed
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(trimmed);

    base.replace("..", "")
}
