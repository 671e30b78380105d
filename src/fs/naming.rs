//! Filename validation and sanitising.

use crate::error::{Error, Result};

/// Validate and sanitize a filename by removing or replacing invalid characters.
///
/// Returns an error if the filename contains path traversal patterns.
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized = replace_reserved(name);

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Sanitize a path component such as a collection key.
///
/// Unlike [`sanitize_filename`] nothing is replaced: separators and reserved
/// characters are refused, so two distinct keys never share a directory.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in path component: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed: '{}'",
            name
        )));
    }

    if replace_reserved(name) != name {
        return Err(Error::InvalidFilename(format!(
            "Reserved characters not allowed in path component: '{}'",
            name
        )));
    }

    if name.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Path component cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(name.to_string())
}

fn replace_reserved(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_valid() {
        assert_eq!(sanitize_filename("123_0.jpg").unwrap(), "123_0.jpg");
        assert_eq!(sanitize_filename("id:1_0.jpg").unwrap(), "id_1_0.jpg");
    }

    #[test]
    fn test_sanitize_filename_rejects_traversal_and_separators() {
        assert!(sanitize_filename("../etc/passwd").is_err());
        assert!(sanitize_filename("a/b.jpg").is_err());
        assert!(sanitize_filename("a\\b.jpg").is_err());
        assert!(sanitize_filename("file\0name").is_err());
        assert!(sanitize_filename("   ").is_err());
    }

    #[test]
    fn test_sanitize_path_component() {
        assert_eq!(sanitize_path_component("jack").unwrap(), "jack");
        assert_eq!(sanitize_path_component("a_b").unwrap(), "a_b");
        assert!(sanitize_path_component("a/b").is_err());
        assert!(sanitize_path_component("a\\b").is_err());
        assert!(sanitize_path_component("a:b").is_err());
        assert!(sanitize_path_component("../evil").is_err());
        assert!(sanitize_path_component("").is_err());
    }
}
