//! Rules every Realtime Database location must satisfy.

use crate::core::InvalidArgument;

pub const MAX_DEPTH: usize = 32;
pub const MAX_KEY_SIZE: usize = 768;
pub const INVALID_KEY_CHARS: &str = ".$#[]";

/// The rules location is addressed with a reserved key and skips every check.
const RULES_PATH: &str = ".settings/rules";

/// Checks a reference path for depth, key size and forbidden characters.
///
/// Leading and trailing slashes are ignored. An empty path counts as one
/// (empty) key and passes.
pub fn validate_path(path: &str) -> Result<(), InvalidArgument> {
    let path = path.trim_matches('/');

    if path == RULES_PATH {
        return Ok(());
    }

    validate_depth(path)?;

    for key in path.split('/') {
        validate_key_size(key)?;
        validate_chars(key)?;
    }

    Ok(())
}

fn validate_depth(path: &str) -> Result<(), InvalidArgument> {
    let depth = path.matches('/').count() + 1;

    if depth > MAX_DEPTH {
        return Err(InvalidArgument::new(format!(
            "A reference location must not more than {} levels deep, \"{}\" has {}.",
            MAX_DEPTH, path, depth
        )));
    }

    Ok(())
}

// Measured on the raw segment, before percent-decoding.
fn validate_key_size(key: &str) -> Result<(), InvalidArgument> {
    let length = key.len();

    if length > MAX_KEY_SIZE {
        return Err(InvalidArgument::new(format!(
            "A reference's child key must not be larger than {} bytes, \"{}\" has a size of {} bytes.",
            MAX_KEY_SIZE, key, length
        )));
    }

    Ok(())
}

fn validate_chars(key: &str) -> Result<(), InvalidArgument> {
    let decoded = urlencoding::decode_binary(key.as_bytes());

    if decoded.iter().any(|byte| INVALID_KEY_CHARS.as_bytes().contains(byte)) {
        return Err(InvalidArgument::new(format!(
            "The child key \"{}\" contains one of the following invalid characters: \"{}\"",
            String::from_utf8_lossy(&decoded),
            INVALID_KEY_CHARS
        )));
    }

    Ok(())
}
