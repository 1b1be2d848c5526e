use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Result, SchemaError};

/// PostgreSQL truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Accepts lowercase unquoted SQL identifiers: `[a-z_][a-z0-9_]*`.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();

    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }

    value.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub fn validate_identifier(value: &str) -> Result<()> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(value.to_owned()))
    }
}

/// A relation may be schema-qualified (`public.name_strings`).
pub fn validate_relation(value: &str) -> Result<()> {
    match value.split_once('.') {
        Some((schema, table)) => {
            validate_identifier(schema)?;
            validate_identifier(table)
        }
        None => validate_identifier(value),
    }
}

/// Width of the hex hash suffix of a truncated name.
const SUFFIX_HEX_LEN: usize = 8;

/// Shortens `name` to fit [`MAX_IDENTIFIER_LEN`], replacing the tail with a hash of the full name.
pub fn fit_identifier(name: String) -> String {
    if name.len() <= MAX_IDENTIFIER_LEN {
        return name;
    }

    let hash = format!("{:016x}", xxh3_64(name.as_bytes()));
    let suffix = format!("_{}", &hash[..SUFFIX_HEX_LEN]);
    let mut head = name[..MAX_IDENTIFIER_LEN - suffix.len()].to_owned();
    head.push_str(&suffix);
    head
}
