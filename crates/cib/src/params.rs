//! Tokenizer for `key=value` parameter strings.
//!
//! Handles the flat and multi-line forms users write for `params`, `meta`,
//! `clone`/`master` blocks and operation lines:
//! ```text
//! ip=192.168.0.100 cidr_netmask=24
//! options="-o ro,noatime" url=http://host/x?a=b
//! monitor interval=30s timeout=20s role=Master
//! ```

use crate::error::{Error, Result};

/// Split `input` on whitespace, keeping quoted runs together.
///
/// Single and double quotes may appear anywhere in a token and are
/// stripped. Newlines count as whitespace, so blank lines vanish.
pub fn tokenize(field: &str, input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(Error::validation(
            field,
            format!("unclosed {q} quote in '{}'", input.trim()),
        ));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Split a token on its first `=`.
pub fn split_pair(field: &str, token: &str) -> Result<(String, String)> {
    match token.split_once('=') {
        Some(("", _)) => Err(Error::validation(
            field,
            format!("missing name before '=' in '{token}'"),
        )),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(Error::validation(
            field,
            format!("expected name=value, got '{token}'"),
        )),
    }
}

/// Parse a flat or multi-line `key=value` block.
///
/// Later duplicates win but keep the position of the first occurrence.
pub fn parse_pairs(field: &str, input: &str) -> Result<Vec<(String, String)>> {
    pairs_from_tokens(field, tokenize(field, input)?)
}

fn pairs_from_tokens(
    field: &str,
    tokens: impl IntoIterator<Item = String>,
) -> Result<Vec<(String, String)>> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for token in tokens {
        let (key, value) = split_pair(field, &token)?;
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => pairs.push((key, value)),
        }
    }
    Ok(pairs)
}

/// Parse an operation line: an action name followed by `key=value` pairs.
///
/// Returns `None` for blank lines.
pub fn parse_operation_line(
    field: &str,
    line: &str,
) -> Result<Option<(String, Vec<(String, String)>)>> {
    let mut tokens = tokenize(field, line)?.into_iter();
    let Some(action) = tokens.next() else {
        return Ok(None);
    };
    if action.contains('=') {
        return Err(Error::validation(
            field,
            format!("operation must start with an action name, got '{action}'"),
        ));
    }
    Ok(Some((action, pairs_from_tokens(field, tokens)?)))
}

/// Check that `id` is usable as a CIB element id (an XML NCName).
pub fn validate_id(field: &str, id: &str) -> Result<()> {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return Err(Error::validation(field, "must not be empty"));
    };
    if !(first.is_alphabetic() || first == '_') {
        return Err(Error::validation(
            field,
            format!("'{id}' must start with a letter or underscore"),
        ));
    }
    if let Some(bad) = chars.find(|c| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        return Err(Error::validation(
            field,
            format!("'{id}' contains invalid character '{bad}'"),
        ));
    }
    Ok(())
}

/// Check that a node name is non-empty and carries no quoting or whitespace.
pub fn validate_node(field: &str, node: &str) -> Result<()> {
    if node.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    if node.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '&')) {
        return Err(Error::validation(
            field,
            format!("'{node}' is not a valid node name"),
        ));
    }
    Ok(())
}
