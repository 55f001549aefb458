//! Requirement strings (`Requires-Dist` values)
//!
//! Format: `name[extra,...] <specifier> ; <marker>` or `name[extra] @ url ; <marker>`

use super::marker::{MarkerError, MarkerTree, parse_marker};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    #[error("Empty requirement")]
    Empty,

    #[error("Invalid package name at position {position} in '{input}'")]
    InvalidName { input: String, position: usize },

    #[error("Unterminated extras in '{0}'")]
    UnterminatedExtras(String),

    #[error("Invalid extra '{extra}' in '{input}'")]
    InvalidExtra { input: String, extra: String },

    #[error("Invalid version specifier '{specifier}' in '{input}'")]
    InvalidSpecifier { input: String, specifier: String },

    #[error("Missing URL after '@' in '{0}'")]
    MissingUrl(String),

    #[error("Invalid marker in '{input}': {source}")]
    Marker { input: String, source: MarkerError },

    #[error("Unexpected trailing text '{trailing}' in '{input}'")]
    Trailing { input: String, trailing: String },
}

/// A parsed requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Name as written (not normalized)
    pub name: String,
    pub extras: Vec<String>,
    /// Comma-joined version clauses, e.g. `>=2.0,<3`
    pub specifier: Option<String>,
    pub url: Option<String>,
    pub marker: Option<MarkerTree>,
}

const SPECIFIER_OPS: [&str; 8] = ["===", "~=", "==", "!=", "<=", ">=", "<", ">"];

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Requirement::parse(input)
    }
}

impl Requirement {
    pub fn parse(input: &str) -> Result<Self, RequirementError> {
        let body = input.trim();
        if body.is_empty() {
            return Err(RequirementError::Empty);
        }

        let name_len = name_length(body);
        if name_len == 0 {
            return Err(RequirementError::InvalidName {
                input: input.to_string(),
                position: 0,
            });
        }
        let name = &body[..name_len];
        if !name.ends_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(RequirementError::InvalidName {
                input: input.to_string(),
                position: name_len - 1,
            });
        }

        let mut rest = body[name_len..].trim_start();

        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let (inside, remaining) = after
                .split_once(']')
                .ok_or_else(|| RequirementError::UnterminatedExtras(input.to_string()))?;
            for extra in inside.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                if name_length(extra) != extra.len()
                    || !extra.ends_with(|c: char| c.is_ascii_alphanumeric())
                {
                    return Err(RequirementError::InvalidExtra {
                        input: input.to_string(),
                        extra: extra.to_string(),
                    });
                }
                extras.push(extra.to_string());
            }
            rest = remaining.trim_start();
        }

        let mut url = None;
        let mut specifier = None;

        if let Some(after) = rest.strip_prefix('@') {
            let after = after.trim_start();
            let end = after.find(char::is_whitespace).unwrap_or(after.len());
            if end == 0 {
                return Err(RequirementError::MissingUrl(input.to_string()));
            }
            url = Some(after[..end].to_string());
            rest = after[end..].trim_start();
        } else if !rest.is_empty() {
            let (clauses, remaining) = parse_specifier(rest, input)?;
            if !clauses.is_empty() {
                specifier = Some(clauses.join(","));
            }
            rest = remaining;
        }

        // A URL runs to whitespace, so a ';' inside it never starts the marker
        let mut marker = None;
        if let Some(text) = rest.strip_prefix(';') {
            let parsed = parse_marker(text).map_err(|source| RequirementError::Marker {
                input: input.to_string(),
                source,
            })?;
            marker = Some(parsed);
            rest = "";
        }

        if !rest.trim().is_empty() {
            return Err(RequirementError::Trailing {
                input: input.to_string(),
                trailing: rest.trim().to_string(),
            });
        }

        Ok(Requirement {
            name: name.to_string(),
            extras,
            specifier,
            url,
            marker,
        })
    }
}

/// Length of the leading `[A-Za-z0-9._-]` run, which must start with an alphanumeric
fn name_length(s: &str) -> usize {
    if !s.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return 0;
    }
    s.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(s.len())
}

/// Parse a (possibly parenthesized) comma-separated specifier list.
///
/// Returns the normalized clauses and whatever text follows them.
fn parse_specifier<'a>(
    s: &'a str,
    input: &str,
) -> Result<(Vec<String>, &'a str), RequirementError> {
    let invalid = |spec: &str| RequirementError::InvalidSpecifier {
        input: input.to_string(),
        specifier: spec.to_string(),
    };

    let (mut body, parenthesized) = match s.strip_prefix('(') {
        Some(inner) => (inner, true),
        None => (s, false),
    };

    let mut clauses = Vec::new();
    loop {
        body = body.trim_start();
        let Some(op) = SPECIFIER_OPS.iter().find(|op| body.starts_with(**op)) else {
            break;
        };
        let after_op = body[op.len()..].trim_start();
        let end = after_op
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_')))
            .unwrap_or(after_op.len());
        if end == 0 {
            return Err(invalid(body));
        }
        clauses.push(format!("{}{}", op, &after_op[..end]));
        body = after_op[end..].trim_start();

        match body.strip_prefix(',') {
            Some(next) => body = next,
            None => break,
        }
    }

    if parenthesized {
        body = body
            .trim_start()
            .strip_prefix(')')
            .ok_or_else(|| invalid(s))?;
    }

    if clauses.is_empty() && parenthesized {
        return Err(invalid(s));
    }

    Ok((clauses, body))
}
