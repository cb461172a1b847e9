//! Parsing one raw key into a [`KeyToken`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};
use crate::split::split_params;

/// Reserved directive name: content-only post, bypasses the registry.
pub const MANUAL_DIRECTIVE: &str = "manual";

/// Reserved parameter words consumed as token flags.
const FLAG_SINGLE: &str = "single";
const FLAG_VIDEO: &str = "video";

/// One parsed directive. Derived deterministically from `key_raw`;
/// only `key_raw` and the job outcome are ever persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyToken {
    /// Original key text, exactly as it appeared in the queue cell.
    pub key_raw: String,
    /// Directive name, or [`MANUAL_DIRECTIVE`].
    pub name: String,
    /// `key=value` parameters. Keys are case-sensitive.
    pub params: BTreeMap<String, String>,
    /// The `single` flag: force single-item treatment.
    pub is_single: bool,
    /// The `video` flag: dispatch through the video webhook.
    pub is_video: bool,
}

impl KeyToken {
    pub fn is_manual(&self) -> bool {
        self.name == MANUAL_DIRECTIVE
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Parse one key into a [`KeyToken`].
///
/// Grammar: `name` or `name(param, param, …)` where each param is either
/// `key=value` (value optionally quoted, quotes stripped) or a bare word.
/// Bare words default their value to `"true"`. The reserved words
/// `single` and `video` — bare or `=bool` — become token flags and never
/// appear in the params map.
pub fn parse_token(key_raw: &str) -> Result<KeyToken> {
    let trimmed = key_raw.trim();
    if trimmed.is_empty() {
        return Err(KeyError::MissingName {
            key: key_raw.to_string(),
        });
    }

    let (name, param_src) = match trimmed.find('(') {
        Some(open) => {
            let Some(close) = trimmed.rfind(')') else {
                return Err(KeyError::MalformedParams {
                    key: key_raw.to_string(),
                    reason: "unclosed parenthesis".to_string(),
                });
            };
            if close < open {
                return Err(KeyError::MalformedParams {
                    key: key_raw.to_string(),
                    reason: "')' before '('".to_string(),
                });
            }
            (trimmed[..open].trim(), &trimmed[open + 1..close])
        }
        None => (trimmed, ""),
    };

    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(KeyError::MissingName {
            key: key_raw.to_string(),
        });
    }

    let mut token = KeyToken {
        key_raw: key_raw.trim().to_string(),
        name: name.to_string(),
        params: BTreeMap::new(),
        is_single: false,
        is_video: false,
    };

    for part in split_params(param_src) {
        let (key, value) = match part.split_once('=') {
            Some((k, v)) => (k.trim().to_string(), unquote(v.trim())),
            None => (part.trim().to_string(), "true".to_string()),
        };
        if key.is_empty() {
            continue;
        }
        match key.as_str() {
            FLAG_SINGLE => token.is_single = truthy(&value),
            FLAG_VIDEO => token.is_video = truthy(&value),
            _ => {
                token.params.insert(key, value);
            }
        }
    }

    Ok(token)
}

/// Strip one pair of matching surrounding quotes, if present.
fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
