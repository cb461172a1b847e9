//! `postwave-keys` — the key grammar.
//!
//! A queue row's `Key` cell holds one or more keys separated by commas:
//!
//! ```text
//! latest(days=3, limit=5), collection(collectionName="Hot, New", single), manual(key=summer)
//! ```
//!
//! Splitting is quote- and paren-aware: a comma inside `"…"`, `'…'` or
//! `(...)` never separates keys. Each key parses to a directive name plus
//! a `key=value` parameter map; the reserved words `single` and `video`
//! in the parameter list become token flags instead of parameters, and
//! the reserved name `manual` bypasses the directive registry entirely.

pub mod error;
pub mod split;
pub mod token;

pub use error::{KeyError, Result};
pub use split::split_keys;
pub use token::{parse_token, KeyToken, MANUAL_DIRECTIVE};
