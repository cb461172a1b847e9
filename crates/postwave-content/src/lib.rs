//! `postwave-content` — content templates and the cascading lookup.
//!
//! A post's textual content comes from the first source in a fixed
//! priority order that yields a match: the authored content table, a
//! record synthesized from catalog product fields, the content table's
//! default row, or a message-only record built from variables. Every
//! matched field passes `{{var}}` substitution on the way out.

pub mod db;
pub mod error;
pub mod record;
pub mod resolver;
pub mod subst;

pub use db::SqliteContentStore;
pub use error::{ContentError, Result};
pub use record::{derive_lookup_key, ContentKey, ContentKeyType, ContentRecord};
pub use resolver::{ContentResolver, ContentStore};
pub use subst::{build_vars, substitute, VarMap};
