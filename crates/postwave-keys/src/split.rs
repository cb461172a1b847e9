//! Quote- and paren-aware splitting of a raw key-string cell.

/// Split a raw key string into individual keys on top-level commas.
///
/// Commas inside single quotes, double quotes, or parentheses do not
/// split. Results are trimmed; empty segments are dropped. Quote state
/// is tracked per kind, so an apostrophe inside a double-quoted value
/// does not open a single-quoted span.
pub fn split_keys(raw: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut depth: u32 = 0;

    for ch in raw.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' if !in_single && !in_double => depth += 1,
            ')' if !in_single && !in_double => depth = depth.saturating_sub(1),
            ',' if !in_single && !in_double && depth == 0 => {
                push_trimmed(&mut keys, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_trimmed(&mut keys, &current);

    keys
}

fn push_trimmed(keys: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        keys.push(trimmed.to_string());
    }
}

/// Split a parameter list on commas, respecting quotes (used inside a
/// token's parenthesised argument list, where parens no longer nest).
pub fn split_params(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in raw.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ',' if !in_single && !in_double => {
                push_trimmed(&mut parts, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_trimmed(&mut parts, &current);

    parts
}
