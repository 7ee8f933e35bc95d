use std::collections::HashSet;

const FALLBACK_NAME: &str = "col";

/// Canonicalizes one header: letters, digits and underscores are kept, every
/// other run of characters becomes a single underscore, and underscores are
/// trimmed from both ends.
pub fn clean_header(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() || ch == '_' {
            cleaned.push(ch);
            prev_underscore = ch == '_';
        } else if !prev_underscore {
            cleaned.push('_');
            prev_underscore = true;
        }
    }
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cleans every header and makes the sequence unique: later duplicates get a
/// `__1`, `__2`, … suffix, skipping any name already taken.
pub fn normalize_headers<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut normalized = Vec::with_capacity(names.len());
    for name in names {
        let base = clean_header(name.as_ref());
        let mut candidate = base.clone();
        let mut suffix = 1usize;
        while seen.contains(&candidate) {
            candidate = format!("{base}__{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        normalized.push(candidate);
    }
    normalized
}
