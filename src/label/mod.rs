//! Instance label canonicalisation.
//!
//! Linode labels may contain ASCII letters, digits, `.`, `-`, and `_`, must
//! start and end with an alphanumeric character, may not repeat the same
//! punctuation character back to back, and are at most 64 characters long.

/// Longest label the API accepts.
pub const MAX_LABEL_LEN: usize = 64;

const fn is_punctuation(ch: char) -> bool {
    matches!(ch, '.' | '-' | '_')
}

const fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || is_punctuation(ch)
}

/// Rewrites `raw` into a label the API accepts.
///
/// Disallowed characters are dropped, runs of one punctuation character
/// collapse to a single occurrence, and punctuation is stripped from both
/// ends before and after truncation. The function is idempotent. The result
/// is empty when `raw` has no alphanumeric characters.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    for ch in raw.chars().filter(|ch| is_allowed(*ch)) {
        if is_punctuation(ch) && collapsed.ends_with(ch) {
            continue;
        }
        collapsed.push(ch);
    }

    let truncated: String = collapsed
        .trim_matches(is_punctuation)
        .chars()
        .take(MAX_LABEL_LEN)
        .collect();
    truncated.trim_end_matches(is_punctuation).to_owned()
}

#[cfg(test)]
mod tests;
