//! Filesystem-safe slugs for account identifiers.
//!
//! Session blobs and stored profiles are keyed by username, and usernames can
//! contain characters that are not safe path segments. Slugs are lowercase
//! ASCII with runs of anything else collapsed to a single dash.

/// Normalize an identifier into a safe file stem.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.chars().flat_map(|c| c.to_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_keeps_alphanumerics() {
        assert_eq!(slugify("SomeUser123"), "someuser123");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("a.b__c d"), "a-b-c-d");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(slugify("..user.."), "user");
    }

    #[test]
    fn never_emits_path_separators() {
        let slug = slugify("../../etc/passwd");
        assert!(!slug.contains('/'));
        assert!(!slug.contains('.'));
        assert_eq!(slug, "etc-passwd");
    }
}
