//! Hashtag extraction.
//!
//! A tag is `#` followed by one or more ASCII letters, digits or
//! underscores. Tags are lower-cased and kept once, in order of first
//! appearance: `"hello #Foo #foo #bar"` yields `["foo", "bar"]`.

/// Extract the tags of a signal body.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '#' {
            continue;
        }

        let mut tag = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                tag.push(next.to_ascii_lowercase());
                chars.next();
            } else {
                break;
            }
        }

        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    tags
}
