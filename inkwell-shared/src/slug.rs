/// URL slugs and CMS keys

/// Longest slug stored for posts and categories
pub const MAX_SLUG_LEN: usize = 200;

/// Longest page or section key for site content
pub const MAX_CONTENT_KEY_LEN: usize = 100;

/// Turns a title into a slug
///
/// Lowercases ASCII alphanumerics and collapses every other run of characters
/// into a single `-`. Leading and trailing dashes are dropped and the result is
/// cut to [`MAX_SLUG_LEN`]. Returns an empty string if nothing usable remains.
///
/// ```
/// use inkwell_shared::slug::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  Rust 2024 -- what's new?  "), "rust-2024-what-s-new");
/// ```
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                if slug.len() + 1 >= MAX_SLUG_LEN {
                    break;
                }
                slug.push('-');
            }
            pending_dash = false;

            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Whether `slug` is already in the form [`slugify`] produces
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()))
}

/// Page and section keys: 1-100 chars of `[a-z0-9_-]`
pub fn is_valid_content_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_CONTENT_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}
