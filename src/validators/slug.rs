/// Lowercases `name` and collapses every run of non-alphanumeric characters
/// into a single `-`, trimming dashes from both ends.
///
/// ```rust
/// use tenantry::validators::slugify;
///
/// assert_eq!(slugify("Acme  Labs, Inc."), "acme-labs-inc");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
