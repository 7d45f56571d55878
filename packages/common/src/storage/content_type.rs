/// Match a declared content type against a prefix allow-list.
///
/// Returns the matching prefix (the blob's coarse category) or `None` when
/// the content type belongs to no allowed category.
pub fn valid_file_type<'a>(content_type: &str, allow_types: &'a [String]) -> Option<&'a str> {
    allow_types
        .iter()
        .find(|allow| content_type.starts_with(allow.as_str()))
        .map(|allow| allow.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow() -> Vec<String> {
        vec!["image/".to_string(), "video/".to_string()]
    }

    #[test]
    fn matches_allowed_prefix() {
        assert_eq!(valid_file_type("image/png", &allow()), Some("image/"));
        assert_eq!(valid_file_type("video/mp4", &allow()), Some("video/"));
    }

    #[test]
    fn rejects_unlisted_type() {
        assert_eq!(valid_file_type("text/plain", &allow()), None);
        assert_eq!(valid_file_type("application/pdf", &allow()), None);
    }

    #[test]
    fn prefix_must_anchor_at_start() {
        assert_eq!(valid_file_type("x-image/png", &allow()), None);
    }

    #[test]
    fn empty_allow_list_rejects_everything() {
        assert_eq!(valid_file_type("image/png", &[]), None);
    }
}
