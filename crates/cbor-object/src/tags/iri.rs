use fluent_uri::IriRef;

/// True when `text` is an absolute IRI or a relative reference (RFC 3987).
pub fn is_valid_iri(text: &str) -> bool {
    IriRef::parse(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iri_references() {
        assert!(is_valid_iri("http://example.com/a?b#c"));
        assert!(is_valid_iri("urn:isbn:0451450523"));
        assert!(is_valid_iri("../relative/path"));
        assert!(is_valid_iri("http://例え.jp/パス"));
        assert!(!is_valid_iri("http://exa mple.com"));
        assert!(!is_valid_iri("%zz"));
    }
}
